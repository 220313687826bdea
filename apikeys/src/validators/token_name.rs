use core::result::Result;
use validator::ValidationError;

pub const TOKEN_NAME_MAX_LENGTH: usize = 32;

/// Token names are compared after trimming surrounding whitespace.
pub fn token_name(value: &str) -> Result<(), ValidationError> {
    let name = value.trim();
    if name.is_empty() {
        return Err(ValidationError::new("blank"));
    }

    if name.chars().count() > TOKEN_NAME_MAX_LENGTH {
        return Err(ValidationError::new("token_name"));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(ValidationError::new("token_name"));
    }

    Ok(())
}
