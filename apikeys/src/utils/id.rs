use uuid::Uuid;

/// Prefix of create-token form instance ids
pub const FORM_ID_PREFIX: &str = "ctf";

pub fn generate_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::now_v7().as_simple())
}

/// Checks a `<prefix>_<uuid v7>` id
pub fn valid_id(prefix: &str, id: &str) -> bool {
    let Some(value) = id.strip_prefix(prefix).and_then(|v| v.strip_prefix('_')) else {
        return false;
    };

    if value.len() != 32 {
        return false;
    }

    match Uuid::parse_str(value) {
        Ok(val) => matches!(val.get_version(), Some(uuid::Version::SortRand)),
        Err(_) => false,
    }
}
