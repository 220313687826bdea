use validator::{ValidationError, ValidationErrors};

use super::TOKEN_NAME_MAX_LENGTH;

pub fn flatten_errors(errors: &ValidationErrors) -> String {
    // Collect field keys first
    let mut fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(|k| k.to_string())
        .collect();

    // Keep messages stable across runs
    fields.sort();

    let field_errors = errors.field_errors();
    let messages: Vec<String> = fields
        .into_iter()
        .map(|k| {
            let Some(item) = field_errors.get(k.as_str()) else {
                return format!("{}: invalid", k);
            };
            let msgs: Vec<String> = item.iter().map(error_to_string).collect();
            format!("{}: {}", k, msgs.join(", "))
        })
        .collect();

    messages.join(", ")
}

fn error_to_string(error: &ValidationError) -> String {
    if let Some(message) = error.message.as_ref() {
        return message.to_string();
    }

    match error.code.as_ref() {
        "blank" => "must not be blank".to_string(),
        "token_name" => format!(
            "must be at most {} characters without control characters",
            TOKEN_NAME_MAX_LENGTH
        ),
        "length" => match (error.params.get("min"), error.params.get("max")) {
            (Some(min), Some(max)) => format!("must be between {} and {} characters", min, max),
            (Some(min), None) => format!("must be at least {} characters", min),
            (None, Some(max)) => format!("must be at most {} characters", max),
            _ => "invalid length".to_string(),
        },
        "range" => match (error.params.get("min"), error.params.get("max")) {
            (Some(min), Some(max)) => format!("must be between {} and {}", min, max),
            (Some(min), None) => format!("must be at least {}", min),
            (None, Some(max)) => format!("must be at most {}", max),
            _ => "invalid".to_string(),
        },
        "required" => "required".to_string(),
        _ => "invalid".to_string(),
    }
}
