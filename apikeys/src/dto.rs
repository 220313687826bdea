use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validators;

/// The only scope the website issues tokens for
pub const TOKEN_SCOPE_ALL: &str = "all";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTokenDto {
    #[validate(custom(function = "validators::token_name"))]
    pub token_name: String,

    /// Token lifetime in nanoseconds
    #[validate(range(min = 1))]
    pub lifetime: i64,

    pub scope: String,
}

impl CreateTokenDto {
    pub fn new(token_name: &str, lifetime: i64) -> Self {
        Self {
            token_name: token_name.trim().to_string(),
            lifetime,
            scope: TOKEN_SCOPE_ALL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTokenDto {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenConfigDto {
    /// Maximum token lifetime in nanoseconds
    pub max_token_lifetime: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorDto {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::flatten_errors;

    #[test]
    fn test_create_token_payload() {
        let dto = CreateTokenDto::new("  my-token ", 86_400_000_000_000);
        assert!(dto.validate().is_ok());

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["token_name"], "my-token");
        assert_eq!(json["lifetime"], 86_400_000_000_000i64);
        assert_eq!(json["scope"], "all");
    }

    #[test]
    fn test_create_token_invalid() {
        let dto = CreateTokenDto::new("   ", 0);
        let err = dto.validate().unwrap_err();
        let msg = flatten_errors(&err);
        assert!(msg.starts_with("lifetime: must be at least"));
        assert!(msg.ends_with("token_name: must not be blank"));
    }

    #[test]
    fn test_error_without_detail() {
        let err: ApiErrorDto =
            serde_json::from_str(r#"{"message":"Token name already exists."}"#).unwrap();
        assert_eq!(err.message, "Token name already exists.");
        assert!(err.detail.is_none());
    }
}
