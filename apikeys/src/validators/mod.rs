mod error;
mod token_name;

pub use error::flatten_errors;
pub use token_name::{TOKEN_NAME_MAX_LENGTH, token_name};
