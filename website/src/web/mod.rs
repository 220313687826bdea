pub mod error;
pub mod middleware;
pub mod routes;
pub mod security_headers;
pub mod tokens;

pub const SESSION_COOKIE: &str = "session_token";
pub const TOKENS_URL: &str = "/settings/tokens";

pub use error::*;
pub use routes::*;
