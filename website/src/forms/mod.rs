pub mod create_token;
pub mod registry;

pub use create_token::*;
pub use registry::*;
