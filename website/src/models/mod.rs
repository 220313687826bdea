pub mod params;
pub mod template;
pub mod tokens;

pub use params::*;
pub use template::*;
pub use tokens::*;
