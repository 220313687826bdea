pub mod dto;
pub mod lifetime;
pub mod utils;
pub mod validators;
