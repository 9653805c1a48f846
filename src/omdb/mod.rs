pub mod client;
pub mod types;
pub mod validate;

pub use client::*;
pub use types::*;
pub use validate::ValidationError;
