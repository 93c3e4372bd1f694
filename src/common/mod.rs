// Shared result and error types
pub mod error;

pub use error::*;

pub type AnyResult<T> = anyhow::Result<T>;
