// Common modules - configuration and constants shared by both provider pipelines
pub mod config;
pub mod constants;

// Re-export main types
pub use config::*;
pub use constants::*;
