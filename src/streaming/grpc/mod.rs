// gRPC related modules
pub mod connection;
pub mod subscription;
pub mod tls;
pub mod types;

// Re-export main types
pub use connection::*;
pub use subscription::*;
pub use types::*;

// Re-export from common modules
pub use crate::streaming::common::{ProviderConfig, ProviderEndpoint, StreamClientConfig};
