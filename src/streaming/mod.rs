pub mod common;
pub mod grpc;
pub mod ingestor;

pub use grpc::{ConnectedStream, GeyserConnector, ObservedEvent};
pub use ingestor::{IngestOutcome, StreamIngestor};
