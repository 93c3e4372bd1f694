use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for benchmark operations
pub type BenchResult<T> = std::result::Result<T, BenchError>;

/// Typed failures of the benchmark pipeline
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("invalid provider address `{address}`: {reason}")]
    InvalidAddress { address: String, reason: &'static str },

    #[error("invalid duration `{0}`")]
    InvalidDuration(String),

    #[error("no IPv4 address found for {host}")]
    Resolve {
        host: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("invalid access token for {0}")]
    InvalidToken(String),

    #[error("invalid TLS server name `{0}`")]
    InvalidServerName(String),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] rustls::Error),

    #[error("failed to connect to {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("failed to subscribe to {endpoint}: {source}")]
    Subscribe {
        endpoint: String,
        #[source]
        source: Box<tonic::Status>,
    },

    #[error("failed to send subscription to {0}")]
    SendFilter(String),

    #[error("stream error: {0}")]
    Stream(Box<tonic::Status>),

    #[error("receive task ended abnormally: {0}")]
    ReceiveTask(#[from] tokio::task::JoinError),

    #[error("providers not subscribed within the {0:?} benchmark window")]
    SetupDeadline(std::time::Duration),

    #[error("store {}: {source}", .path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: invalid timestamp `{value}`: {source}")]
    Parse {
        line: usize,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl BenchError {
    pub fn store(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Store { path: path.into(), source }
    }
}

impl From<tonic::Status> for BenchError {
    fn from(status: tonic::Status) -> Self {
        Self::Stream(Box::new(status))
    }
}
