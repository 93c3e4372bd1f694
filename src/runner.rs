//! Run controller: arms the shared deadline, drives both provider pipelines to
//! completion and hands their stores to the comparator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use log::{info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bench::{compare_stores, BenchmarkReport};
use crate::common::{AnyResult, BenchError};
use crate::store::EventStoreWriter;
use crate::streaming::common::{
    ProviderConfig, StreamClientConfig, DEFAULT_BENCH_DURATION_SECS, FIRST_STORE_FILE,
    SECOND_STORE_FILE,
};
use crate::streaming::grpc::GeyserConnector;
use crate::streaming::ingestor::{IngestOutcome, StreamIngestor};

/// Everything one benchmark run needs
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub first: ProviderConfig,
    pub second: ProviderConfig,
    pub duration: Duration,
    /// Directory holding the scratch stores
    pub records_dir: PathBuf,
    /// Leave the stores on disk after comparing
    pub keep_records: bool,
    pub client: StreamClientConfig,
}

impl BenchConfig {
    pub fn new(first: ProviderConfig, second: ProviderConfig) -> Self {
        Self {
            first,
            second,
            duration: Duration::from_secs(DEFAULT_BENCH_DURATION_SECS),
            records_dir: PathBuf::from("."),
            keep_records: false,
            client: StreamClientConfig::default(),
        }
    }

    pub fn store_paths(&self) -> (PathBuf, PathBuf) {
        (self.records_dir.join(FIRST_STORE_FILE), self.records_dir.join(SECOND_STORE_FILE))
    }
}

/// Cancels `token` once `duration` has elapsed
pub fn arm_deadline(token: CancellationToken, duration: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        info!("Benchmark duration of {duration:?} elapsed");
        token.cancel();
    })
}

pub struct BenchRunner {
    config: BenchConfig,
}

impl BenchRunner {
    pub fn new(config: BenchConfig) -> Self {
        Self { config }
    }

    /// Ingest from both providers until the deadline, then compare.
    /// Setup failures abort the run without a report; a pipeline that fails
    /// mid-run still contributes what it captured.
    pub async fn run(&self) -> AnyResult<BenchmarkReport> {
        let (first_path, second_path) = self.config.store_paths();
        let result = self.run_inner(&first_path, &second_path).await;

        if !self.config.keep_records {
            for path in [&first_path, &second_path] {
                if let Err(e) = tokio::fs::remove_file(path).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!("Failed to remove {}: {e}", path.display());
                    }
                }
            }
        }
        result
    }

    async fn run_inner(
        &self,
        first_path: &Path,
        second_path: &Path,
    ) -> AnyResult<BenchmarkReport> {
        let first_store = EventStoreWriter::create(first_path).await?;
        let second_store = EventStoreWriter::create(second_path).await?;

        let cancel = CancellationToken::new();
        let deadline = arm_deadline(cancel.clone(), self.config.duration);

        // A provider that accepts but never answers must not outlive the deadline
        let connector = GeyserConnector::new(self.config.client.clone());
        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BenchError::SetupDeadline(self.config.duration)),
            streams = async {
                tokio::try_join!(
                    connector.connect(&self.config.first),
                    connector.connect(&self.config.second),
                )
            } => streams,
        };
        let (first_stream, second_stream) = match connected {
            Ok(streams) => streams,
            Err(e) => {
                deadline.abort();
                return Err(e).context("benchmark setup failed");
            }
        };

        let first_label = self.config.first.endpoint.to_string();
        let second_label = self.config.second.endpoint.to_string();
        let channel_size = self.config.client.channel_size;
        let first_ingestor = StreamIngestor::new(first_label.clone(), first_stream, first_store)
            .with_channel_size(channel_size);
        let second_ingestor = StreamIngestor::new(second_label.clone(), second_stream, second_store)
            .with_channel_size(channel_size);

        let (first_outcome, second_outcome) =
            tokio::join!(first_ingestor.run(cancel.clone()), second_ingestor.run(cancel.clone()));
        deadline.abort();

        log_outcome(&first_label, &first_outcome);
        log_outcome(&second_label, &second_outcome);

        let report = compare_stores(first_path, second_path, &first_label, &second_label)
            .await
            .context("failed to compare provider records")?;
        report.log();
        Ok(report)
    }
}

fn log_outcome(label: &str, outcome: &IngestOutcome) {
    match outcome {
        IngestOutcome::Failed { .. } => {
            warn!("{label}: {outcome}; comparing what was captured")
        }
        _ => info!("{label}: {outcome}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::common::ProviderEndpoint;

    fn provider(address: &str) -> ProviderConfig {
        ProviderConfig::new(ProviderEndpoint::parse(address).unwrap(), "token")
    }

    #[test]
    fn defaults_follow_constants() {
        let config = BenchConfig::new(provider("localhost:1"), provider("localhost:2"));
        assert_eq!(config.duration, Duration::from_secs(300));
        assert!(!config.keep_records);
        let (first, second) = config.store_paths();
        assert!(first.ends_with(FIRST_STORE_FILE));
        assert!(second.ends_with(SECOND_STORE_FILE));
    }

    #[tokio::test]
    async fn deadline_cancels_token() {
        let token = CancellationToken::new();
        arm_deadline(token.clone(), Duration::from_millis(10));
        tokio::time::timeout(Duration::from_secs(5), token.cancelled()).await.unwrap();
    }

    #[tokio::test]
    async fn unresolvable_provider_aborts_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let mut config =
            BenchConfig::new(provider("does-not-exist.invalid:10000"), provider("localhost:1"));
        config.records_dir = dir.path().to_path_buf();
        config.duration = Duration::from_secs(1);

        let err = BenchRunner::new(config.clone()).run().await.unwrap_err();
        assert!(format!("{err:#}").contains("benchmark setup failed"));

        let (first, second) = config.store_paths();
        assert!(!first.exists());
        assert!(!second.exists());
    }

    #[tokio::test]
    async fn silent_provider_fails_setup_at_deadline() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let dir = tempfile::tempdir().unwrap();
        let address = format!("127.0.0.1:{port}");
        let mut config = BenchConfig::new(provider(&address), provider(&address));
        config.records_dir = dir.path().to_path_buf();
        config.duration = Duration::from_millis(200);

        let err = tokio::time::timeout(Duration::from_secs(5), BenchRunner::new(config).run())
            .await
            .expect("setup must give up at the deadline")
            .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("benchmark setup failed"));
        assert!(err.chain().any(|cause| matches!(
            cause.downcast_ref::<BenchError>(),
            Some(BenchError::SetupDeadline(_))
        )));
    }
}
