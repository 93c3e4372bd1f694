use std::path::{Path, PathBuf};

use chrono::SecondsFormat;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::common::{BenchError, BenchResult};
use crate::streaming::grpc::ObservedEvent;

/// Format one record line, newline included
pub fn format_record(event: &ObservedEvent) -> String {
    format!("{} {}\n", event.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true), event.key)
}

/// Append-only writer for one provider's records
pub struct EventStoreWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    records: u64,
}

impl EventStoreWriter {
    /// Create the store file, truncating any previous run's contents
    pub async fn create(path: impl AsRef<Path>) -> BenchResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await.map_err(|e| BenchError::store(&path, e))?;
        Ok(Self { path, writer: BufWriter::new(file), records: 0 })
    }

    pub async fn append(&mut self, event: &ObservedEvent) -> BenchResult<()> {
        self.writer
            .write_all(format_record(event).as_bytes())
            .await
            .map_err(|e| BenchError::store(&self.path, e))?;
        self.records += 1;
        Ok(())
    }

    /// Flush and sync; the file is complete once this returns
    pub async fn finish(mut self) -> BenchResult<u64> {
        self.writer.flush().await.map_err(|e| BenchError::store(&self.path, e))?;
        self.writer.get_ref().sync_all().await.map_err(|e| BenchError::store(&self.path, e))?;
        Ok(self.records)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> u64 {
        self.records
    }
}
