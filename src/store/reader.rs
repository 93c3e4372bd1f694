use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::debug;

use crate::common::{BenchError, BenchResult};

/// Event key -> creation timestamp for one provider
pub type TransactionTimes = HashMap<String, DateTime<Utc>>;

/// Parse store contents. Lines that are not exactly `<timestamp> <key>` are
/// skipped; an unparsable timestamp fails the whole parse. A key seen twice
/// keeps its last timestamp.
pub fn parse_store(content: &str) -> BenchResult<TransactionTimes> {
    let mut transactions = TransactionTimes::new();
    let mut skipped = 0usize;

    for (index, line) in content.split('\n').enumerate() {
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split(' ').collect();
        let [timestamp, key] = parts.as_slice() else {
            skipped += 1;
            continue;
        };

        let timestamp = DateTime::parse_from_rfc3339(timestamp).map_err(|source| {
            BenchError::Parse { line: index + 1, value: timestamp.to_string(), source }
        })?;
        transactions.insert(key.to_string(), timestamp.with_timezone(&Utc));
    }

    if skipped > 0 {
        debug!("Skipped {skipped} malformed store lines");
    }
    Ok(transactions)
}

/// Read and parse a finished store file
pub async fn read_store(path: impl AsRef<Path>) -> BenchResult<TransactionTimes> {
    let path = path.as_ref();
    let content =
        tokio::fs::read_to_string(path).await.map_err(|e| BenchError::store(path, e))?;
    parse_store(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{format_record, EventStoreWriter};
    use crate::streaming::grpc::ObservedEvent;

    #[test]
    fn parses_nanosecond_timestamps() {
        let times = parse_store("2024-01-01T00:00:00.000000001Z sigA\n").unwrap();
        assert_eq!(times.len(), 1);
        assert_eq!(times["sigA"].timestamp_subsec_nanos(), 1);
    }

    #[test]
    fn skips_lines_with_wrong_field_count() {
        let content = "2024-01-01T00:00:00Z sigA\n\
                       2024-01-01T00:00:00Z sigB extra\n\
                       lonely\n\
                       \n";
        let times = parse_store(content).unwrap();
        assert_eq!(times.len(), 1);
        assert!(times.contains_key("sigA"));
    }

    #[test]
    fn bad_timestamp_fails_with_line_number() {
        let content = "2024-01-01T00:00:00Z sigA\nyesterday sigB\n";
        match parse_store(content) {
            Err(BenchError::Parse { line, value, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(value, "yesterday");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_key_keeps_last_timestamp() {
        let content = "2024-01-01T00:00:00Z sigA\n2024-01-01T00:00:05Z sigA\n";
        let times = parse_store(content).unwrap();
        assert_eq!(times.len(), 1);
        assert_eq!(times["sigA"].to_rfc3339(), "2024-01-01T00:00:05+00:00");
    }

    #[test]
    fn record_line_survives_round_trip() {
        let created_at = DateTime::from_timestamp(1_704_067_200, 123_456_789).unwrap();
        let event = ObservedEvent::new(created_at, "5j7s");
        let times = parse_store(&format_record(&event)).unwrap();
        assert_eq!(times["5j7s"], created_at);
    }

    #[tokio::test]
    async fn reads_what_the_writer_wrote() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("txs_1.txt");
        let created_at = DateTime::from_timestamp(1_704_067_200, 42).unwrap();

        let mut writer = EventStoreWriter::create(&path).await.unwrap();
        writer.append(&ObservedEvent::new(created_at, "sigA")).await.unwrap();
        writer.finish().await.unwrap();

        let times = read_store(&path).await.unwrap();
        assert_eq!(times["sigA"], created_at);
    }

    #[tokio::test]
    async fn missing_file_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_store(dir.path().join("nope.txt")).await.unwrap_err();
        assert!(matches!(err, BenchError::Store { .. }));
    }
}
