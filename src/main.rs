use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use log::error;

use geyser_latency_bench::common::AnyResult;
use geyser_latency_bench::streaming::common::{
    parse_duration, ProviderConfig, ProviderEndpoint, StreamClientConfig, DEFAULT_CHANNEL_SIZE,
    DEFAULT_CONNECT_TIMEOUT,
};
use geyser_latency_bench::{compare_stores, BenchConfig, BenchRunner, BenchmarkReport};

const PROVIDER_ARGS: [&str; 4] = ["url1", "token1", "url2", "token2"];

/// Compare transaction propagation latency between two geyser gRPC providers
#[derive(Parser, Debug)]
#[command(name = "geyser-bench", version, about)]
struct Args {
    /// Address of the first geyser node (host:port)
    #[arg(long, required_unless_present = "compare")]
    url1: Option<ProviderEndpoint>,

    /// Access token of the first geyser node
    #[arg(long, required_unless_present = "compare")]
    token1: Option<String>,

    /// Address of the second geyser node (host:port)
    #[arg(long, required_unless_present = "compare")]
    url2: Option<ProviderEndpoint>,

    /// Access token of the second geyser node
    #[arg(long, required_unless_present = "compare")]
    token2: Option<String>,

    /// Duration of the benchmark (e.g. 30s, 5m, 1h)
    #[arg(long, default_value = "5m", value_parser = parse_duration)]
    duration: Duration,

    /// Directory for the scratch record files
    #[arg(long, default_value = ".")]
    records_dir: PathBuf,

    /// Keep the record files after the comparison
    #[arg(long, default_value_t = false)]
    keep_records: bool,

    /// Capacity of the queue between stream reads and file writes
    #[arg(long, default_value_t = DEFAULT_CHANNEL_SIZE)]
    channel_size: usize,

    /// Connection timeout in seconds
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT)]
    connect_timeout: u64,

    /// Compare two existing record files instead of streaming
    #[arg(
        long,
        num_args = 2,
        value_names = ["FIRST", "SECOND"],
        conflicts_with_all = PROVIDER_ARGS
    )]
    compare: Option<Vec<PathBuf>>,
}

#[derive(Debug)]
enum Mode {
    Bench(BenchConfig),
    Compare { first: PathBuf, second: PathBuf },
}

impl Args {
    /// Empty tokens are allowed and skip the x-token header
    fn into_mode(self) -> AnyResult<Mode> {
        if let Some(files) = self.compare {
            let [first, second]: [PathBuf; 2] = files
                .try_into()
                .map_err(|_| anyhow!("--compare takes exactly two record files"))?;
            return Ok(Mode::Compare { first, second });
        }

        let (Some(url1), Some(token1), Some(url2), Some(token2)) =
            (self.url1, self.token1, self.url2, self.token2)
        else {
            bail!("--url1, --token1, --url2 and --token2 are required");
        };
        let mut config = BenchConfig::new(
            ProviderConfig::new(url1, token1),
            ProviderConfig::new(url2, token2),
        );
        config.duration = self.duration;
        config.records_dir = self.records_dir;
        config.keep_records = self.keep_records;
        config.client = StreamClientConfig {
            channel_size: self.channel_size,
            connect_timeout: self.connect_timeout,
            ..StreamClientConfig::default()
        };
        Ok(Mode::Bench(config))
    }
}

/// Re-analyse records kept by an earlier run
async fn compare_files(first: &Path, second: &Path) -> AnyResult<BenchmarkReport> {
    let first_label = first.display().to_string();
    let second_label = second.display().to_string();
    let report = compare_stores(first, second, &first_label, &second_label)
        .await
        .with_context(|| format!("failed to compare {first_label} with {second_label}"))?;
    report.log();
    Ok(report)
}

async fn run(args: Args) -> AnyResult<()> {
    match args.into_mode()? {
        Mode::Bench(config) => {
            BenchRunner::new(config).run().await?;
        }
        Mode::Compare { first, second } => {
            compare_files(&first, &second).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geyser_latency_bench::Verdict;

    fn bench_config(args: &[&str]) -> BenchConfig {
        match Args::try_parse_from(args).unwrap().into_mode().unwrap() {
            Mode::Bench(config) => config,
            mode => panic!("expected a benchmark run, got {mode:?}"),
        }
    }

    #[test]
    fn parses_required_flags_with_defaults() {
        let config = bench_config(&[
            "geyser-bench",
            "--url1",
            "localhost:10000",
            "--token1",
            "a",
            "--url2",
            "geyser.example.com:443",
            "--token2",
            "b",
        ]);
        assert_eq!(config.duration, Duration::from_secs(300));
        assert_eq!(config.first.endpoint.port, 10000);
        assert_eq!(config.second.endpoint.hostname, "geyser.example.com");
        assert_eq!(config.client.channel_size, DEFAULT_CHANNEL_SIZE);
        assert!(!config.keep_records);
    }

    #[test]
    fn rejects_missing_token_and_bad_address() {
        assert!(Args::try_parse_from(["geyser-bench", "--url1", "a:1", "--url2", "b:2"]).is_err());
        assert!(Args::try_parse_from([
            "geyser-bench",
            "--url1",
            "no-port",
            "--token1",
            "",
            "--url2",
            "b:2",
            "--token2",
            "",
        ])
        .is_err());
    }

    #[test]
    fn accepts_go_style_duration() {
        let config = bench_config(&[
            "geyser-bench",
            "--url1",
            "a:1",
            "--token1",
            "",
            "--url2",
            "b:2",
            "--token2",
            "",
            "--duration",
            "1m30s",
        ]);
        assert_eq!(config.duration, Duration::from_secs(90));
    }

    #[test]
    fn compare_needs_no_provider_flags() {
        let args =
            Args::try_parse_from(["geyser-bench", "--compare", "txs_0.txt", "txs_1.txt"]).unwrap();
        match args.into_mode().unwrap() {
            Mode::Compare { first, second } => {
                assert_eq!(first, PathBuf::from("txs_0.txt"));
                assert_eq!(second, PathBuf::from("txs_1.txt"));
            }
            mode => panic!("expected a comparison, got {mode:?}"),
        }

        assert!(Args::try_parse_from(["geyser-bench", "--compare", "txs_0.txt"]).is_err());
        assert!(Args::try_parse_from([
            "geyser-bench",
            "--compare",
            "txs_0.txt",
            "txs_1.txt",
            "--url1",
            "a:1",
        ])
        .is_err());
    }

    #[tokio::test]
    async fn compares_kept_records() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("txs_0.txt");
        let second = dir.path().join("txs_1.txt");
        tokio::fs::write(&first, "2024-01-01T00:00:00.000000010Z sigA\n").await.unwrap();
        tokio::fs::write(&second, "2024-01-01T00:00:00.000000004Z sigA\n").await.unwrap();

        let report = compare_files(&first, &second).await.unwrap();
        assert_eq!(report.stats.match_count, 1);
        assert_eq!(report.verdict, Verdict::SecondAhead { by: Duration::from_nanos(6) });

        let missing = dir.path().join("missing.txt");
        assert!(compare_files(&first, &missing).await.is_err());
    }
}
