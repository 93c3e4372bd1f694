use std::fmt;
use std::time::Duration;

use log::info;

use super::stats::BenchmarkStats;

const REPORTED_PERCENTILES: [f64; 5] = [50.0, 75.0, 90.0, 95.0, 99.0];

/// Which provider leads on average
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    NoMatches,
    FirstAhead { by: Duration },
    SecondAhead { by: Duration },
    Parity,
}

impl Verdict {
    pub fn from_stats(stats: &BenchmarkStats) -> Self {
        match stats.mean_delta_ns() {
            None => Self::NoMatches,
            Some(0) => Self::Parity,
            Some(mean) => {
                let by = Duration::from_nanos(mean.unsigned_abs());
                if mean < 0 {
                    Self::FirstAhead { by }
                } else {
                    Self::SecondAhead { by }
                }
            }
        }
    }
}

/// Result of comparing the two providers
#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    pub first: String,
    pub second: String,
    pub stats: BenchmarkStats,
    pub verdict: Verdict,
}

impl BenchmarkReport {
    pub fn new(first: impl Into<String>, second: impl Into<String>, stats: BenchmarkStats) -> Self {
        let verdict = Verdict::from_stats(&stats);
        Self { first: first.into(), second: second.into(), stats, verdict }
    }

    /// Human-readable report, one entry per log line
    pub fn lines(&self) -> Vec<String> {
        let stats = &self.stats;
        let (first, second) = (&self.first, &self.second);

        if self.verdict == Verdict::NoMatches {
            return vec![format!(
                "No matching transactions found ({first}: {}, {second}: {})",
                stats.first_unique, stats.second_unique
            )];
        }

        let mut lines = vec![
            format!(
                "Found {} matching transactions across {first} and {second}",
                stats.match_count
            ),
            format!(
                "{first} was faster in {} cases ({:.2}%)",
                stats.first_faster,
                stats.percentage(stats.first_faster)
            ),
            format!(
                "{second} was faster in {} cases ({:.2}%)",
                stats.second_faster,
                stats.percentage(stats.second_faster)
            ),
            format!(
                "Same timestamp in {} cases ({:.2}%)",
                stats.ties,
                stats.percentage(stats.ties)
            ),
            format!(
                "Only in {first}: {}, only in {second}: {}",
                stats.first_only(),
                stats.second_only()
            ),
        ];

        if let (Some(min), Some(max)) = (stats.min_delta_ns(), stats.max_delta_ns()) {
            lines.push(format!(
                "Delta ({first} - {second}) min {}, max {}",
                format_signed_nanos(min),
                format_signed_nanos(max)
            ));
        }
        let percentiles: Vec<String> = REPORTED_PERCENTILES
            .iter()
            .filter_map(|p| {
                stats.percentile_ns(*p).map(|v| format!("p{p} {}", format_signed_nanos(v)))
            })
            .collect();
        if !percentiles.is_empty() {
            lines.push(format!("Delta percentiles: {}", percentiles.join(", ")));
        }

        lines.push(match self.verdict {
            Verdict::FirstAhead { by } => format!("{first} is ahead of {second} by {by:?}"),
            Verdict::SecondAhead { by } => format!("{second} is ahead of {first} by {by:?}"),
            Verdict::Parity | Verdict::NoMatches => "both endpoints perform equally".to_string(),
        });
        lines
    }

    /// Emit the report through the log stream
    pub fn log(&self) {
        for line in self.lines() {
            info!("{line}");
        }
    }
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines().join("\n"))
    }
}

/// Render a signed nanosecond delta with a human unit, e.g. `-1.5ms`
pub fn format_signed_nanos(nanos: i64) -> String {
    let magnitude = Duration::from_nanos(nanos.unsigned_abs());
    if nanos < 0 {
        format!("-{magnitude:?}")
    } else {
        format!("{magnitude:?}")
    }
}
