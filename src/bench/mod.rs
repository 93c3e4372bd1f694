//! Offline comparison of two finished stores.

pub mod report;
pub mod stats;

use std::path::Path;

pub use report::*;
pub use stats::*;

use crate::common::BenchResult;
use crate::store::read_store;

/// Load both stores, join them on event key and build the report.
/// A malformed timestamp in either store fails the comparison.
pub async fn compare_stores(
    first_path: impl AsRef<Path>,
    second_path: impl AsRef<Path>,
    first_label: &str,
    second_label: &str,
) -> BenchResult<BenchmarkReport> {
    let first = read_store(first_path).await?;
    let second = read_store(second_path).await?;
    let stats = calculate_stats(&first, &second);
    Ok(BenchmarkReport::new(first_label, second_label, stats))
}
