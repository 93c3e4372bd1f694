pub mod bench;
pub mod common;
pub mod runner;
pub mod store;
pub mod streaming;

pub use bench::{compare_stores, BenchmarkReport, BenchmarkStats, Verdict};
pub use runner::{BenchConfig, BenchRunner};
