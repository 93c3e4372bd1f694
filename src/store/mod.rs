//! Per-provider scratch log of observed events.
//!
//! One line per event: `<RFC3339 UTC timestamp, nanosecond precision> <base58 key>`.
//! The writer belongs to exactly one ingest pipeline; the reader runs only after
//! that pipeline has finished.

pub mod reader;
pub mod writer;

pub use reader::*;
pub use writer::*;
