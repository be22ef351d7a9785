//! # Benchmark Aggregator
//!
//! Turns the KPI values of every provider into percentile benchmarks per peer
//! group, and holds the currently published benchmark set.
//!
//! ## Architectural Principles
//!
//! - **Pure batch aggregation:** `BenchmarkAggregator` is a function of its input
//!   set. Running it twice over the same values yields identical records.
//! - **Absence is meaningful:** Peer groups with fewer than three non-null
//!   participants get no record at all.
//! - **Publish, then retire:** `SnapshotStore` swaps a complete, immutable
//!   snapshot in one step. Readers never see a half-built set, and a reader that
//!   already holds the previous snapshot keeps it for as long as it needs.
//!
//! ## Public API
//!
//! - `BenchmarkAggregator`: the aggregation itself.
//! - `SnapshotStore`: the atomically swapped current snapshot.
//! - `index_records`: validates externally sourced records before publication.
//! - `stats`: interpolated percentiles and summary statistics.

pub mod aggregator;
pub mod error;
pub mod snapshot;
pub mod stats;

pub use aggregator::{BenchmarkAggregator, MIN_PEER_COUNT};
pub use error::BenchmarkError;
pub use snapshot::{SnapshotStore, index_records};
pub use stats::{Summary, percentile, summarize};
