use core_types::{KpiKey, PeerGroupKey};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BenchmarkError {
    #[error("No prior benchmark records exist for fiscal year {0}")]
    NothingToRestore(i32),

    #[error("Snapshot version {version} is not newer than the published version {current}")]
    StaleSnapshot { version: u64, current: u64 },

    #[error("Benchmark for {kpi} / {peer_group} / {fiscal_year} appears more than once")]
    DuplicateRecord {
        kpi: KpiKey,
        peer_group: PeerGroupKey,
        fiscal_year: i32,
    },

    #[error("Benchmark for {kpi} / {peer_group} is inconsistent: {reason}")]
    InconsistentRecord {
        kpi: KpiKey,
        peer_group: PeerGroupKey,
        reason: String,
    },
}
