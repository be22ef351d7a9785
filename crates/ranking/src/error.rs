use core_types::KpiKey;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RankingError {
    #[error("KPI '{0}' was submitted for ranking more than once")]
    DuplicateKpi(KpiKey),

    #[error("Benchmark for '{benchmark}' was supplied to rank '{kpi}'")]
    BenchmarkMismatch { kpi: KpiKey, benchmark: KpiKey },
}
