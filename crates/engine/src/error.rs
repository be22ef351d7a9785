use benchmarks::BenchmarkError;
use core_types::{CoreError, StoreError};
use formulas::FormulaError;
use ranking::RankingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Formula error: {0}")]
    Formula(#[from] FormulaError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Benchmark error: {0}")]
    Benchmark(#[from] BenchmarkError),

    #[error("Ranking error: {0}")]
    Ranking(#[from] RankingError),

    #[error("Invalid input: {0}")]
    Core(#[from] CoreError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Benchmark rebuild for fiscal year {fiscal_year} could not complete: {reason}")]
    RebuildIncomplete { fiscal_year: i32, reason: String },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
