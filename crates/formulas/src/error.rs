use core_types::KpiKey;
use thiserror::Error;

/// Programming-contract violations. None of these are data problems.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormulaError {
    #[error("KPI '{0}' is not registered")]
    Unregistered(KpiKey),

    #[error("Formula declaration for '{kpi}' is malformed: {reason}")]
    Malformed { kpi: KpiKey, reason: String },

    #[error(transparent)]
    Core(#[from] core_types::CoreError),
}
