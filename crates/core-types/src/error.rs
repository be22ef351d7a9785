use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Unknown KPI key '{0}'")]
    UnknownKpi(String),

    #[error("Provider identifier '{0}' cannot be normalized")]
    InvalidProviderId(String),
}
