use core_types::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Failed to connect to the database: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Stored row could not be decoded: {0}")]
    DecodeError(String),
}

/// Errors that mean the backend could not be reached, as opposed to a query
/// that reached it and failed.
fn is_connectivity(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Protocol(_)
    )
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::ConnectionError(inner) if is_connectivity(&inner) => {
                StoreError::Unavailable(inner.to_string())
            }
            DbError::ConnectionConfigError(msg) => StoreError::Unavailable(msg),
            other => StoreError::Query(other.to_string()),
        }
    }
}
