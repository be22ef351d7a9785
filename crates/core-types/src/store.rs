//! The interfaces this workspace consumes from its storage collaborators.
//!
//! The engine never talks to a database directly. It is handed trait objects
//! for the raw-worksheet store, the precomputed store and (optionally) an
//! archive for published benchmark snapshots.

use crate::enums::KpiKey;
use crate::provider::ProviderId;
use crate::structs::{BenchmarkRecord, BenchmarkSnapshot};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not be reached at all. Callers may degrade.
    #[error("Storage backend is unavailable: {0}")]
    Unavailable(String),

    /// The backend answered but the query failed.
    #[error("Storage query failed: {0}")]
    Query(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Read-only access to raw (worksheet, line, column) values.
#[async_trait]
pub trait WorksheetRepository: Send + Sync {
    /// Returns `Ok(None)` when the cell was not reported.
    async fn lookup(
        &self,
        worksheet_code: &str,
        provider_id: &ProviderId,
        fiscal_year: i32,
        line_code: &str,
        column_code: &str,
    ) -> Result<Option<Decimal>, StoreError>;

    /// Fiscal years for which the provider filed any worksheet data.
    async fn available_years(&self, provider_id: &ProviderId)
    -> Result<BTreeSet<i32>, StoreError>;

    /// Every provider that filed worksheet data for the fiscal year.
    async fn providers(&self, fiscal_year: i32) -> Result<Vec<ProviderId>, StoreError>;
}

/// Read-only access to pre-aggregated level-1 KPIs and prior benchmark sets.
#[async_trait]
pub trait PrecomputedStore: Send + Sync {
    async fn lookup_precomputed(
        &self,
        kpi_key: KpiKey,
        provider_id: &ProviderId,
        fiscal_year: i32,
    ) -> Result<Option<Decimal>, StoreError>;

    /// Benchmark records from the most recently archived snapshot for the year.
    async fn prior_benchmarks(&self, fiscal_year: i32) -> Result<Vec<BenchmarkRecord>, StoreError>;
}

/// Durable storage for published benchmark snapshots.
#[async_trait]
pub trait BenchmarkArchive: Send + Sync {
    async fn archive(&self, snapshot: &BenchmarkSnapshot) -> Result<(), StoreError>;
}
