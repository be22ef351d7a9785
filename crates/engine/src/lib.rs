//! # KPI Service
//!
//! The facade the rest of the world talks to. It computes the KPI hierarchy
//! for a provider, serves peer benchmarks from the current snapshot, ranks
//! KPIs for display and rebuilds the benchmark snapshot in batch.
//!
//! ## Architectural Principles
//!
//! - **Storage behind traits:** The service holds `Arc<dyn ...>` handles to the
//!   worksheet store, the precomputed store and an optional archive. It never
//!   knows whether it is talking to PostgreSQL or to memory.
//! - **Degrade, don't fail:** An unreachable worksheet backend turns a request
//!   into a precomputed-only response instead of an error.
//! - **Request-scoped fetching:** Every coordinate a request needs is looked up
//!   once, concurrently.
//!
//! ## Public API
//!
//! - `KpiService::compute_kpis`: the KPI tree of one provider and fiscal year.
//! - `KpiService::get_benchmarks`: peer benchmarks from the current snapshot.
//! - `KpiService::rank_kpis`: display ordering.
//! - `KpiService::rebuild_benchmarks` / `restore_benchmarks`: snapshot maintenance.

pub mod error;
pub mod rebuild;
pub mod report;
pub mod service;

pub use error::EngineError;
pub use report::{BenchmarkView, Capability, KpiReport, RebuildSummary};
pub use service::KpiService;
