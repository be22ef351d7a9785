//! # Core Types
//!
//! The shared vocabulary of the KPI workspace: worksheet coordinates, provider
//! identifiers, KPI values, peer groups, benchmark records and ranking results,
//! plus the async traits that the storage adapters implement.
//!
//! ## Architectural Principles
//!
//! - **Layer 0:** This crate depends on no other workspace crate. Everything else
//!   builds on it.
//! - **Absence is data:** A missing worksheet value, an absent benchmark and a
//!   null ratio are all modelled with `Option`, never with a zero.

pub mod column_map;
pub mod enums;
pub mod error;
pub mod provider;
pub mod store;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{HospitalType, KpiKey, KpiLevel, PeerGroupLevel, Trend, ValueSource};
pub use error::CoreError;
pub use provider::{ProviderId, RawProviderId};
pub use store::{BenchmarkArchive, PrecomputedStore, StoreError, WorksheetRepository};
pub use structs::{
    BenchmarkKey, BenchmarkRecord, BenchmarkSnapshot, Coordinate, KpiStatus, KpiValue,
    PeerGroupKey, RankingResult, WorksheetRecord,
};
