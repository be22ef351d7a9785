//! # Database Crate
//!
//! Storage adapters for the KPI engine. Both implement the storage traits from
//! `core-types`, so the engine never knows which one it is talking to.
//!
//! ## Architectural Principles
//!
//! - **Adapter only:** All SQL lives here. Callers see `WorksheetRepository`,
//!   `PrecomputedStore` and `BenchmarkArchive`, nothing else.
//! - **Reachability is distinguished from failure:** A backend that cannot be
//!   reached maps to `StoreError::Unavailable`, which lets the engine degrade;
//!   any other failure maps to `StoreError::Query`.
//! - **Asynchronous & Pooled:** All operations are asynchronous, and it uses a
//!   connection pool (`PgPool`) for concurrent database access.
//!
//! ## Public API
//!
//! - `connect`: The async function to establish the database connection pool.
//! - `run_migrations`: A utility to apply database migrations, ensuring the schema is up-to-date.
//! - `DbRepository`: PostgreSQL implementation of every storage trait.
//! - `MemoryStore`: In-memory implementation with a switchable worksheet outage.
//! - `DbError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod memory;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use memory::MemoryStore;
pub use repository::DbRepository;
