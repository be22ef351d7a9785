//! # KPI Formula Engine
//!
//! Translates cost-report worksheet cells into the named ratios of the three-level
//! KPI hierarchy.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** A pure logic crate. It never performs I/O; the caller
//!   fetches the coordinates a formula declares and hands the values back in.
//! - **Explicit hierarchy:** `catalog` is a tagged table of level, parent and
//!   direction for every KPI. Nothing is inferred from names.
//! - **Null, not zero:** A missing coordinate or a zero denominator yields a null
//!   value with a status explaining why. Neither is an error.
//! - **Fail fast on contract violations:** A malformed declaration or an
//!   unregistered KPI is a `FormulaError`.
//!
//! ## Public API
//!
//! - `FormulaRegistry`: the validated set of KPIs and their formulas.
//! - `KpiDefinition` / `CATALOG`: the static hierarchy.
//! - `FormulaDecl`, `Input`, `InputSource`: formula declarations.
//! - `Evaluation`: the result of evaluating one formula.

pub mod catalog;
pub mod declarations;
pub mod error;
pub mod evaluate;
pub mod registry;
pub mod worksheets;

pub use catalog::{CATALOG, KpiDefinition};
pub use declarations::{FormulaDecl, Input, InputSource, declaration};
pub use error::FormulaError;
pub use evaluate::{CoordinateValues, Evaluation};
pub use registry::{FormulaRegistry, RegisteredKpi};
pub use worksheets::{WORKSHEETS, WorksheetInfo, is_reported};
