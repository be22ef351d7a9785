use core_types::{BenchmarkRecord, KpiKey, KpiValue, PeerGroupKey, ProviderId};
use serde::Serialize;
use std::collections::BTreeMap;

/// How much of the KPI hierarchy a response could serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Every requested tier was computed.
    Full,
    /// The worksheet backend was unavailable; only precomputed level-1 values are present.
    PrecomputedOnly,
}

/// The KPI values of one provider and fiscal year.
#[derive(Debug, Clone, Serialize)]
pub struct KpiReport {
    pub provider_id: ProviderId,
    pub fiscal_year: i32,
    pub capability: Capability,
    /// Values in display order: every parent directly followed by its children.
    pub values: Vec<KpiValue>,
    /// Human-readable notes on missing inputs and degradation.
    pub diagnostics: Vec<String>,
}

impl KpiReport {
    pub fn value(&self, kpi_key: KpiKey) -> Option<&KpiValue> {
        self.values.iter().find(|v| v.kpi_key == kpi_key)
    }
}

/// Benchmarks of one provider's peer group, read from a single snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkView {
    /// `None` when the provider cannot be placed in the requested partition.
    pub peer_group_key: Option<PeerGroupKey>,
    pub fiscal_year: i32,
    pub snapshot_version: u64,
    /// One entry per registered KPI; `None` means too few peers.
    pub records: BTreeMap<KpiKey, Option<BenchmarkRecord>>,
}

impl BenchmarkView {
    pub fn get(&self, kpi_key: KpiKey) -> Option<&BenchmarkRecord> {
        self.records.get(&kpi_key).and_then(Option::as_ref)
    }
}

/// Outcome of a benchmark rebuild or restore.
#[derive(Debug, Clone, Serialize)]
pub struct RebuildSummary {
    pub fiscal_year: i32,
    pub version: u64,
    pub providers: usize,
    /// Records for `fiscal_year` in the published snapshot.
    pub records: usize,
    pub archived: bool,
}
