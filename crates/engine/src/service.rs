use crate::error::EngineError;
use crate::report::{BenchmarkView, Capability, KpiReport};
use benchmarks::{BenchmarkAggregator, SnapshotStore};
use configuration::Config;
use core_types::{
    BenchmarkArchive, Coordinate, KpiKey, KpiLevel, KpiStatus, KpiValue, PeerGroupLevel,
    PrecomputedStore, ProviderId, RankingResult, ValueSource, WorksheetRepository,
};
use formulas::{CoordinateValues, FormulaRegistry, is_reported};
use futures::future::join_all;
use peer_groups::PeerGroupClassifier;
use ranking::{RankingEngine, RankingInput};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// The single entry point for computing, benchmarking and ranking KPIs.
///
/// `KpiService` is `Send + Sync` and meant to be shared behind an `Arc`.
pub struct KpiService {
    pub(crate) worksheets: Arc<dyn WorksheetRepository>,
    pub(crate) precomputed: Arc<dyn PrecomputedStore>,
    pub(crate) archive: Option<Arc<dyn BenchmarkArchive>>,
    pub(crate) registry: FormulaRegistry,
    pub(crate) classifier: PeerGroupClassifier,
    pub(crate) aggregator: BenchmarkAggregator,
    pub(crate) snapshots: SnapshotStore,
    pub(crate) ranking: RankingEngine,
    pub(crate) rebuild_concurrency: usize,
    /// Serializes rebuilds and restores so prepared versions never collide.
    pub(crate) rebuild_lock: tokio::sync::Mutex<()>,
}

impl KpiService {
    /// Creates a service over the standard formula registry.
    pub fn new(
        worksheets: Arc<dyn WorksheetRepository>,
        precomputed: Arc<dyn PrecomputedStore>,
        config: &Config,
    ) -> Result<Self, EngineError> {
        let registry = FormulaRegistry::standard()?;
        let classifier = PeerGroupClassifier::new();
        Ok(Self {
            worksheets,
            precomputed,
            archive: None,
            registry,
            classifier,
            aggregator: BenchmarkAggregator::new(classifier),
            snapshots: SnapshotStore::new(),
            ranking: RankingEngine::new(config.ranking.clone()),
            rebuild_concurrency: config.benchmarks.rebuild_concurrency.max(1),
            rebuild_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Archives every snapshot a rebuild publishes.
    pub fn with_archive(mut self, archive: Arc<dyn BenchmarkArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn registry(&self) -> &FormulaRegistry {
        &self.registry
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Computes every KPI down to `level` for one provider and fiscal year.
    ///
    /// Level-1 values come from the precomputed store when it has them and
    /// from the worksheet formulas otherwise. If the worksheet backend is
    /// unreachable the report degrades to `PrecomputedOnly`: level-2 and
    /// level-3 values are `Unsupported`. Any other store failure is an error.
    pub async fn compute_kpis(
        &self,
        provider_id: &ProviderId,
        fiscal_year: i32,
        level: KpiLevel,
    ) -> Result<KpiReport, EngineError> {
        let keys = self.registry.tree_order(level);
        let mut diagnostics = Vec::new();

        // --- 1. Precomputed level-1 values ---
        let level_one: Vec<KpiKey> = keys
            .iter()
            .copied()
            .filter(|key| self.level_of(*key) == Some(KpiLevel::One))
            .collect();
        let lookups = level_one
            .iter()
            .map(|key| self.precomputed.lookup_precomputed(*key, provider_id, fiscal_year));
        let mut precomputed = HashMap::new();
        for (key, result) in level_one.iter().zip(join_all(lookups).await) {
            if let Some(value) = result? {
                precomputed.insert(*key, value);
            }
        }

        // --- 2. Worksheet cells for everything else ---
        let from_worksheets: Vec<KpiKey> = keys
            .iter()
            .copied()
            .filter(|key| !precomputed.contains_key(key))
            .collect();
        let (capability, cells) = match self
            .fetch_cells(provider_id, fiscal_year, &from_worksheets)
            .await
        {
            Ok(cells) => (Capability::Full, Some(cells)),
            Err(EngineError::Store(e)) if e.is_unavailable() => {
                tracing::warn!(
                    provider = %provider_id,
                    fiscal_year,
                    error = %e,
                    "Worksheet backend unavailable; serving precomputed values only."
                );
                diagnostics.push(format!("worksheet backend unavailable: {e}"));
                (Capability::PrecomputedOnly, None)
            }
            Err(e) => return Err(e),
        };

        // --- 3. Assemble values in tree order ---
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            let definition = self.registry.get(key)?.definition;
            let (value, status, source) = match (precomputed.get(&key), &cells) {
                (Some(value), _) => (
                    Some(*value),
                    KpiStatus::Computed,
                    Some(ValueSource::Precomputed),
                ),
                (None, Some(cells)) => {
                    let evaluation = self.registry.evaluate(key, cells)?;
                    let source = evaluation.value.map(|_| ValueSource::Worksheet);
                    (evaluation.value, evaluation.status, source)
                }
                (None, None) if definition.level == KpiLevel::One => {
                    (None, KpiStatus::MissingPrecomputed, None)
                }
                (None, None) => (None, KpiStatus::Unsupported, None),
            };

            match &status {
                KpiStatus::MissingInput { coordinate } => {
                    diagnostics.push(format!("{key}: missing input {coordinate}"));
                }
                KpiStatus::UndefinedRatio => {
                    diagnostics.push(format!("{key}: zero denominator"));
                }
                _ => {}
            }

            values.push(KpiValue {
                kpi_key: key,
                level: definition.level,
                provider_id: provider_id.clone(),
                fiscal_year,
                value,
                parent_kpi_key: definition.parent,
                status,
                source,
            });
        }

        tracing::debug!(
            provider = %provider_id,
            fiscal_year,
            kpis = values.len(),
            ?capability,
            "KPIs computed."
        );
        Ok(KpiReport {
            provider_id: provider_id.clone(),
            fiscal_year,
            capability,
            values,
            diagnostics,
        })
    }

    fn level_of(&self, key: KpiKey) -> Option<KpiLevel> {
        self.registry.get(key).ok().map(|entry| entry.definition.level)
    }

    /// Fetches every coordinate `keys` need, each exactly once.
    ///
    /// Coordinates on worksheets that were not filed in `fiscal_year` are
    /// left absent without a store round-trip.
    async fn fetch_cells(
        &self,
        provider_id: &ProviderId,
        fiscal_year: i32,
        keys: &[KpiKey],
    ) -> Result<CoordinateValues, EngineError> {
        let coordinates: Vec<Coordinate> = self
            .registry
            .required_coordinates(keys)?
            .into_iter()
            .filter(|c| is_reported(&c.worksheet_code, fiscal_year))
            .collect();

        let lookups = coordinates.iter().map(|c| {
            self.worksheets.lookup(
                &c.worksheet_code,
                provider_id,
                fiscal_year,
                &c.line_code,
                &c.column_code,
            )
        });
        let results = join_all(lookups).await;

        let mut cells = CoordinateValues::with_capacity(coordinates.len());
        for (coordinate, result) in coordinates.into_iter().zip(results) {
            if let Some(value) = result? {
                cells.insert(coordinate, value);
            }
        }
        Ok(cells)
    }

    /// Benchmarks of every registered KPI for the provider's peer group at `level`.
    pub fn get_benchmarks(
        &self,
        provider_id: &ProviderId,
        fiscal_year: i32,
        level: PeerGroupLevel,
    ) -> BenchmarkView {
        let classification = self.classifier.classify_id(provider_id);
        let peer_group_key = classification.peer_group(level).cloned();
        let snapshot = self.snapshots.current();

        let records = self
            .registry
            .keys()
            .map(|key| {
                let record = peer_group_key
                    .as_ref()
                    .and_then(|group| snapshot.get(key, group, fiscal_year))
                    .cloned();
                (key, record)
            })
            .collect();

        BenchmarkView {
            peer_group_key,
            fiscal_year,
            snapshot_version: snapshot.version,
            records,
        }
    }

    /// Ranks the provider's KPI values for display.
    ///
    /// History for the trend is computed for every year the provider filed up
    /// to `fiscal_year`. If the worksheet backend cannot list those years, the
    /// trend is based on the current value alone.
    pub async fn rank_kpis(
        &self,
        provider_id: &ProviderId,
        fiscal_year: i32,
        values: &[KpiValue],
        benchmarks: &BenchmarkView,
    ) -> Result<Vec<RankingResult>, EngineError> {
        if let Some(stray) = values
            .iter()
            .find(|v| &v.provider_id != provider_id || v.fiscal_year != fiscal_year)
        {
            return Err(EngineError::InvalidRequest(format!(
                "value for {} / {} does not belong to {provider_id} / {fiscal_year}",
                stray.provider_id, stray.fiscal_year
            )));
        }

        let history = self.history(provider_id, fiscal_year, values).await?;

        let mut inputs = Vec::with_capacity(values.len());
        for value in values {
            let definition = self.registry.get(value.kpi_key)?.definition;
            let mut series = history.get(&value.kpi_key).cloned().unwrap_or_default();
            series.push((fiscal_year, value.value));
            inputs.push(RankingInput {
                kpi_key: value.kpi_key,
                higher_is_better: definition.higher_is_better,
                value: value.value,
                history: series,
                benchmark: benchmarks.get(value.kpi_key),
            });
        }

        Ok(self.ranking.rank(&inputs)?)
    }

    /// Prior-year values of the KPIs in `values`, keyed by KPI.
    async fn history(
        &self,
        provider_id: &ProviderId,
        fiscal_year: i32,
        values: &[KpiValue],
    ) -> Result<BTreeMap<KpiKey, Vec<(i32, Option<Decimal>)>>, EngineError> {
        let mut history: BTreeMap<KpiKey, Vec<(i32, Option<Decimal>)>> = BTreeMap::new();
        let Some(depth) = values.iter().map(|v| v.level).max() else {
            return Ok(history);
        };

        let years = match self.worksheets.available_years(provider_id).await {
            Ok(years) => years,
            Err(e) if e.is_unavailable() => {
                tracing::warn!(provider = %provider_id, error = %e, "No history available for trends.");
                return Ok(history);
            }
            Err(e) => return Err(EngineError::Store(e)),
        };

        let prior: Vec<i32> = years.into_iter().filter(|year| *year < fiscal_year).collect();
        let reports = join_all(
            prior
                .iter()
                .map(|year| self.compute_kpis(provider_id, *year, depth)),
        )
        .await;

        for report in reports {
            let report = report?;
            for value in &report.values {
                if values.iter().any(|v| v.kpi_key == value.kpi_key) {
                    history
                        .entry(value.kpi_key)
                        .or_default()
                        .push((report.fiscal_year, value.value));
                }
            }
        }
        Ok(history)
    }
}

impl std::fmt::Debug for KpiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KpiService")
            .field("kpis", &self.registry.len())
            .field("snapshot_version", &self.snapshots.current().version)
            .field("archive", &self.archive.is_some())
            .field("rebuild_concurrency", &self.rebuild_concurrency)
            .finish()
    }
}

