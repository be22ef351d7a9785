use crate::stats::summarize;
use core_types::{BenchmarkKey, BenchmarkRecord, KpiKey, KpiValue, PeerGroupKey, ProviderId};
use peer_groups::PeerGroupClassifier;
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

/// Smallest participant set that produces a benchmark record.
pub const MIN_PEER_COUNT: usize = 3;

/// Computes percentile benchmarks from provider-level KPI values.
#[derive(Debug, Clone, Copy)]
pub struct BenchmarkAggregator {
    classifier: PeerGroupClassifier,
    min_peer_count: usize,
}

impl Default for BenchmarkAggregator {
    fn default() -> Self {
        Self::new(PeerGroupClassifier::new())
    }
}

impl BenchmarkAggregator {
    pub fn new(classifier: PeerGroupClassifier) -> Self {
        Self {
            classifier,
            min_peer_count: MIN_PEER_COUNT,
        }
    }

    /// Aggregates one KPI for one fiscal year.
    ///
    /// `values` holds one entry per provider; null values are skipped, never
    /// counted as zero. A provider listed twice is counted once (first wins).
    /// Records come back sorted by peer group.
    pub fn aggregate(
        &self,
        kpi_key: KpiKey,
        fiscal_year: i32,
        values: &[(ProviderId, Option<Decimal>)],
    ) -> Vec<BenchmarkRecord> {
        let mut seen = BTreeSet::new();
        let mut partitions: BTreeMap<PeerGroupKey, Vec<Decimal>> = BTreeMap::new();

        for (provider_id, value) in values {
            let Some(value) = value else { continue };
            if !seen.insert(provider_id) {
                tracing::debug!(provider = %provider_id, kpi = %kpi_key, "Duplicate provider value ignored.");
                continue;
            }
            for peer_group in self.classifier.classify_id(provider_id).peer_groups {
                partitions.entry(peer_group).or_default().push(*value);
            }
        }

        partitions
            .into_iter()
            .filter(|(_, participants)| participants.len() >= self.min_peer_count)
            .filter_map(|(peer_group_key, participants)| {
                let summary = summarize(&participants)?;
                Some(BenchmarkRecord {
                    kpi_key,
                    peer_group_key,
                    fiscal_year,
                    provider_count: summary.count,
                    p25: summary.p25,
                    median: summary.median,
                    p75: summary.p75,
                    mean: summary.mean,
                    min: summary.min,
                    max: summary.max,
                })
            })
            .collect()
    }

    /// Aggregates a full batch of KPI values across every KPI and fiscal year.
    ///
    /// Each `(kpi, year)` slice is independent and is aggregated on the rayon pool.
    pub fn aggregate_all(&self, values: &[KpiValue]) -> BTreeMap<BenchmarkKey, BenchmarkRecord> {
        let mut slices: BTreeMap<(KpiKey, i32), Vec<(ProviderId, Option<Decimal>)>> =
            BTreeMap::new();
        for value in values {
            slices
                .entry((value.kpi_key, value.fiscal_year))
                .or_default()
                .push((value.provider_id.clone(), value.value));
        }

        let slices: Vec<_> = slices.into_iter().collect();
        slices
            .par_iter()
            .flat_map_iter(|((kpi_key, fiscal_year), values)| {
                self.aggregate(*kpi_key, *fiscal_year, values)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|record| {
                let key = (
                    record.kpi_key,
                    record.peer_group_key.clone(),
                    record.fiscal_year,
                );
                (key, record)
            })
            .collect()
    }
}
