//! # Ranking Engine
//!
//! Orders KPI cards for display. For every KPI it derives a trend from the
//! provider's history, the percentile rank and performance gap against the peer
//! benchmark, and a dynamic priority that combines the gap with the configured
//! impact and ease-of-change weights.
//!
//! ## Public API
//!
//! - `RankingEngine::rank`: computes all signals and returns them in display order.
//! - `signals`: the individual, pure signal functions.

use configuration::RankingSettings;
use core_types::{BenchmarkRecord, KpiKey, RankingResult};
use rust_decimal::Decimal;
use std::collections::BTreeSet;

pub mod error;
pub mod signals;

pub use error::RankingError;

/// Everything known about one KPI of one provider at ranking time.
#[derive(Debug, Clone)]
pub struct RankingInput<'a> {
    pub kpi_key: KpiKey,
    pub higher_is_better: bool,
    /// Value in the fiscal year being ranked.
    pub value: Option<Decimal>,
    /// `(fiscal_year, value)` for every year up to and including the ranked one.
    pub history: Vec<(i32, Option<Decimal>)>,
    /// The peer benchmark, when the peer group had enough participants.
    pub benchmark: Option<&'a BenchmarkRecord>,
}

/// Computes ranking signals using externally configured weights.
#[derive(Debug, Clone)]
pub struct RankingEngine {
    settings: RankingSettings,
}

impl RankingEngine {
    pub fn new(settings: RankingSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RankingSettings {
        &self.settings
    }

    /// Scores every input and returns the results by descending priority.
    ///
    /// Equal priorities are ordered by KPI key, so the result is a strict
    /// total order.
    pub fn rank(&self, inputs: &[RankingInput<'_>]) -> Result<Vec<RankingResult>, RankingError> {
        let mut seen = BTreeSet::new();
        let mut results = Vec::with_capacity(inputs.len());

        for input in inputs {
            if !seen.insert(input.kpi_key) {
                return Err(RankingError::DuplicateKpi(input.kpi_key));
            }
            results.push(self.score(input)?);
        }

        results.sort_by(|a, b| {
            b.dynamic_priority
                .cmp(&a.dynamic_priority)
                .then_with(|| a.kpi_key.as_str().cmp(b.kpi_key.as_str()))
        });

        tracing::debug!(kpis = results.len(), "KPIs ranked.");
        Ok(results)
    }

    fn score(&self, input: &RankingInput<'_>) -> Result<RankingResult, RankingError> {
        if let Some(benchmark) = input.benchmark {
            if benchmark.kpi_key != input.kpi_key {
                return Err(RankingError::BenchmarkMismatch {
                    kpi: input.kpi_key,
                    benchmark: benchmark.kpi_key,
                });
            }
        }

        let trend = signals::trend(
            &input.history,
            input.higher_is_better,
            self.settings.trend_tolerance,
        );

        let (percentile_rank, performance_gap) = match (input.value, input.benchmark) {
            (Some(value), Some(benchmark)) => (
                Some(signals::percentile_rank(value, benchmark)),
                signals::performance_gap(value, benchmark.median, input.higher_is_better),
            ),
            _ => (None, None),
        };

        let weights = self.settings.weights_for(input.kpi_key);
        Ok(RankingResult {
            kpi_key: input.kpi_key,
            dynamic_priority: signals::dynamic_priority(&weights, performance_gap),
            trend,
            percentile_rank,
            performance_gap,
        })
    }
}
