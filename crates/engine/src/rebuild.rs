use crate::error::EngineError;
use crate::report::{Capability, RebuildSummary};
use crate::service::KpiService;
use benchmarks::{BenchmarkError, index_records};
use core_types::{BenchmarkKey, BenchmarkRecord, KpiLevel, KpiValue};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;

impl KpiService {
    /// Recomputes the benchmarks of one fiscal year from every reporting
    /// provider and publishes them as a new snapshot.
    pub async fn rebuild_benchmarks(&self, fiscal_year: i32) -> Result<RebuildSummary, EngineError> {
        self.rebuild_benchmarks_with_progress(fiscal_year, |_, _| {}).await
    }

    /// Like `rebuild_benchmarks`, reporting `(providers_done, providers_total)`
    /// after each provider completes.
    ///
    /// Records of other fiscal years are carried over from the current
    /// snapshot. The new snapshot is archived (when an archive is configured)
    /// before readers can see it. A provider that can only be served from the
    /// precomputed store aborts the rebuild rather than skewing the peer set.
    pub async fn rebuild_benchmarks_with_progress<F>(
        &self,
        fiscal_year: i32,
        progress: F,
    ) -> Result<RebuildSummary, EngineError>
    where
        F: Fn(usize, usize),
    {
        let _rebuild = self.rebuild_lock.lock().await;

        let providers = self.worksheets.providers(fiscal_year).await?;
        let total = providers.len();
        tracing::info!(fiscal_year, providers = total, "Rebuilding benchmarks.");

        let mut reports = stream::iter(providers.iter())
            .map(|provider_id| self.compute_kpis(provider_id, fiscal_year, KpiLevel::Three))
            .buffer_unordered(self.rebuild_concurrency);

        let mut values: Vec<KpiValue> = Vec::new();
        let mut done = 0;
        while let Some(report) = reports.next().await {
            let report = report?;
            if report.capability != Capability::Full {
                return Err(EngineError::RebuildIncomplete {
                    fiscal_year,
                    reason: format!("provider {} was served precomputed-only", report.provider_id),
                });
            }
            values.extend(report.values);
            done += 1;
            progress(done, total);
        }
        drop(reports);

        let aggregator = self.aggregator;
        let fresh = tokio::task::spawn_blocking(move || aggregator.aggregate_all(&values)).await?;
        let fresh_count = fresh.len();

        let snapshot = self.snapshots.prepare(self.merge_year(fiscal_year, fresh));
        let archived = match &self.archive {
            Some(archive) => {
                archive.archive(&snapshot).await?;
                true
            }
            None => false,
        };
        let published = self.snapshots.install(snapshot)?;

        tracing::info!(
            fiscal_year,
            version = published.version,
            records = fresh_count,
            "Benchmark rebuild complete."
        );
        Ok(RebuildSummary {
            fiscal_year,
            version: published.version,
            providers: total,
            records: fresh_count,
            archived,
        })
    }

    /// Seeds the current snapshot with the benchmarks the precomputed store
    /// holds for `fiscal_year`, e.g. after a restart.
    pub async fn restore_benchmarks(&self, fiscal_year: i32) -> Result<RebuildSummary, EngineError> {
        let _rebuild = self.rebuild_lock.lock().await;

        let prior = self.precomputed.prior_benchmarks(fiscal_year).await?;
        if prior.is_empty() {
            return Err(BenchmarkError::NothingToRestore(fiscal_year).into());
        }
        if let Some(stray) = prior.iter().find(|r| r.fiscal_year != fiscal_year) {
            return Err(EngineError::InvalidRequest(format!(
                "prior benchmark for {} belongs to fiscal year {}",
                stray.kpi_key, stray.fiscal_year
            )));
        }

        let restored = index_records(prior)?;
        let restored_count = restored.len();
        let published = self.snapshots.publish(self.merge_year(fiscal_year, restored));

        tracing::info!(
            fiscal_year,
            version = published.version,
            records = restored_count,
            "Benchmarks restored from precomputed store."
        );
        Ok(RebuildSummary {
            fiscal_year,
            version: published.version,
            providers: 0,
            records: restored_count,
            archived: false,
        })
    }

    /// The current snapshot's records with `fiscal_year` replaced by `year_records`.
    fn merge_year(
        &self,
        fiscal_year: i32,
        year_records: BTreeMap<BenchmarkKey, BenchmarkRecord>,
    ) -> BTreeMap<BenchmarkKey, BenchmarkRecord> {
        let current = self.snapshots.current();
        let mut merged: BTreeMap<BenchmarkKey, BenchmarkRecord> = current
            .records
            .iter()
            .filter(|((_, _, year), _)| *year != fiscal_year)
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect();
        merged.extend(year_records);
        merged
    }
}
