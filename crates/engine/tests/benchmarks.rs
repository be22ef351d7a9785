mod common;

use benchmarks::BenchmarkError;
use common::{Filing, provider, seed, service};
use core_types::{
    BenchmarkRecord, KpiKey, KpiLevel, PeerGroupKey, PeerGroupLevel, StoreError, Trend,
};
use database::MemoryStore;
use engine::EngineError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Five Alabama short-term hospitals with operating margins 10%, 8%, 6%, 4% and 2%.
fn seed_state(store: &MemoryStore, fiscal_year: i32) {
    let expenses = [dec!(900), dec!(920), dec!(940), dec!(960), dec!(980)];
    for (n, operating_expenses) in expenses.into_iter().enumerate() {
        let filing = Filing {
            operating_expenses,
            ..Filing::default()
        };
        seed(store, &provider(&format!("01000{}", n + 1)), fiscal_year, &filing);
    }
}

fn operating_margin_record(provider_count: usize) -> BenchmarkRecord {
    BenchmarkRecord {
        kpi_key: KpiKey::OperatingMargin,
        peer_group_key: PeerGroupKey::state("01"),
        fiscal_year: 2022,
        provider_count,
        p25: dec!(0.01),
        median: dec!(0.03),
        p75: dec!(0.05),
        mean: dec!(0.03),
        min: dec!(-0.02),
        max: dec!(0.09),
    }
}

#[tokio::test]
async fn rebuild_publishes_state_benchmarks() {
    let store = Arc::new(MemoryStore::new());
    seed_state(&store, 2022);
    let service = service(&store);

    let summary = service.rebuild_benchmarks(2022).await.unwrap();
    assert_eq!(summary.version, 1);
    assert_eq!(summary.providers, 5);
    assert!(summary.records > 0);
    assert!(!summary.archived);

    let view = service.get_benchmarks(&provider("010003"), 2022, PeerGroupLevel::State);
    assert_eq!(view.peer_group_key, Some(PeerGroupKey::state("01")));
    assert_eq!(view.snapshot_version, 1);

    let margin = view.get(KpiKey::OperatingMargin).unwrap();
    assert_eq!(margin.provider_count, 5);
    assert_eq!(margin.min, dec!(0.02));
    assert_eq!(margin.p25, dec!(0.04));
    assert_eq!(margin.median, dec!(0.06));
    assert_eq!(margin.p75, dec!(0.08));
    assert_eq!(margin.max, dec!(0.10));
    assert_eq!(margin.mean, dec!(0.06));

    // Every registered KPI has an entry, present or not.
    assert_eq!(view.records.len(), service.registry().len());
}

#[tokio::test]
async fn groups_below_three_providers_have_no_benchmark() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &provider("010001"), 2022, &Filing::default());
    seed(&store, &provider("010002"), 2022, &Filing::default());
    let service = service(&store);

    let summary = service.rebuild_benchmarks(2022).await.unwrap();
    assert_eq!(summary.records, 0);

    let view = service.get_benchmarks(&provider("010001"), 2022, PeerGroupLevel::National);
    assert!(view.records.values().all(Option::is_none));
    assert_eq!(view.get(KpiKey::OperatingMargin), None);
}

#[tokio::test]
async fn rebuild_archives_before_publishing() {
    let store = Arc::new(MemoryStore::new());
    seed_state(&store, 2022);
    let service = service(&store).with_archive(store.clone());

    let summary = service.rebuild_benchmarks(2022).await.unwrap();
    assert!(summary.archived);

    let archived = store.archived();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].version, summary.version);
    assert_eq!(archived[0].records, service.snapshots().current().records);
}

#[tokio::test]
async fn readers_keep_their_snapshot_across_a_rebuild() {
    let store = Arc::new(MemoryStore::new());
    seed_state(&store, 2022);
    let service = service(&store);

    service.rebuild_benchmarks(2022).await.unwrap();
    let held = service.snapshots().current();

    service.rebuild_benchmarks(2022).await.unwrap();

    assert_eq!(held.version, 1);
    assert_eq!(service.snapshots().current().version, 2);
    assert_eq!(held.records, service.snapshots().current().records);
}

#[tokio::test]
async fn rebuild_keeps_other_fiscal_years() {
    let store = Arc::new(MemoryStore::new());
    seed_state(&store, 2021);
    seed_state(&store, 2022);
    let service = service(&store);

    service.rebuild_benchmarks(2021).await.unwrap();
    service.rebuild_benchmarks(2022).await.unwrap();

    let id = provider("010001");
    let earlier = service.get_benchmarks(&id, 2021, PeerGroupLevel::State);
    let later = service.get_benchmarks(&id, 2022, PeerGroupLevel::State);
    assert!(earlier.get(KpiKey::OperatingMargin).is_some());
    assert!(later.get(KpiKey::OperatingMargin).is_some());
    assert_eq!(later.snapshot_version, 2);
}

#[tokio::test]
async fn rebuild_reports_progress_per_provider() {
    let store = Arc::new(MemoryStore::new());
    seed_state(&store, 2022);
    let service = service(&store);
    let calls = AtomicUsize::new(0);

    service
        .rebuild_benchmarks_with_progress(2022, |done, total| {
            assert!(done <= total);
            assert_eq!(total, 5);
            calls.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn rebuild_fails_and_keeps_the_snapshot_when_the_backend_is_down() {
    let store = Arc::new(MemoryStore::new());
    seed_state(&store, 2022);
    let service = service(&store);
    service.rebuild_benchmarks(2022).await.unwrap();

    store.set_worksheet_unavailable(true);
    let err = service.rebuild_benchmarks(2022).await.unwrap_err();

    assert!(matches!(err, EngineError::Store(StoreError::Unavailable(_))), "{err}");
    assert_eq!(service.snapshots().current().version, 1);
}

#[tokio::test]
async fn restore_seeds_the_snapshot_from_prior_benchmarks() {
    let store = Arc::new(MemoryStore::new());
    store.insert_prior_benchmark(operating_margin_record(12));
    let service = service(&store);

    let summary = service.restore_benchmarks(2022).await.unwrap();
    assert_eq!(summary.version, 1);
    assert_eq!(summary.records, 1);

    let view = service.get_benchmarks(&provider("010001"), 2022, PeerGroupLevel::State);
    assert_eq!(view.get(KpiKey::OperatingMargin), Some(&operating_margin_record(12)));
}

#[tokio::test]
async fn restore_without_prior_benchmarks_fails() {
    let store = Arc::new(MemoryStore::new());
    let service = service(&store);

    let err = service.restore_benchmarks(2022).await.unwrap_err();

    assert!(matches!(
        err,
        EngineError::Benchmark(BenchmarkError::NothingToRestore(2022))
    ));
    assert_eq!(service.snapshots().current().version, 0);
}

#[tokio::test]
async fn restore_rejects_records_below_the_peer_minimum() {
    let store = Arc::new(MemoryStore::new());
    store.insert_prior_benchmark(operating_margin_record(2));
    let service = service(&store);

    let err = service.restore_benchmarks(2022).await.unwrap_err();

    assert!(matches!(
        err,
        EngineError::Benchmark(BenchmarkError::InconsistentRecord { .. })
    ));
    assert_eq!(service.snapshots().current().version, 0);
}

#[tokio::test]
async fn ranking_uses_benchmarks_and_history() {
    let store = Arc::new(MemoryStore::new());
    seed_state(&store, 2022);
    // 010003 improved from a 5% margin in 2021 to 6% in 2022.
    let id = provider("010003");
    let earlier = Filing {
        operating_expenses: dec!(950),
        ..Filing::default()
    };
    seed(&store, &id, 2021, &earlier);
    let service = service(&store);
    service.rebuild_benchmarks(2022).await.unwrap();

    let report = service.compute_kpis(&id, 2022, KpiLevel::One).await.unwrap();
    let benchmarks = service.get_benchmarks(&id, 2022, PeerGroupLevel::State);
    let ranked = service
        .rank_kpis(&id, 2022, &report.values, &benchmarks)
        .await
        .unwrap();

    assert_eq!(ranked.len(), report.values.len());
    let margin = ranked
        .iter()
        .find(|r| r.kpi_key == KpiKey::OperatingMargin)
        .unwrap();
    assert_eq!(margin.trend, Trend::Up);
    assert_eq!(margin.percentile_rank, Some(dec!(50)));
    assert_eq!(margin.performance_gap, Some(Decimal::ZERO));

    for pair in ranked.windows(2) {
        assert!(pair[0].dynamic_priority >= pair[1].dynamic_priority);
    }
}

#[tokio::test]
async fn ranking_without_history_or_benchmarks_is_neutral() {
    let store = Arc::new(MemoryStore::new());
    let id = provider("010001");
    seed(&store, &id, 2022, &Filing::default());
    let service = service(&store);

    let report = service.compute_kpis(&id, 2022, KpiLevel::One).await.unwrap();
    let benchmarks = service.get_benchmarks(&id, 2022, PeerGroupLevel::State);
    let ranked = service
        .rank_kpis(&id, 2022, &report.values, &benchmarks)
        .await
        .unwrap();

    for result in &ranked {
        assert_eq!(result.trend, Trend::Unknown, "{}", result.kpi_key);
        assert_eq!(result.percentile_rank, None);
        assert_eq!(result.performance_gap, None);
    }
}

#[tokio::test]
async fn ranking_rejects_values_of_another_provider() {
    let store = Arc::new(MemoryStore::new());
    let id = provider("010001");
    seed(&store, &id, 2022, &Filing::default());
    let service = service(&store);

    let report = service.compute_kpis(&id, 2022, KpiLevel::One).await.unwrap();
    let benchmarks = service.get_benchmarks(&id, 2022, PeerGroupLevel::State);
    let err = service
        .rank_kpis(&provider("010002"), 2022, &report.values, &benchmarks)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidRequest(_)));
}
