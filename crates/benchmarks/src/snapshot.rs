use crate::aggregator::MIN_PEER_COUNT;
use crate::error::BenchmarkError;
use chrono::Utc;
use core_types::{BenchmarkKey, BenchmarkRecord, BenchmarkSnapshot};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Holds the benchmark snapshot that readers currently see.
///
/// Readers clone the inner `Arc` and release the lock immediately, so a
/// concurrent publish never blocks on a slow reader and never invalidates a
/// snapshot a reader is still holding.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<BenchmarkSnapshot>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// Starts from the empty version-zero snapshot.
    pub fn new() -> Self {
        Self::with_snapshot(BenchmarkSnapshot::empty())
    }

    pub fn with_snapshot(snapshot: BenchmarkSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The currently published snapshot.
    pub fn current(&self) -> Arc<BenchmarkSnapshot> {
        // A poisoned lock still guards a fully formed Arc; the swap is a single assignment.
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Builds, without publishing, the snapshot that would follow the current one.
    ///
    /// Lets a caller archive a snapshot durably before readers can see it.
    pub fn prepare(&self, records: BTreeMap<BenchmarkKey, BenchmarkRecord>) -> BenchmarkSnapshot {
        BenchmarkSnapshot {
            version: self.current().version + 1,
            snapshot_id: Uuid::new_v4(),
            built_at: Utc::now(),
            records,
        }
    }

    /// Makes a prepared snapshot current. A snapshot that is not newer than
    /// the current one is rejected.
    pub fn install(&self, snapshot: BenchmarkSnapshot) -> Result<Arc<BenchmarkSnapshot>, BenchmarkError> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        if snapshot.version <= guard.version {
            return Err(BenchmarkError::StaleSnapshot {
                version: snapshot.version,
                current: guard.version,
            });
        }
        let snapshot = Arc::new(snapshot);
        let retired = std::mem::replace(&mut *guard, Arc::clone(&snapshot));
        drop(guard);

        log_swap(&snapshot, &retired);
        Ok(snapshot)
    }

    /// Builds a new snapshot from `records` and makes it current in one step.
    ///
    /// Returns the published snapshot. The previous one is dropped once its
    /// last reader lets go of it.
    pub fn publish(&self, records: BTreeMap<BenchmarkKey, BenchmarkRecord>) -> Arc<BenchmarkSnapshot> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let snapshot = Arc::new(BenchmarkSnapshot {
            version: guard.version + 1,
            snapshot_id: Uuid::new_v4(),
            built_at: Utc::now(),
            records,
        });
        let retired = std::mem::replace(&mut *guard, Arc::clone(&snapshot));
        drop(guard);

        log_swap(&snapshot, &retired);
        snapshot
    }
}

fn log_swap(published: &BenchmarkSnapshot, retired: &BenchmarkSnapshot) {
    tracing::info!(
        version = published.version,
        snapshot_id = %published.snapshot_id,
        records = published.len(),
        retired_version = retired.version,
        "Benchmark snapshot published."
    );
}

/// Keys externally sourced records for publication, rejecting any set a
/// fresh aggregation could not have produced.
pub fn index_records(
    records: Vec<BenchmarkRecord>,
) -> Result<BTreeMap<BenchmarkKey, BenchmarkRecord>, BenchmarkError> {
    let mut indexed = BTreeMap::new();
    for record in records {
        check_record(&record)?;
        let key = (
            record.kpi_key,
            record.peer_group_key.clone(),
            record.fiscal_year,
        );
        if indexed.contains_key(&key) {
            return Err(BenchmarkError::DuplicateRecord {
                kpi: record.kpi_key,
                peer_group: record.peer_group_key,
                fiscal_year: record.fiscal_year,
            });
        }
        indexed.insert(key, record);
    }
    Ok(indexed)
}

fn check_record(record: &BenchmarkRecord) -> Result<(), BenchmarkError> {
    let reason = if record.provider_count < MIN_PEER_COUNT {
        Some(format!("only {} participants", record.provider_count))
    } else if !(record.min <= record.p25
        && record.p25 <= record.median
        && record.median <= record.p75
        && record.p75 <= record.max)
    {
        Some("percentiles are out of order".to_string())
    } else if record.mean < record.min || record.mean > record.max {
        Some("mean lies outside [min, max]".to_string())
    } else {
        None
    };

    match reason {
        Some(reason) => Err(BenchmarkError::InconsistentRecord {
            kpi: record.kpi_key,
            peer_group: record.peer_group_key.clone(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{KpiKey, PeerGroupKey};
    use rust_decimal_macros::dec;

    fn records(median: rust_decimal::Decimal) -> BTreeMap<BenchmarkKey, BenchmarkRecord> {
        let record = BenchmarkRecord {
            kpi_key: KpiKey::CurrentRatio,
            peer_group_key: PeerGroupKey::national(),
            fiscal_year: 2022,
            provider_count: 3,
            p25: median,
            median,
            p75: median,
            mean: median,
            min: median,
            max: median,
        };
        BTreeMap::from([(
            (record.kpi_key, record.peer_group_key.clone(), record.fiscal_year),
            record,
        )])
    }

    #[test]
    fn starts_empty_at_version_zero() {
        let store = SnapshotStore::new();
        let current = store.current();
        assert_eq!(current.version, 0);
        assert!(current.is_empty());
    }

    #[test]
    fn publish_bumps_version_and_swaps_contents() {
        let store = SnapshotStore::new();
        let first = store.publish(records(dec!(1.5)));
        let second = store.publish(records(dec!(2.5)));

        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
        assert_ne!(first.snapshot_id, second.snapshot_id);
        assert_eq!(store.current().version, 2);
    }

    #[test]
    fn held_snapshot_survives_a_publish() {
        let store = SnapshotStore::new();
        store.publish(records(dec!(1.5)));

        let held = store.current();
        store.publish(records(dec!(9)));

        let old = held
            .get(KpiKey::CurrentRatio, &PeerGroupKey::national(), 2022)
            .unwrap();
        assert_eq!(old.median, dec!(1.5));
        let new = store.current();
        assert_eq!(
            new.get(KpiKey::CurrentRatio, &PeerGroupKey::national(), 2022)
                .unwrap()
                .median,
            dec!(9)
        );
    }

    #[test]
    fn prepared_snapshot_is_invisible_until_installed() {
        let store = SnapshotStore::new();
        let prepared = store.prepare(records(dec!(4)));
        assert_eq!(prepared.version, 1);
        assert_eq!(store.current().version, 0);

        let installed = store.install(prepared.clone()).unwrap();
        assert_eq!(installed.version, 1);
        assert_eq!(store.current().snapshot_id, prepared.snapshot_id);

        // Installing the same version twice is stale.
        assert_eq!(
            store.install(prepared).unwrap_err(),
            BenchmarkError::StaleSnapshot { version: 1, current: 1 }
        );
    }

    #[test]
    fn indexing_rejects_duplicates_and_thin_records() {
        let mut record = records(dec!(2)).into_values().next().unwrap();
        assert!(index_records(vec![record.clone()]).is_ok());

        let err = index_records(vec![record.clone(), record.clone()]).unwrap_err();
        assert!(matches!(err, BenchmarkError::DuplicateRecord { fiscal_year: 2022, .. }));

        record.provider_count = 2;
        assert!(matches!(
            index_records(vec![record.clone()]).unwrap_err(),
            BenchmarkError::InconsistentRecord { .. }
        ));

        record.provider_count = 4;
        record.p25 = dec!(3);
        assert!(index_records(vec![record]).is_err());
    }

    #[test]
    fn concurrent_readers_see_whole_snapshots() {
        let store = Arc::new(SnapshotStore::new());
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for n in 0..50 {
                    store.publish(records(rust_decimal::Decimal::from(n)));
                }
            })
        };

        for _ in 0..200 {
            let snapshot = store.current();
            assert!(snapshot.version == 0 || snapshot.len() == 1);
        }
        writer.join().unwrap();
        assert_eq!(store.current().version, 50);
    }
}
