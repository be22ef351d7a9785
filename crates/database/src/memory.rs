use async_trait::async_trait;
use core_types::column_map::{kpi_for_column, resolve_precomputed};
use core_types::{
    BenchmarkArchive, BenchmarkRecord, BenchmarkSnapshot, Coordinate, KpiKey, PrecomputedStore,
    ProviderId, StoreError, WorksheetRecord, WorksheetRepository,
};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    worksheet: HashMap<(ProviderId, i32, Coordinate), Decimal>,
    /// Keyed by source column name, like the precomputed table.
    precomputed: HashMap<(ProviderId, i32, String), Decimal>,
    prior_benchmarks: Vec<BenchmarkRecord>,
    archived: Vec<BenchmarkSnapshot>,
}

/// An in-process implementation of every storage trait.
///
/// Used by tests and by embedders that load their data up front. The
/// worksheet backend can be switched off to exercise degraded operation;
/// the precomputed store keeps answering.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    worksheet_unavailable: AtomicBool,
    worksheet_lookups: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert_worksheet_value(
        &self,
        provider_id: &ProviderId,
        fiscal_year: i32,
        coordinate: Coordinate,
        value: Decimal,
    ) {
        self.write()
            .worksheet
            .insert((provider_id.clone(), fiscal_year, coordinate), value);
    }

    pub fn insert_worksheet_record(&self, record: &WorksheetRecord) {
        self.insert_worksheet_value(
            &record.provider_id,
            record.fiscal_year,
            record.coordinate(),
            record.value,
        );
    }

    /// Stores a precomputed measure under its source column name.
    ///
    /// Returns `false` (and stores nothing) when the name is not in the
    /// column allow-list.
    pub fn insert_precomputed(
        &self,
        provider_id: &ProviderId,
        fiscal_year: i32,
        column_name: &str,
        value: Decimal,
    ) -> bool {
        if kpi_for_column(column_name).is_none() {
            return false;
        }
        self.write().precomputed.insert(
            (provider_id.clone(), fiscal_year, column_name.to_string()),
            value,
        );
        true
    }

    pub fn insert_prior_benchmark(&self, record: BenchmarkRecord) {
        self.write().prior_benchmarks.push(record);
    }

    /// Every snapshot handed to `archive`, oldest first.
    pub fn archived(&self) -> Vec<BenchmarkSnapshot> {
        self.read().archived.clone()
    }

    /// Simulates the worksheet backend going down (or coming back).
    pub fn set_worksheet_unavailable(&self, unavailable: bool) {
        self.worksheet_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of worksheet cell lookups served so far.
    pub fn worksheet_lookups(&self) -> usize {
        self.worksheet_lookups.load(Ordering::SeqCst)
    }

    fn check_worksheet(&self) -> Result<(), StoreError> {
        if self.worksheet_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "worksheet backend is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl WorksheetRepository for MemoryStore {
    async fn lookup(
        &self,
        worksheet_code: &str,
        provider_id: &ProviderId,
        fiscal_year: i32,
        line_code: &str,
        column_code: &str,
    ) -> Result<Option<Decimal>, StoreError> {
        self.check_worksheet()?;
        self.worksheet_lookups.fetch_add(1, Ordering::SeqCst);
        let key = (
            provider_id.clone(),
            fiscal_year,
            Coordinate::new(worksheet_code, line_code, column_code),
        );
        Ok(self.read().worksheet.get(&key).copied())
    }

    async fn available_years(&self, provider_id: &ProviderId) -> Result<BTreeSet<i32>, StoreError> {
        self.check_worksheet()?;
        Ok(self
            .read()
            .worksheet
            .keys()
            .filter(|(id, _, _)| id == provider_id)
            .map(|(_, year, _)| *year)
            .collect())
    }

    async fn providers(&self, fiscal_year: i32) -> Result<Vec<ProviderId>, StoreError> {
        self.check_worksheet()?;
        let providers: BTreeSet<ProviderId> = self
            .read()
            .worksheet
            .keys()
            .filter(|(_, year, _)| *year == fiscal_year)
            .map(|(id, _, _)| id.clone())
            .collect();
        Ok(providers.into_iter().collect())
    }
}

#[async_trait]
impl PrecomputedStore for MemoryStore {
    async fn lookup_precomputed(
        &self,
        kpi_key: KpiKey,
        provider_id: &ProviderId,
        fiscal_year: i32,
    ) -> Result<Option<Decimal>, StoreError> {
        let tables = self.read();
        Ok(resolve_precomputed(kpi_key, |column| {
            tables
                .precomputed
                .get(&(provider_id.clone(), fiscal_year, column.to_string()))
                .copied()
        }))
    }

    async fn prior_benchmarks(&self, fiscal_year: i32) -> Result<Vec<BenchmarkRecord>, StoreError> {
        Ok(self
            .read()
            .prior_benchmarks
            .iter()
            .filter(|record| record.fiscal_year == fiscal_year)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BenchmarkArchive for MemoryStore {
    async fn archive(&self, snapshot: &BenchmarkSnapshot) -> Result<(), StoreError> {
        self.write().archived.push(snapshot.clone());
        Ok(())
    }
}
