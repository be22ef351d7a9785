use crate::DbError;
use async_trait::async_trait;
use core_types::column_map::{columns_for, resolve_precomputed};
use core_types::{
    BenchmarkArchive, BenchmarkRecord, BenchmarkSnapshot, HospitalType, KpiKey, PeerGroupKey,
    PeerGroupLevel, PrecomputedStore, ProviderId, StoreError, WorksheetRepository,
};
use rust_decimal::Decimal;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgRow};
use std::collections::BTreeSet;

/// The `DbRepository` implements every storage trait on top of PostgreSQL.
/// It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

fn store_err(e: impl Into<DbError>) -> StoreError {
    StoreError::from(e.into())
}

fn decode_err(what: &str, e: impl std::fmt::Display) -> DbError {
    DbError::DecodeError(format!("{what}: {e}"))
}

/// Lookups bind the canonical id verbatim, so a stored id must already be canonical.
fn stored_provider_id(raw: &str) -> Result<ProviderId, DbError> {
    match ProviderId::normalize(raw) {
        Ok(provider_id) if provider_id.as_str() == raw => Ok(provider_id),
        Ok(provider_id) => Err(decode_err(
            "provider id",
            format!("{raw:?} is stored unpadded, expected {provider_id}"),
        )),
        Err(e) => Err(decode_err("provider id", e)),
    }
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Maps one `benchmark_records` row back into a record.
    fn decode_benchmark(row: &PgRow) -> Result<BenchmarkRecord, DbError> {
        let kpi_key: String = row.try_get("kpi_key")?;
        let peer_level: String = row.try_get("peer_level")?;
        let state_code: Option<String> = row.try_get("state_code")?;
        let hospital_type: Option<String> = row.try_get("hospital_type")?;
        let provider_count: i32 = row.try_get("provider_count")?;

        let peer_group_key = PeerGroupKey {
            level: peer_level
                .parse::<PeerGroupLevel>()
                .map_err(|e| decode_err("peer_level", e))?,
            state_code,
            hospital_type: hospital_type
                .map(|kind| kind.parse::<HospitalType>())
                .transpose()
                .map_err(|e| decode_err("hospital_type", e))?,
        };

        Ok(BenchmarkRecord {
            kpi_key: kpi_key.parse::<KpiKey>().map_err(|e| decode_err("kpi_key", e))?,
            peer_group_key,
            fiscal_year: row.try_get("fiscal_year")?,
            provider_count: usize::try_from(provider_count)
                .map_err(|e| decode_err("provider_count", e))?,
            p25: row.try_get("p25")?,
            median: row.try_get("median")?,
            p75: row.try_get("p75")?,
            mean: row.try_get("mean")?,
            min: row.try_get("min_value")?,
            max: row.try_get("max_value")?,
        })
    }

    /// Writes the snapshot and its records in one transaction, flipping the
    /// current-snapshot pointer last.
    async fn save_snapshot(&self, snapshot: &BenchmarkSnapshot) -> Result<(), DbError> {
        let version = i64::try_from(snapshot.version).map_err(|e| decode_err("version", e))?;
        let record_count =
            i32::try_from(snapshot.len()).map_err(|e| decode_err("record_count", e))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO benchmark_snapshots (snapshot_id, version, built_at, record_count)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(snapshot.snapshot_id)
        .bind(version)
        .bind(snapshot.built_at)
        .bind(record_count)
        .execute(&mut *tx)
        .await?;

        for record in snapshot.records.values() {
            let provider_count = i32::try_from(record.provider_count)
                .map_err(|e| decode_err("provider_count", e))?;
            sqlx::query(
                r#"
                INSERT INTO benchmark_records (
                    snapshot_id, kpi_key, peer_level, state_code, hospital_type, fiscal_year,
                    provider_count, p25, median, p75, mean, min_value, max_value
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(snapshot.snapshot_id)
            .bind(record.kpi_key.as_str())
            .bind(record.peer_group_key.level.as_str())
            .bind(record.peer_group_key.state_code.as_deref())
            .bind(record.peer_group_key.hospital_type.map(|kind| kind.as_str()))
            .bind(record.fiscal_year)
            .bind(provider_count)
            .bind(record.p25)
            .bind(record.median)
            .bind(record.p75)
            .bind(record.mean)
            .bind(record.min)
            .bind(record.max)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO benchmark_current (id, snapshot_id, updated_at)
            VALUES (TRUE, $1, now())
            ON CONFLICT (id) DO UPDATE
            SET snapshot_id = EXCLUDED.snapshot_id, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(snapshot.snapshot_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl WorksheetRepository for DbRepository {
    async fn lookup(
        &self,
        worksheet_code: &str,
        provider_id: &ProviderId,
        fiscal_year: i32,
        line_code: &str,
        column_code: &str,
    ) -> Result<Option<Decimal>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT value
            FROM worksheet_values
            WHERE provider_id = $1 AND fiscal_year = $2
              AND worksheet_code = $3 AND line_code = $4 AND column_code = $5
            "#,
        )
        .bind(provider_id.as_str())
        .bind(fiscal_year)
        .bind(worksheet_code)
        .bind(line_code)
        .bind(column_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(|row| row.try_get::<Decimal, _>("value"))
            .transpose()
            .map_err(store_err)
    }

    async fn available_years(&self, provider_id: &ProviderId) -> Result<BTreeSet<i32>, StoreError> {
        let rows = sqlx::query(
            "SELECT DISTINCT fiscal_year FROM worksheet_values WHERE provider_id = $1",
        )
        .bind(provider_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter()
            .map(|row| row.try_get::<i32, _>("fiscal_year"))
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(store_err)
    }

    async fn providers(&self, fiscal_year: i32) -> Result<Vec<ProviderId>, StoreError> {
        let rows = sqlx::query(
            "SELECT DISTINCT provider_id FROM worksheet_values WHERE fiscal_year = $1 ORDER BY provider_id",
        )
        .bind(fiscal_year)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter()
            .map(|row| {
                let raw: String = row.try_get("provider_id").map_err(store_err)?;
                stored_provider_id(&raw).map_err(store_err)
            })
            .collect()
    }
}

#[async_trait]
impl PrecomputedStore for DbRepository {
    async fn lookup_precomputed(
        &self,
        kpi_key: KpiKey,
        provider_id: &ProviderId,
        fiscal_year: i32,
    ) -> Result<Option<Decimal>, StoreError> {
        // Only allow-listed measure names are ever queried.
        let columns = columns_for(kpi_key);
        if columns.is_empty() {
            return Ok(None);
        }
        let names: Vec<String> = columns.iter().map(|c| c.to_string()).collect();

        let rows = sqlx::query(
            r#"
            SELECT column_name, value
            FROM precomputed_kpis
            WHERE provider_id = $1 AND fiscal_year = $2 AND column_name = ANY($3)
            "#,
        )
        .bind(provider_id.as_str())
        .bind(fiscal_year)
        .bind(&names)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let mut found = Vec::with_capacity(rows.len());
        for row in &rows {
            let column: String = row.try_get("column_name").map_err(store_err)?;
            let value: Option<Decimal> = row.try_get("value").map_err(store_err)?;
            found.push((column, value));
        }

        Ok(resolve_precomputed(kpi_key, |wanted| {
            found
                .iter()
                .find(|(column, _)| column == wanted)
                .and_then(|(_, value)| *value)
        }))
    }

    async fn prior_benchmarks(&self, fiscal_year: i32) -> Result<Vec<BenchmarkRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT r.kpi_key, r.peer_level, r.state_code, r.hospital_type, r.fiscal_year,
                   r.provider_count, r.p25, r.median, r.p75, r.mean, r.min_value, r.max_value
            FROM benchmark_records AS r
            JOIN benchmark_current AS c ON c.snapshot_id = r.snapshot_id
            WHERE r.fiscal_year = $1
            ORDER BY r.kpi_key, r.peer_level, r.state_code, r.hospital_type
            "#,
        )
        .bind(fiscal_year)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter()
            .map(Self::decode_benchmark)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl BenchmarkArchive for DbRepository {
    async fn archive(&self, snapshot: &BenchmarkSnapshot) -> Result<(), StoreError> {
        self.save_snapshot(snapshot).await.map_err(StoreError::from)?;
        tracing::info!(
            version = snapshot.version,
            snapshot_id = %snapshot.snapshot_id,
            records = snapshot.len(),
            "Benchmark snapshot archived."
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_stored_ids_are_accepted() {
        let id = stored_provider_id("014000").unwrap();
        assert_eq!(id.as_str(), "014000");
        assert_eq!(stored_provider_id("05T123").unwrap().as_str(), "05T123");
    }

    #[test]
    fn non_canonical_stored_ids_are_rejected() {
        // Each of these would normalize, but lookups would bind "014000" and miss them.
        for raw in ["14000", "14000.0", " 014000", "0014000", "05t123"] {
            let err = stored_provider_id(raw).unwrap_err();
            assert!(matches!(err, DbError::DecodeError(_)), "{raw}: {err}");
        }
        assert!(stored_provider_id("01-000").is_err());
    }
}
