use crate::enums::{HospitalType, KpiKey, KpiLevel, PeerGroupLevel, Trend, ValueSource};
use crate::provider::ProviderId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Width of a worksheet code such as `G300000`.
pub const WORKSHEET_CODE_WIDTH: usize = 7;
/// Width of a line or column code such as `00300`.
pub const LINE_COLUMN_CODE_WIDTH: usize = 5;

/// The address of a single cell in a cost-report worksheet.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub worksheet_code: String,
    pub line_code: String,
    pub column_code: String,
}

impl Coordinate {
    pub fn new(worksheet_code: &str, line_code: &str, column_code: &str) -> Self {
        Self {
            worksheet_code: worksheet_code.to_string(),
            line_code: line_code.to_string(),
            column_code: column_code.to_string(),
        }
    }

    /// Checks the fixed-width, alphanumeric shape of all three codes.
    pub fn is_well_formed(&self) -> bool {
        fn shaped(code: &str, width: usize) -> bool {
            code.len() == width && code.chars().all(|c| c.is_ascii_alphanumeric())
        }
        shaped(&self.worksheet_code, WORKSHEET_CODE_WIDTH)
            && shaped(&self.line_code, LINE_COLUMN_CODE_WIDTH)
            && shaped(&self.column_code, LINE_COLUMN_CODE_WIDTH)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/L{}/C{}",
            self.worksheet_code, self.line_code, self.column_code
        )
    }
}

/// One raw value from a cost-report worksheet, as loaded by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorksheetRecord {
    pub provider_id: ProviderId,
    pub fiscal_year: i32,
    pub worksheet_code: String,
    pub line_code: String,
    pub column_code: String,
    pub value: Decimal,
    pub line_label: String,
    pub column_label: String,
}

impl WorksheetRecord {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(&self.worksheet_code, &self.line_code, &self.column_code)
    }
}

/// Why a KPI value is (or is not) present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum KpiStatus {
    Computed,
    /// A required worksheet coordinate had no value for this provider and year.
    MissingInput { coordinate: Coordinate },
    /// The precomputed store had no value and no worksheet fallback was possible.
    MissingPrecomputed,
    /// The denominator was zero.
    UndefinedRatio,
    /// The tier cannot be served because the worksheet backend is unavailable.
    Unsupported,
}

/// A computed KPI for one provider and fiscal year. Never persisted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiValue {
    pub kpi_key: KpiKey,
    pub level: KpiLevel,
    pub provider_id: ProviderId,
    pub fiscal_year: i32,
    pub value: Option<Decimal>,
    pub parent_kpi_key: Option<KpiKey>,
    #[serde(flatten)]
    pub status: KpiStatus,
    pub source: Option<ValueSource>,
}

/// One comparison population for benchmarking.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerGroupKey {
    pub level: PeerGroupLevel,
    pub state_code: Option<String>,
    pub hospital_type: Option<HospitalType>,
}

impl PeerGroupKey {
    pub fn national() -> Self {
        Self {
            level: PeerGroupLevel::National,
            state_code: None,
            hospital_type: None,
        }
    }

    pub fn state(state_code: &str) -> Self {
        Self {
            level: PeerGroupLevel::State,
            state_code: Some(state_code.to_string()),
            hospital_type: None,
        }
    }

    pub fn hospital_type(hospital_type: HospitalType) -> Self {
        Self {
            level: PeerGroupLevel::HospitalType,
            state_code: None,
            hospital_type: Some(hospital_type),
        }
    }

    pub fn state_type(state_code: &str, hospital_type: HospitalType) -> Self {
        Self {
            level: PeerGroupLevel::StateType,
            state_code: Some(state_code.to_string()),
            hospital_type: Some(hospital_type),
        }
    }
}

impl fmt::Display for PeerGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.state_code, &self.hospital_type) {
            (None, None) => write!(f, "{}", self.level),
            (Some(state), None) => write!(f, "{}({state})", self.level),
            (None, Some(kind)) => write!(f, "{}({kind})", self.level),
            (Some(state), Some(kind)) => write!(f, "{}({state}, {kind})", self.level),
        }
    }
}

/// Percentile summary of a KPI within one peer group for one fiscal year.
///
/// A record only exists when at least three providers reported a non-null value;
/// absence means "not enough peers", not zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub kpi_key: KpiKey,
    pub peer_group_key: PeerGroupKey,
    pub fiscal_year: i32,
    pub provider_count: usize,
    pub p25: Decimal,
    pub median: Decimal,
    pub p75: Decimal,
    pub mean: Decimal,
    pub min: Decimal,
    pub max: Decimal,
}

/// Lookup key of a benchmark record inside a snapshot.
pub type BenchmarkKey = (KpiKey, PeerGroupKey, i32);

/// An immutable, versioned set of benchmark records.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSnapshot {
    pub version: u64,
    pub snapshot_id: Uuid,
    pub built_at: DateTime<Utc>,
    pub records: BTreeMap<BenchmarkKey, BenchmarkRecord>,
}

impl BenchmarkSnapshot {
    /// The version-zero snapshot every store starts from.
    pub fn empty() -> Self {
        Self {
            version: 0,
            snapshot_id: Uuid::nil(),
            built_at: DateTime::<Utc>::default(),
            records: BTreeMap::new(),
        }
    }

    pub fn get(
        &self,
        kpi_key: KpiKey,
        peer_group_key: &PeerGroupKey,
        fiscal_year: i32,
    ) -> Option<&BenchmarkRecord> {
        self.records
            .get(&(kpi_key, peer_group_key.clone(), fiscal_year))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Display-ordering signals for one KPI card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingResult {
    pub kpi_key: KpiKey,
    pub dynamic_priority: Decimal,
    pub trend: Trend,
    pub percentile_rank: Option<Decimal>,
    pub performance_gap: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn coordinate_shape_is_checked() {
        assert!(Coordinate::new("G300000", "00300", "00100").is_well_formed());
        assert!(!Coordinate::new("G3", "00300", "00100").is_well_formed());
        assert!(!Coordinate::new("G300000", "3", "00100").is_well_formed());
        assert!(!Coordinate::new("G300000", "00300", "001 0").is_well_formed());
    }

    #[test]
    fn snapshot_lookup_by_key() {
        let record = BenchmarkRecord {
            kpi_key: KpiKey::OperatingMargin,
            peer_group_key: PeerGroupKey::state("01"),
            fiscal_year: 2022,
            provider_count: 3,
            p25: dec!(0.01),
            median: dec!(0.02),
            p75: dec!(0.03),
            mean: dec!(0.02),
            min: dec!(0.00),
            max: dec!(0.04),
        };
        let mut snapshot = BenchmarkSnapshot::empty();
        let key: crate::BenchmarkKey = (
            record.kpi_key,
            record.peer_group_key.clone(),
            record.fiscal_year,
        );
        snapshot.records.insert(key, record.clone());

        assert_eq!(
            snapshot.get(KpiKey::OperatingMargin, &PeerGroupKey::state("01"), 2022),
            Some(&record)
        );
        assert!(snapshot
            .get(KpiKey::OperatingMargin, &PeerGroupKey::national(), 2022)
            .is_none());
    }
}
