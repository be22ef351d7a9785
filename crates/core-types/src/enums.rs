use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every KPI the workspace knows how to compute.
///
/// The string form (`as_str`) is the stable identifier used in configuration,
/// JSON output and for the lexical tie-break in ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiKey {
    // Level 1
    OperatingMargin,
    TotalMargin,
    DaysCashOnHand,
    CurrentRatio,
    // Level 2
    RevenuePerDischarge,
    CostPerDischarge,
    ContractualAllowancePct,
    OtherIncomeShare,
    UncompensatedCarePct,
    CashToCurrentLiabilities,
    CurrentLiabilityShare,
    // Level 3
    SalaryCostPerDischarge,
    AverageLengthOfStay,
    OccupancyRate,
    OutpatientRevenueShare,
    CharityCarePct,
    BadDebtPct,
}

impl KpiKey {
    pub const ALL: [KpiKey; 17] = [
        KpiKey::OperatingMargin,
        KpiKey::TotalMargin,
        KpiKey::DaysCashOnHand,
        KpiKey::CurrentRatio,
        KpiKey::RevenuePerDischarge,
        KpiKey::CostPerDischarge,
        KpiKey::ContractualAllowancePct,
        KpiKey::OtherIncomeShare,
        KpiKey::UncompensatedCarePct,
        KpiKey::CashToCurrentLiabilities,
        KpiKey::CurrentLiabilityShare,
        KpiKey::SalaryCostPerDischarge,
        KpiKey::AverageLengthOfStay,
        KpiKey::OccupancyRate,
        KpiKey::OutpatientRevenueShare,
        KpiKey::CharityCarePct,
        KpiKey::BadDebtPct,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KpiKey::OperatingMargin => "operating_margin",
            KpiKey::TotalMargin => "total_margin",
            KpiKey::DaysCashOnHand => "days_cash_on_hand",
            KpiKey::CurrentRatio => "current_ratio",
            KpiKey::RevenuePerDischarge => "revenue_per_discharge",
            KpiKey::CostPerDischarge => "cost_per_discharge",
            KpiKey::ContractualAllowancePct => "contractual_allowance_pct",
            KpiKey::OtherIncomeShare => "other_income_share",
            KpiKey::UncompensatedCarePct => "uncompensated_care_pct",
            KpiKey::CashToCurrentLiabilities => "cash_to_current_liabilities",
            KpiKey::CurrentLiabilityShare => "current_liability_share",
            KpiKey::SalaryCostPerDischarge => "salary_cost_per_discharge",
            KpiKey::AverageLengthOfStay => "average_length_of_stay",
            KpiKey::OccupancyRate => "occupancy_rate",
            KpiKey::OutpatientRevenueShare => "outpatient_revenue_share",
            KpiKey::CharityCarePct => "charity_care_pct",
            KpiKey::BadDebtPct => "bad_debt_pct",
        }
    }
}

impl fmt::Display for KpiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KpiKey {
    type Err = CoreError;

    /// Exact match on the snake_case identifier. Anything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KpiKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| CoreError::UnknownKpi(s.to_string()))
    }
}

/// Tier of a KPI in the metric hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KpiLevel {
    /// Top-level metric.
    One = 1,
    /// Driver of a level-1 metric.
    Two = 2,
    /// Sub-driver of a level-2 driver.
    Three = 3,
}

impl KpiLevel {
    pub fn number(&self) -> u8 {
        *self as u8
    }

    /// The level directly above this one, if any.
    pub fn parent_level(&self) -> Option<KpiLevel> {
        match self {
            KpiLevel::One => None,
            KpiLevel::Two => Some(KpiLevel::One),
            KpiLevel::Three => Some(KpiLevel::Two),
        }
    }
}

impl TryFrom<u8> for KpiLevel {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(KpiLevel::One),
            2 => Ok(KpiLevel::Two),
            3 => Ok(KpiLevel::Three),
            other => Err(CoreError::InvalidInput(
                "kpi level".to_string(),
                format!("{other} is not one of 1, 2, 3"),
            )),
        }
    }
}

impl fmt::Display for KpiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Direction of a KPI between its two most recent reported years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// Improving, whichever direction "better" is for the KPI.
    Up,
    Down,
    Flat,
    /// Fewer than two non-null data points.
    Unknown,
}

/// The four peer-group partitions used for benchmarking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PeerGroupLevel {
    National,
    State,
    HospitalType,
    StateType,
}

impl PeerGroupLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerGroupLevel::National => "national",
            PeerGroupLevel::State => "state",
            PeerGroupLevel::HospitalType => "hospital_type",
            PeerGroupLevel::StateType => "state_type",
        }
    }
}

impl fmt::Display for PeerGroupLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeerGroupLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "national" => Ok(PeerGroupLevel::National),
            "state" => Ok(PeerGroupLevel::State),
            "hospital_type" | "type" => Ok(PeerGroupLevel::HospitalType),
            "state_type" => Ok(PeerGroupLevel::StateType),
            other => Err(CoreError::InvalidInput(
                "peer group level".to_string(),
                other.to_string(),
            )),
        }
    }
}

/// Facility category derived from the type-code range of a provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HospitalType {
    ShortTerm,
    CriticalAccess,
    LongTerm,
    Rehabilitation,
    Psychiatric,
    Childrens,
    Specialty,
    Unknown,
}

impl HospitalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HospitalType::ShortTerm => "short_term",
            HospitalType::CriticalAccess => "critical_access",
            HospitalType::LongTerm => "long_term",
            HospitalType::Rehabilitation => "rehabilitation",
            HospitalType::Psychiatric => "psychiatric",
            HospitalType::Childrens => "childrens",
            HospitalType::Specialty => "specialty",
            HospitalType::Unknown => "unknown",
        }
    }
}

impl FromStr for HospitalType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [HospitalType; 8] = [
            HospitalType::ShortTerm,
            HospitalType::CriticalAccess,
            HospitalType::LongTerm,
            HospitalType::Rehabilitation,
            HospitalType::Psychiatric,
            HospitalType::Childrens,
            HospitalType::Specialty,
            HospitalType::Unknown,
        ];
        ALL.into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::InvalidInput("hospital type".to_string(), s.to_string()))
    }
}

impl fmt::Display for HospitalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which backend produced a KPI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueSource {
    Precomputed,
    Worksheet,
}
