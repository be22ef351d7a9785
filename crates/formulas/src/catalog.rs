use core_types::{KpiKey, KpiLevel};
use serde::Serialize;

/// Static attributes of one KPI in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KpiDefinition {
    pub key: KpiKey,
    pub level: KpiLevel,
    /// Exactly one parent for levels 2 and 3, none for level 1.
    pub parent: Option<KpiKey>,
    /// Whether an increase is an improvement. Drives trend and gap direction.
    pub higher_is_better: bool,
    pub label: &'static str,
}

const fn def(
    key: KpiKey,
    level: KpiLevel,
    parent: Option<KpiKey>,
    higher_is_better: bool,
    label: &'static str,
) -> KpiDefinition {
    KpiDefinition {
        key,
        level,
        parent,
        higher_is_better,
        label,
    }
}

/// The KPI hierarchy.
pub const CATALOG: [KpiDefinition; 17] = [
    // --- Level 1: top-level metrics ---
    def(KpiKey::OperatingMargin, KpiLevel::One, None, true, "Operating Margin"),
    def(KpiKey::TotalMargin, KpiLevel::One, None, true, "Total Margin"),
    def(KpiKey::DaysCashOnHand, KpiLevel::One, None, true, "Days Cash on Hand"),
    def(KpiKey::CurrentRatio, KpiLevel::One, None, true, "Current Ratio"),
    // --- Level 2: drivers ---
    def(
        KpiKey::RevenuePerDischarge,
        KpiLevel::Two,
        Some(KpiKey::OperatingMargin),
        true,
        "Net Revenue per Discharge",
    ),
    def(
        KpiKey::CostPerDischarge,
        KpiLevel::Two,
        Some(KpiKey::OperatingMargin),
        false,
        "Operating Cost per Discharge",
    ),
    def(
        KpiKey::ContractualAllowancePct,
        KpiLevel::Two,
        Some(KpiKey::OperatingMargin),
        false,
        "Contractual Allowances % of Gross Revenue",
    ),
    def(
        KpiKey::OtherIncomeShare,
        KpiLevel::Two,
        Some(KpiKey::TotalMargin),
        true,
        "Other Income % of Total Revenue",
    ),
    def(
        KpiKey::UncompensatedCarePct,
        KpiLevel::Two,
        Some(KpiKey::TotalMargin),
        false,
        "Uncompensated Care % of Operating Expense",
    ),
    def(
        KpiKey::CashToCurrentLiabilities,
        KpiLevel::Two,
        Some(KpiKey::DaysCashOnHand),
        true,
        "Cash to Current Liabilities",
    ),
    def(
        KpiKey::CurrentLiabilityShare,
        KpiLevel::Two,
        Some(KpiKey::CurrentRatio),
        false,
        "Current Liabilities % of Total Liabilities",
    ),
    // --- Level 3: sub-drivers ---
    def(
        KpiKey::SalaryCostPerDischarge,
        KpiLevel::Three,
        Some(KpiKey::CostPerDischarge),
        false,
        "Salary Cost per Discharge",
    ),
    def(
        KpiKey::AverageLengthOfStay,
        KpiLevel::Three,
        Some(KpiKey::CostPerDischarge),
        false,
        "Average Length of Stay",
    ),
    def(
        KpiKey::OccupancyRate,
        KpiLevel::Three,
        Some(KpiKey::CostPerDischarge),
        true,
        "Occupancy Rate",
    ),
    def(
        KpiKey::OutpatientRevenueShare,
        KpiLevel::Three,
        Some(KpiKey::RevenuePerDischarge),
        true,
        "Outpatient % of Gross Revenue",
    ),
    def(
        KpiKey::CharityCarePct,
        KpiLevel::Three,
        Some(KpiKey::UncompensatedCarePct),
        false,
        "Charity Care % of Operating Expense",
    ),
    def(
        KpiKey::BadDebtPct,
        KpiLevel::Three,
        Some(KpiKey::UncompensatedCarePct),
        false,
        "Bad Debt % of Operating Expense",
    ),
];

/// Looks up the catalog entry of a KPI.
pub fn definition(key: KpiKey) -> Option<&'static KpiDefinition> {
    CATALOG.iter().find(|d| d.key == key)
}
