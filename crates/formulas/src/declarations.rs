//! Formula declarations: which worksheet cells each KPI reads and how it
//! combines them.
//!
//! Level-3 formulas reading S-10 (`charity_care_pct`, `bad_debt_pct`) are
//! provisional. Their line assumptions produced implausible values for some
//! providers and have not been validated against a reference dataset.

use crate::worksheets::{
    A_COST_CENTERS, G_BALANCE_SHEET, G2_PATIENT_REVENUES, G3_REVENUES_EXPENSES,
    S3_STATISTICS, S10_UNCOMPENSATED_CARE,
};
use core_types::{Coordinate, KpiKey};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// A pure function from the extracted scalars, in declaration order, to a result.
/// `None` means the ratio is undefined (zero denominator).
pub type ComputeFn = fn(&[Decimal]) -> Option<Decimal>;

/// Where one formula input comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Cell(Coordinate),
    /// Sum over several lines. Absent lines count as zero, but the input is
    /// missing if every line is absent.
    Sum(Vec<Coordinate>),
}

impl InputSource {
    pub fn coordinates(&self) -> &[Coordinate] {
        match self {
            InputSource::Cell(coordinate) => std::slice::from_ref(coordinate),
            InputSource::Sum(coordinates) => coordinates,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub name: &'static str,
    pub source: InputSource,
}

#[derive(Debug, Clone)]
pub struct FormulaDecl {
    pub inputs: Vec<Input>,
    /// Number of scalars `compute` expects.
    pub arity: usize,
    pub compute: ComputeFn,
}

impl FormulaDecl {
    pub fn coordinates(&self) -> impl Iterator<Item = &Coordinate> {
        self.inputs.iter().flat_map(|input| input.source.coordinates())
    }
}

// --- Worksheet cells ---

type Cell = (&'static str, &'static str, &'static str);

const TOTAL_PATIENT_REVENUE: Cell = (G3_REVENUES_EXPENSES, "00100", "00100");
const CONTRACTUAL_ALLOWANCES: Cell = (G3_REVENUES_EXPENSES, "00200", "00100");
const NET_PATIENT_REVENUE: Cell = (G3_REVENUES_EXPENSES, "00300", "00100");
const TOTAL_OPERATING_EXPENSES: Cell = (G3_REVENUES_EXPENSES, "00400", "00100");
const OTHER_INCOME: Cell = (G3_REVENUES_EXPENSES, "02500", "00100");
const NET_INCOME: Cell = (G3_REVENUES_EXPENSES, "02900", "00100");

const CASH: Cell = (G_BALANCE_SHEET, "00100", "00100");
const TOTAL_CURRENT_ASSETS: Cell = (G_BALANCE_SHEET, "01100", "00100");
const TOTAL_CURRENT_LIABILITIES: Cell = (G_BALANCE_SHEET, "04500", "00100");
const TOTAL_LIABILITIES: Cell = (G_BALANCE_SHEET, "05100", "00100");

const OUTPATIENT_REVENUE: Cell = (G2_PATIENT_REVENUES, "02800", "00200");
const GROSS_PATIENT_REVENUE: Cell = (G2_PATIENT_REVENUES, "02800", "00300");

const TOTAL_SALARIES: Cell = (A_COST_CENTERS, "20000", "00100");
const CAPITAL_BUILDINGS: Cell = (A_COST_CENTERS, "00100", "00700");
const CAPITAL_EQUIPMENT: Cell = (A_COST_CENTERS, "00200", "00700");

const TOTAL_DISCHARGES: Cell = (S3_STATISTICS, "01400", "01500");
const INPATIENT_DAYS: Cell = (S3_STATISTICS, "01400", "00800");
const BED_DAYS_AVAILABLE: Cell = (S3_STATISTICS, "01400", "00300");

const CHARITY_CARE_COST: Cell = (S10_UNCOMPENSATED_CARE, "02300", "00300");
const BAD_DEBT_COST: Cell = (S10_UNCOMPENSATED_CARE, "02900", "00100");
const UNCOMPENSATED_CARE_COST: Cell = (S10_UNCOMPENSATED_CARE, "03100", "00100");

fn cell(name: &'static str, (worksheet, line, column): Cell) -> Input {
    Input {
        name,
        source: InputSource::Cell(Coordinate::new(worksheet, line, column)),
    }
}

fn sum(name: &'static str, cells: &[Cell]) -> Input {
    Input {
        name,
        source: InputSource::Sum(
            cells
                .iter()
                .map(|(worksheet, line, column)| Coordinate::new(worksheet, line, column))
                .collect(),
        ),
    }
}

/// `numerator / denominator`, or `None` when the denominator is zero.
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    numerator.checked_div(denominator)
}

fn args<const N: usize>(values: &[Decimal]) -> Option<[Decimal; N]> {
    values.try_into().ok()
}

fn simple_ratio(values: &[Decimal]) -> Option<Decimal> {
    let [numerator, denominator] = args::<2>(values)?;
    ratio(numerator, denominator)
}

fn decl(inputs: Vec<Input>, compute: ComputeFn) -> FormulaDecl {
    FormulaDecl {
        arity: inputs.len(),
        inputs,
        compute,
    }
}

/// The formula of every catalogued KPI.
pub fn declaration(key: KpiKey) -> FormulaDecl {
    match key {
        KpiKey::OperatingMargin => decl(
            vec![
                cell("net_patient_revenue", NET_PATIENT_REVENUE),
                cell("total_operating_expenses", TOTAL_OPERATING_EXPENSES),
            ],
            |v| {
                let [revenue, expenses] = args::<2>(v)?;
                ratio(revenue - expenses, revenue)
            },
        ),
        KpiKey::TotalMargin => decl(
            vec![
                cell("net_income", NET_INCOME),
                cell("net_patient_revenue", NET_PATIENT_REVENUE),
                cell("other_income", OTHER_INCOME),
            ],
            |v| {
                let [net_income, revenue, other] = args::<3>(v)?;
                ratio(net_income, revenue + other)
            },
        ),
        KpiKey::DaysCashOnHand => decl(
            vec![
                cell("cash", CASH),
                cell("total_operating_expenses", TOTAL_OPERATING_EXPENSES),
                sum("depreciation", &[CAPITAL_BUILDINGS, CAPITAL_EQUIPMENT]),
            ],
            |v| {
                let [cash, expenses, depreciation] = args::<3>(v)?;
                let daily_cash_expense = ratio(expenses - depreciation, dec!(365))?;
                ratio(cash, daily_cash_expense)
            },
        ),
        KpiKey::CurrentRatio => decl(
            vec![
                cell("total_current_assets", TOTAL_CURRENT_ASSETS),
                cell("total_current_liabilities", TOTAL_CURRENT_LIABILITIES),
            ],
            simple_ratio,
        ),
        KpiKey::RevenuePerDischarge => decl(
            vec![
                cell("net_patient_revenue", NET_PATIENT_REVENUE),
                cell("total_discharges", TOTAL_DISCHARGES),
            ],
            simple_ratio,
        ),
        KpiKey::CostPerDischarge => decl(
            vec![
                cell("total_operating_expenses", TOTAL_OPERATING_EXPENSES),
                cell("total_discharges", TOTAL_DISCHARGES),
            ],
            simple_ratio,
        ),
        KpiKey::ContractualAllowancePct => decl(
            vec![
                cell("contractual_allowances", CONTRACTUAL_ALLOWANCES),
                cell("total_patient_revenue", TOTAL_PATIENT_REVENUE),
            ],
            simple_ratio,
        ),
        KpiKey::OtherIncomeShare => decl(
            vec![
                cell("other_income", OTHER_INCOME),
                cell("net_patient_revenue", NET_PATIENT_REVENUE),
            ],
            |v| {
                let [other, revenue] = args::<2>(v)?;
                ratio(other, revenue + other)
            },
        ),
        KpiKey::UncompensatedCarePct => decl(
            vec![
                cell("uncompensated_care_cost", UNCOMPENSATED_CARE_COST),
                cell("total_operating_expenses", TOTAL_OPERATING_EXPENSES),
            ],
            simple_ratio,
        ),
        KpiKey::CashToCurrentLiabilities => decl(
            vec![
                cell("cash", CASH),
                cell("total_current_liabilities", TOTAL_CURRENT_LIABILITIES),
            ],
            simple_ratio,
        ),
        KpiKey::CurrentLiabilityShare => decl(
            vec![
                cell("total_current_liabilities", TOTAL_CURRENT_LIABILITIES),
                cell("total_liabilities", TOTAL_LIABILITIES),
            ],
            simple_ratio,
        ),
        KpiKey::SalaryCostPerDischarge => decl(
            vec![
                cell("total_salaries", TOTAL_SALARIES),
                cell("total_discharges", TOTAL_DISCHARGES),
            ],
            simple_ratio,
        ),
        KpiKey::AverageLengthOfStay => decl(
            vec![
                cell("inpatient_days", INPATIENT_DAYS),
                cell("total_discharges", TOTAL_DISCHARGES),
            ],
            simple_ratio,
        ),
        KpiKey::OccupancyRate => decl(
            vec![
                cell("inpatient_days", INPATIENT_DAYS),
                cell("bed_days_available", BED_DAYS_AVAILABLE),
            ],
            simple_ratio,
        ),
        KpiKey::OutpatientRevenueShare => decl(
            vec![
                cell("outpatient_revenue", OUTPATIENT_REVENUE),
                cell("gross_patient_revenue", GROSS_PATIENT_REVENUE),
            ],
            simple_ratio,
        ),
        KpiKey::CharityCarePct => decl(
            vec![
                cell("charity_care_cost", CHARITY_CARE_COST),
                cell("total_operating_expenses", TOTAL_OPERATING_EXPENSES),
            ],
            simple_ratio,
        ),
        KpiKey::BadDebtPct => decl(
            vec![
                cell("bad_debt_cost", BAD_DEBT_COST),
                cell("total_operating_expenses", TOTAL_OPERATING_EXPENSES),
            ],
            simple_ratio,
        ),
    }
}
