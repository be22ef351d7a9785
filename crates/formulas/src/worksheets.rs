//! Worksheet codes and the fiscal years in which each worksheet is reported.
//!
//! Reporting requirements changed over time, so a worksheet that exists today
//! may not have been filed in earlier years. Coordinates on a worksheet that was
//! not reported in the requested year are treated as absent without querying.

/// G-3: Statement of revenues and expenses.
pub const G3_REVENUES_EXPENSES: &str = "G300000";
/// G: Balance sheet.
pub const G_BALANCE_SHEET: &str = "G000000";
/// G-2: Patient revenues (inpatient/outpatient split).
pub const G2_PATIENT_REVENUES: &str = "G200000";
/// A: Reclassification and adjustment of trial balance of expenses.
pub const A_COST_CENTERS: &str = "A000000";
/// S-3 Part I: Hospital and complex statistics.
pub const S3_STATISTICS: &str = "S300001";
/// S-10: Uncompensated and indigent care.
pub const S10_UNCOMPENSATED_CARE: &str = "S100000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorksheetInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub first_year: i32,
    pub last_year: Option<i32>,
}

pub const WORKSHEETS: &[WorksheetInfo] = &[
    WorksheetInfo {
        code: G3_REVENUES_EXPENSES,
        name: "Statement of Revenues and Expenses",
        first_year: 2010,
        last_year: None,
    },
    WorksheetInfo {
        code: G_BALANCE_SHEET,
        name: "Balance Sheet",
        first_year: 2010,
        last_year: None,
    },
    WorksheetInfo {
        code: G2_PATIENT_REVENUES,
        name: "Patient Revenues",
        first_year: 2010,
        last_year: None,
    },
    WorksheetInfo {
        code: A_COST_CENTERS,
        name: "Trial Balance of Expenses",
        first_year: 2010,
        last_year: None,
    },
    WorksheetInfo {
        code: S3_STATISTICS,
        name: "Hospital Statistics",
        first_year: 2010,
        last_year: None,
    },
    WorksheetInfo {
        code: S10_UNCOMPENSATED_CARE,
        name: "Uncompensated and Indigent Care",
        first_year: 2011,
        last_year: None,
    },
];

pub fn worksheet(code: &str) -> Option<&'static WorksheetInfo> {
    WORKSHEETS.iter().find(|w| w.code == code)
}

/// Whether the worksheet was part of the cost report in `fiscal_year`.
/// Unknown worksheet codes are never reported.
pub fn is_reported(code: &str, fiscal_year: i32) -> bool {
    worksheet(code).is_some_and(|w| {
        fiscal_year >= w.first_year && w.last_year.is_none_or(|last| fiscal_year <= last)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncompensated_care_worksheet_starts_later() {
        assert!(is_reported(G3_REVENUES_EXPENSES, 2010));
        assert!(!is_reported(S10_UNCOMPENSATED_CARE, 2010));
        assert!(is_reported(S10_UNCOMPENSATED_CARE, 2011));
        assert!(!is_reported(G3_REVENUES_EXPENSES, 2009));
    }

    #[test]
    fn unknown_worksheet_is_never_reported() {
        assert!(!is_reported("Z999999", 2020));
    }
}
