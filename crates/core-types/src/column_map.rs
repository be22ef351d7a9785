//! Mapping from precomputed-store measure names to KPI keys.
//!
//! The precomputed store was filled by several generations of the aggregation
//! job, each naming its measures slightly differently. Every accepted name is
//! listed here explicitly. Names that are not listed are dropped, never guessed.

use crate::enums::KpiKey;
use rust_decimal::Decimal;

/// Every measure name the precomputed store is known to use.
///
/// Within one KPI, earlier names take precedence when a provider has
/// several of them.
pub const PRECOMPUTED_COLUMNS: &[(&str, KpiKey)] = &[
    ("OPERATING_MARGIN", KpiKey::OperatingMargin),
    ("OPERATING_MARGIN_PCT", KpiKey::OperatingMargin),
    ("OPER_MARGIN", KpiKey::OperatingMargin),
    ("TOTAL_MARGIN", KpiKey::TotalMargin),
    ("TOTAL_MARGIN_PCT", KpiKey::TotalMargin),
    ("NET_MARGIN", KpiKey::TotalMargin),
    ("DAYS_CASH_ON_HAND", KpiKey::DaysCashOnHand),
    ("DAYS_CASH", KpiKey::DaysCashOnHand),
    ("CURRENT_RATIO", KpiKey::CurrentRatio),
];

/// Resolves a measure name to its KPI. Matching is exact and case-sensitive.
pub fn kpi_for_column(name: &str) -> Option<KpiKey> {
    let resolved = PRECOMPUTED_COLUMNS
        .iter()
        .find(|(column, _)| *column == name)
        .map(|(_, key)| *key);
    if resolved.is_none() {
        tracing::warn!(column = name, "Unmapped precomputed measure excluded.");
    }
    resolved
}

/// All measure names that resolve to `key`.
pub fn columns_for(key: KpiKey) -> Vec<&'static str> {
    PRECOMPUTED_COLUMNS
        .iter()
        .filter(|(_, k)| *k == key)
        .map(|(column, _)| *column)
        .collect()
}

/// Picks the value of `key` from the measures a provider has.
///
/// `value_of` returns the stored value of one measure name, if any. Names are
/// tried in precedence order and the first non-null value wins, so every
/// store resolves aliases the same way.
pub fn resolve_precomputed(
    key: KpiKey,
    mut value_of: impl FnMut(&str) -> Option<Decimal>,
) -> Option<Decimal> {
    columns_for(key).into_iter().find_map(|column| value_of(column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    #[test]
    fn every_listed_column_resolves_to_its_key() {
        for (column, key) in PRECOMPUTED_COLUMNS {
            assert_eq!(kpi_for_column(column), Some(*key), "column {column}");
        }
    }

    #[test]
    fn column_names_are_unique() {
        let names: HashSet<_> = PRECOMPUTED_COLUMNS.iter().map(|(c, _)| *c).collect();
        assert_eq!(names.len(), PRECOMPUTED_COLUMNS.len());
    }

    #[test]
    fn near_misses_fail_closed() {
        for name in [
            "operating_margin",
            "Operating_Margin",
            "OPERATING MARGIN",
            "OPERATING_MARGIN ",
            "OPERATING_MARGIN_2",
            "MARGIN",
            "",
        ] {
            assert_eq!(kpi_for_column(name), None, "name {name:?}");
        }
    }

    #[test]
    fn columns_for_lists_aliases() {
        assert_eq!(
            columns_for(KpiKey::DaysCashOnHand),
            vec!["DAYS_CASH_ON_HAND", "DAYS_CASH"]
        );
        assert!(columns_for(KpiKey::CharityCarePct).is_empty());
    }

    #[test]
    fn earlier_aliases_take_precedence() {
        let stored = [("OPER_MARGIN", dec!(0.03)), ("OPERATING_MARGIN", dec!(0.05))];
        let value_of = |name: &str| stored.iter().find(|(c, _)| *c == name).map(|(_, v)| *v);
        assert_eq!(resolve_precomputed(KpiKey::OperatingMargin, value_of), Some(dec!(0.05)));

        let only_legacy = |name: &str| (name == "OPER_MARGIN").then_some(dec!(0.03));
        assert_eq!(resolve_precomputed(KpiKey::OperatingMargin, only_legacy), Some(dec!(0.03)));
        assert_eq!(resolve_precomputed(KpiKey::CurrentRatio, only_legacy), None);
    }
}
