use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Summary statistics of one participant set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub count: usize,
    pub p25: Decimal,
    pub median: Decimal,
    pub p75: Decimal,
    pub mean: Decimal,
    pub min: Decimal,
    pub max: Decimal,
}

/// Continuous percentile of a **sorted** slice using linear interpolation
/// between order statistics: rank = p / 100 * (n - 1).
///
/// Returns `None` for an empty slice.
pub fn percentile(sorted: &[Decimal], p: Decimal) -> Option<Decimal> {
    let last = sorted.len().checked_sub(1)?;
    if last == 0 {
        return Some(sorted[0]);
    }

    let rank = p / Decimal::ONE_HUNDRED * Decimal::from(last);
    let lower = rank.floor().to_usize()?.min(last);
    let upper = (lower + 1).min(last);
    let fraction = rank - Decimal::from(lower);

    let (low, high) = (sorted[lower], sorted[upper]);
    high.checked_sub(low)
        .and_then(|spread| low.checked_add(fraction * spread))
        .or_else(|| Some(low * (Decimal::ONE - fraction) + high * fraction))
}

/// Arithmetic mean that stays within range when the plain sum would overflow.
fn mean(values: &[Decimal]) -> Decimal {
    let count = Decimal::from(values.len());
    match values
        .iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(*value))
    {
        Some(total) => total / count,
        None => values.iter().map(|value| *value / count).sum(),
    }
}

/// Summarizes a set of values. Order of `values` does not matter.
pub fn summarize(values: &[Decimal]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort();

    let count = sorted.len();

    Some(Summary {
        count,
        p25: percentile(&sorted, Decimal::from(25))?,
        median: percentile(&sorted, Decimal::from(50))?,
        p75: percentile(&sorted, Decimal::from(75))?,
        mean: mean(&sorted),
        min: sorted[0],
        max: sorted[count - 1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn five_evenly_spaced_values() {
        let summary = summarize(&[dec!(50), dec!(10), dec!(40), dec!(20), dec!(30)]).unwrap();
        assert_eq!(summary.p25, dec!(20));
        assert_eq!(summary.median, dec!(30));
        assert_eq!(summary.p75, dec!(40));
        assert_eq!(summary.mean, dec!(30));
        assert_eq!(summary.min, dec!(10));
        assert_eq!(summary.max, dec!(50));
        assert_eq!(summary.count, 5);
    }

    #[test]
    fn extreme_values_stay_in_range() {
        let summary = summarize(&[Decimal::MAX, Decimal::MAX, Decimal::MAX]).unwrap();
        assert_eq!(summary.min, Decimal::MAX);
        assert!(summary.mean > Decimal::MAX - dec!(1), "{}", summary.mean);

        let spread = [Decimal::MIN, Decimal::MAX];
        let median = percentile(&spread, dec!(50)).unwrap();
        assert!(median.abs() < dec!(1), "{median}");
    }

    #[test]
    fn interpolates_between_order_statistics() {
        let sorted = [dec!(1), dec!(2), dec!(3), dec!(4)];
        // rank = 0.25 * 3 = 0.75
        assert_eq!(percentile(&sorted, dec!(25)), Some(dec!(1.75)));
        assert_eq!(percentile(&sorted, dec!(50)), Some(dec!(2.5)));
        assert_eq!(percentile(&sorted, dec!(75)), Some(dec!(3.25)));
        assert_eq!(percentile(&sorted, dec!(100)), Some(dec!(4)));
        assert_eq!(percentile(&sorted, dec!(0)), Some(dec!(1)));
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(percentile(&[], dec!(50)), None);
        assert_eq!(percentile(&[dec!(7)], dec!(25)), Some(dec!(7)));
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn negative_values_are_summarized_as_is() {
        let summary = summarize(&[dec!(-0.2), dec!(0.1), dec!(0.4)]).unwrap();
        assert_eq!(summary.median, dec!(0.1));
        assert_eq!(summary.min, dec!(-0.2));
    }
}
