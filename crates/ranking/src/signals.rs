//! The individual ranking signals. Each one is a pure function of its inputs.

use configuration::KpiWeights;
use core_types::{BenchmarkRecord, Trend};
use rust_decimal::Decimal;

/// Direction of the last change in a fiscal-year series.
///
/// Null points are skipped, so `[2020: 5, 2021: null, 2022: 6]` compares 6
/// against 5. A change within `tolerance` of the previous value (relative, or
/// absolute when the previous value is zero) is flat. For lower-is-better
/// KPIs a rising value is reported as `Down`.
pub fn trend(history: &[(i32, Option<Decimal>)], higher_is_better: bool, tolerance: Decimal) -> Trend {
    let mut points: Vec<(i32, Decimal)> = history
        .iter()
        .filter_map(|(year, value)| value.map(|v| (*year, v)))
        .collect();
    points.sort_by_key(|(year, _)| *year);

    let [.., (_, previous), (_, latest)] = points.as_slice() else {
        return Trend::Unknown;
    };

    let delta = latest.checked_sub(*previous);
    let band = if previous.is_zero() {
        Some(tolerance)
    } else {
        tolerance.checked_mul(previous.abs())
    };
    let flat = match (delta, band) {
        (Some(delta), Some(band)) => delta.abs() <= band,
        // The band exceeds the representable range, so any finite change is inside it.
        (Some(_), None) => true,
        (None, _) => false,
    };
    if flat {
        return Trend::Flat;
    }

    match (latest > previous, higher_is_better) {
        (true, true) | (false, false) => Trend::Up,
        (true, false) | (false, true) => Trend::Down,
    }
}

/// Position 0-100 of `value` within the benchmark distribution.
///
/// Interpolates linearly between the knots (min, 0), (p25, 25), (median, 50),
/// (p75, 75) and (max, 100). Values outside [min, max] are clamped. A value
/// sitting exactly on several coincident knots gets the mean of their ranks.
pub fn percentile_rank(value: Decimal, benchmark: &BenchmarkRecord) -> Decimal {
    let knots = [
        (benchmark.min, Decimal::ZERO),
        (benchmark.p25, Decimal::from(25)),
        (benchmark.median, Decimal::from(50)),
        (benchmark.p75, Decimal::from(75)),
        (benchmark.max, Decimal::ONE_HUNDRED),
    ];

    if value < benchmark.min {
        return Decimal::ZERO;
    }
    if value > benchmark.max {
        return Decimal::ONE_HUNDRED;
    }

    let tied: Vec<Decimal> = knots
        .iter()
        .filter(|(x, _)| *x == value)
        .map(|(_, rank)| *rank)
        .collect();
    if !tied.is_empty() {
        let total: Decimal = tied.iter().copied().sum();
        return total / Decimal::from(tied.len());
    }

    for pair in knots.windows(2) {
        let [(x0, y0), (x1, y1)] = [pair[0], pair[1]];
        if x0 < value && value < x1 {
            return y0 + fraction_between(value, x0, x1) * (y1 - y0);
        }
    }
    // Unreachable for ordered knots; treat a disordered record as the median.
    Decimal::from(50)
}

/// Signed distance from the peer median, relative to its magnitude.
///
/// Positive always means better than the median. `None` when the median is zero.
pub fn performance_gap(value: Decimal, median: Decimal, higher_is_better: bool) -> Option<Decimal> {
    if median.is_zero() {
        return None;
    }
    let gap = value.checked_sub(median)?.checked_div(median.abs())?;
    Some(if higher_is_better { gap } else { -gap })
}

/// impact_score × ease_of_change × (1 + |gap|); a missing gap counts as zero.
///
/// Weights are non-negative, so a product beyond the `Decimal` range
/// saturates at `Decimal::MAX`.
pub fn dynamic_priority(weights: &KpiWeights, performance_gap: Option<Decimal>) -> Decimal {
    let gap = performance_gap.unwrap_or(Decimal::ZERO).abs();
    weights
        .impact_score
        .checked_mul(weights.ease_of_change)
        .and_then(|weight| weight.checked_mul(Decimal::ONE.checked_add(gap)?))
        .unwrap_or(Decimal::MAX)
}

/// `(value - x0) / (x1 - x0)` for `x0 < value < x1`, in [0, 1].
///
/// Knots spanning more than the `Decimal` range are compared at half scale.
fn fraction_between(value: Decimal, x0: Decimal, x1: Decimal) -> Decimal {
    let exact = value
        .checked_sub(x0)
        .zip(x1.checked_sub(x0))
        .and_then(|(offset, width)| offset.checked_div(width));
    if let Some(fraction) = exact {
        return fraction;
    }

    let offset = value / Decimal::TWO - x0 / Decimal::TWO;
    let width = x1 / Decimal::TWO - x0 / Decimal::TWO;
    offset
        .checked_div(width)
        .map(|fraction| fraction.clamp(Decimal::ZERO, Decimal::ONE))
        .unwrap_or(Decimal::ONE / Decimal::TWO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{KpiKey, PeerGroupKey};
    use rust_decimal_macros::dec;

    fn benchmark(min: Decimal, p25: Decimal, median: Decimal, p75: Decimal, max: Decimal) -> BenchmarkRecord {
        BenchmarkRecord {
            kpi_key: KpiKey::OperatingMargin,
            peer_group_key: PeerGroupKey::national(),
            fiscal_year: 2022,
            provider_count: 5,
            p25,
            median,
            p75,
            mean: median,
            min,
            max,
        }
    }

    #[test]
    fn trend_skips_null_years() {
        let history = [(2020, Some(dec!(5.0))), (2021, None), (2022, Some(dec!(6.0)))];
        assert_eq!(trend(&history, true, dec!(0.01)), Trend::Up);
        assert_eq!(trend(&history, false, dec!(0.01)), Trend::Down);
    }

    #[test]
    fn trend_uses_the_two_latest_years_regardless_of_input_order() {
        let history = [(2022, Some(dec!(4))), (2019, Some(dec!(100))), (2021, Some(dec!(5)))];
        assert_eq!(trend(&history, true, dec!(0.01)), Trend::Down);
    }

    #[test]
    fn small_changes_are_flat() {
        let history = [(2021, Some(dec!(100))), (2022, Some(dec!(100.5)))];
        assert_eq!(trend(&history, true, dec!(0.01)), Trend::Flat);
        assert_eq!(trend(&history, true, dec!(0.001)), Trend::Up);

        let from_zero = [(2021, Some(dec!(0))), (2022, Some(dec!(0.005)))];
        assert_eq!(trend(&from_zero, true, dec!(0.01)), Trend::Flat);
    }

    #[test]
    fn fewer_than_two_points_is_unknown() {
        assert_eq!(trend(&[], true, dec!(0.01)), Trend::Unknown);
        assert_eq!(trend(&[(2022, Some(dec!(1))), (2021, None)], true, dec!(0.01)), Trend::Unknown);
    }

    #[test]
    fn percentile_rank_interpolates_and_clamps() {
        let b = benchmark(dec!(10), dec!(20), dec!(30), dec!(40), dec!(50));
        assert_eq!(percentile_rank(dec!(30), &b), dec!(50));
        assert_eq!(percentile_rank(dec!(35), &b), dec!(62.5));
        assert_eq!(percentile_rank(dec!(15), &b), dec!(12.5));
        assert_eq!(percentile_rank(dec!(5), &b), dec!(0));
        assert_eq!(percentile_rank(dec!(60), &b), dec!(100));
    }

    #[test]
    fn percentile_rank_on_a_flat_distribution_is_the_middle() {
        let b = benchmark(dec!(7), dec!(7), dec!(7), dec!(7), dec!(7));
        assert_eq!(percentile_rank(dec!(7), &b), dec!(50));
    }

    #[test]
    fn gap_is_positive_when_better() {
        assert_eq!(performance_gap(dec!(0.06), dec!(0.05), true), Some(dec!(0.2)));
        assert_eq!(performance_gap(dec!(0.06), dec!(0.05), false), Some(dec!(-0.2)));
        assert_eq!(performance_gap(dec!(-0.1), dec!(-0.05), true), Some(dec!(-1)));
        assert_eq!(performance_gap(dec!(1), dec!(0), true), None);
    }

    #[test]
    fn extreme_magnitudes_do_not_overflow() {
        let weights = KpiWeights {
            impact_score: dec!(3.0),
            ease_of_change: dec!(1.0),
        };
        let tiny_median = Decimal::new(1, 28);
        let gap = performance_gap(dec!(5), tiny_median, true).unwrap();
        assert!(gap > dec!(1000000000000000000000000000));
        assert_eq!(dynamic_priority(&weights, Some(gap)), Decimal::MAX);

        assert_eq!(performance_gap(Decimal::MAX, Decimal::MIN, true), None);

        let wide = benchmark(Decimal::MIN, dec!(-1), dec!(0), dec!(1), Decimal::MAX);
        assert_eq!(percentile_rank(dec!(0), &wide), dec!(50));
        let low = percentile_rank(Decimal::MIN / Decimal::TWO, &wide);
        assert!(low > dec!(0) && low < dec!(25), "{low}");

        let history = [(2021, Some(Decimal::MIN)), (2022, Some(Decimal::MAX))];
        assert_eq!(trend(&history, true, dec!(0.01)), Trend::Up);
        assert_eq!(trend(&history, false, dec!(0.01)), Trend::Down);
    }

    #[test]
    fn priority_grows_with_distance_from_median() {
        let weights = KpiWeights {
            impact_score: dec!(0.8),
            ease_of_change: dec!(0.5),
        };
        assert_eq!(dynamic_priority(&weights, None), dec!(0.4));
        assert_eq!(dynamic_priority(&weights, Some(dec!(-0.5))), dec!(0.6));
        assert_eq!(dynamic_priority(&weights, Some(dec!(0.5))), dec!(0.6));
    }
}
