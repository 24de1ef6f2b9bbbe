//! Star rating and percentage helpers for aggregated sentiment

/// Rating reported for a phone with no processed sentiments
pub const NEUTRAL_STAR_RATING: f64 = 3.0;

/// Lower bound (in percent of processed reviews) of each star level above 1
const BREAKPOINTS: [(u64, f64); 4] = [(80, 5.0), (60, 4.0), (40, 3.0), (20, 2.0)];

/// Map the share of positive reviews onto a 1-5 star scale.
///
/// Breakpoints are inclusive: 80% and above is 5 stars, 60% is 4, 40% is 3,
/// 20% is 2, anything lower is 1. The comparison is exact on the counts, so
/// 79.96% is still 4 stars. A phone with no processed sentiments gets
/// [`NEUTRAL_STAR_RATING`].
pub fn star_rating(positive: u64, processed: u64) -> f64 {
    if processed == 0 {
        return NEUTRAL_STAR_RATING;
    }
    let scaled = u128::from(positive) * 100;
    BREAKPOINTS
        .iter()
        .find(|(pct, _)| scaled >= u128::from(*pct) * u128::from(processed))
        .map_or(1.0, |(_, stars)| *stars)
}

/// `part / total` as a percentage rounded to one decimal, 0 when total is 0
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(part as f64 / total as f64 * 100.0)
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_no_processed_reviews_is_neutral() {
        assert_eq!(star_rating(0, 0), 3.0);
    }

    #[test]
    fn test_exact_breakpoints() {
        assert_eq!(star_rating(20, 100), 2.0);
        assert_eq!(star_rating(40, 100), 3.0);
        assert_eq!(star_rating(60, 100), 4.0);
        assert_eq!(star_rating(80, 100), 5.0);
    }

    #[test]
    fn test_just_below_breakpoints() {
        assert_eq!(star_rating(199, 1000), 1.0);
        assert_eq!(star_rating(399, 1000), 2.0);
        assert_eq!(star_rating(599, 1000), 3.0);
        assert_eq!(star_rating(799, 1000), 4.0);
    }

    #[test]
    fn test_rounding_does_not_cross_a_breakpoint() {
        // 79.96%, 59.96%, 39.96% and 19.96% all display as the next breakpoint
        assert_eq!(percentage(1999, 2500), 80.0);
        assert_eq!(star_rating(1999, 2500), 4.0);
        assert_eq!(star_rating(1499, 2500), 3.0);
        assert_eq!(star_rating(999, 2500), 2.0);
        assert_eq!(star_rating(499, 2500), 1.0);
        assert_eq!(star_rating(2000, 2500), 5.0);
    }

    #[test]
    fn test_all_negative_and_all_positive() {
        assert_eq!(star_rating(0, 12), 1.0);
        assert_eq!(star_rating(12, 12), 5.0);
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(5, 0), 0.0);
    }

    proptest! {
        #[test]
        fn rating_is_monotonic(a in 0u64..=500, b in 0u64..=500, processed in 500u64..5000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(star_rating(lo, processed) <= star_rating(hi, processed));
        }

        #[test]
        fn rating_stays_in_range(positive in 0u64..1000, extra in 0u64..1000) {
            let stars = star_rating(positive, positive + extra);
            prop_assert!((1.0..=5.0).contains(&stars));
        }
    }
}
