use crate::config::EdgeConfig;
use crate::strategies::types::{Comparator, Confidence, EdgeResult, ForecastEstimate, Recommendation};

/// Compare the independent forecast against the market, or against the
/// official reference when the market is absent.
///
/// Thresholds are inclusive: a gap of exactly `strong_threshold` is a strong
/// edge. With `reference_as_independent` set and no model estimate, the
/// official forecast stands in as the independent value (compared against
/// the market only). Returns `None` when there is nothing to compare.
pub fn evaluate_edge(
    independent: Option<&ForecastEstimate>,
    reference: Option<&ForecastEstimate>,
    market: Option<&ForecastEstimate>,
    config: &EdgeConfig,
) -> Option<EdgeResult> {
    let (independent, reference) = match independent {
        Some(i) => (i, reference),
        None if config.reference_as_independent => (reference?, None),
        None => return None,
    };

    let (comparator, comparator_value) = match (market, reference) {
        (Some(m), _) => (Comparator::Market, m.value),
        (None, Some(r)) => (Comparator::Reference, r.value),
        (None, None) => return None,
    };

    let gap = independent.value - comparator_value;
    if !gap.is_finite() {
        return None;
    }

    let (recommendation, confidence_tier) = classify_gap(gap, config);
    Some(EdgeResult {
        gap,
        recommendation,
        confidence_tier,
        comparator,
        independent: independent.value,
        comparator_value,
    })
}

pub fn classify_gap(gap: f64, config: &EdgeConfig) -> (Recommendation, Confidence) {
    let magnitude = gap.abs();
    let direction = if gap > 0.0 {
        Recommendation::FavorHigher
    } else {
        Recommendation::FavorLower
    };

    if magnitude >= config.strong_threshold {
        (direction, Confidence::High)
    } else if magnitude >= config.weak_threshold {
        (direction, Confidence::Medium)
    } else {
        (Recommendation::NoEdge, Confidence::Low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::types::ForecastMethod;

    fn est(value: f64) -> ForecastEstimate {
        ForecastEstimate::new(value, Confidence::Medium, ForecastMethod::RateExtrapolation)
    }

    fn config() -> EdgeConfig {
        EdgeConfig::default()
    }

    #[test]
    fn test_strong_threshold_is_inclusive() {
        let (rec, conf) = classify_gap(2.0, &config());
        assert_eq!(rec, Recommendation::FavorHigher);
        assert_eq!(conf, Confidence::High);

        let (rec, conf) = classify_gap(2.0 - 1e-9, &config());
        assert_eq!(rec, Recommendation::FavorHigher);
        assert_eq!(conf, Confidence::Medium);

        let (rec, conf) = classify_gap(-2.0, &config());
        assert_eq!(rec, Recommendation::FavorLower);
        assert_eq!(conf, Confidence::High);
    }

    #[test]
    fn test_weak_threshold_is_inclusive() {
        assert_eq!(classify_gap(1.0, &config()).1, Confidence::Medium);
        assert_eq!(classify_gap(1.0 - 1e-9, &config()), (Recommendation::NoEdge, Confidence::Low));
        assert_eq!(classify_gap(0.0, &config()).0, Recommendation::NoEdge);
    }

    #[test]
    fn test_prefers_market_comparator() {
        let result = evaluate_edge(Some(&est(45.0)), Some(&est(44.0)), Some(&est(42.5)), &config()).unwrap();
        assert_eq!(result.comparator, Comparator::Market);
        assert!((result.gap - 2.5).abs() < 1e-9);
        assert_eq!(result.recommendation, Recommendation::FavorHigher);
        assert_eq!(result.confidence_tier, Confidence::High);
    }

    #[test]
    fn test_falls_back_to_reference() {
        let result = evaluate_edge(Some(&est(45.0)), Some(&est(46.5)), None, &config()).unwrap();
        assert_eq!(result.comparator, Comparator::Reference);
        assert_eq!(result.recommendation, Recommendation::FavorLower);
        assert_eq!(result.confidence_tier, Confidence::Medium);
    }

    #[test]
    fn test_reference_stands_in_for_missing_model() {
        let lenient = EdgeConfig {
            reference_as_independent: true,
            ..config()
        };
        let result = evaluate_edge(None, Some(&est(48.0)), Some(&est(45.0)), &lenient).unwrap();
        assert_eq!(result.comparator, Comparator::Market);
        assert_eq!(result.independent, 48.0);

        // reference cannot be compared with itself
        assert!(evaluate_edge(None, Some(&est(48.0)), None, &lenient).is_none());
    }

    #[test]
    fn test_missing_model_skips_edge_by_default() {
        assert!(evaluate_edge(None, Some(&est(48.0)), Some(&est(45.0)), &config()).is_none());
    }

    #[test]
    fn test_nothing_to_compare() {
        assert!(evaluate_edge(Some(&est(45.0)), None, None, &config()).is_none());
        assert!(evaluate_edge(None, None, Some(&est(45.0)), &config()).is_none());
        assert!(evaluate_edge(Some(&est(f64::NAN)), None, Some(&est(45.0)), &config()).is_none());
    }
}
