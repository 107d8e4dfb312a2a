//! Period-over-period comparison, layered on single-period findings.

use serde::Serialize;

use crate::{dimensions::power_factor::PowerFactorStats, evaluate::round2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonTrend {
    Degraded,
    NoActionNeeded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodComparison {
    pub current_pct: f64,
    pub previous_pct: f64,
    /// `current_pct - previous_pct` in percentage points, rounded.
    pub delta_pct_points: f64,
    pub trend: ComparisonTrend,
    pub recommendation: String,
}

/// Compare the share of each period spent in violation. Any increase degrades.
pub fn compare_percentages(
    current_pct: f64,
    previous_pct: f64,
    degraded_recommendation: &str,
) -> PeriodComparison {
    let delta = round2(current_pct - previous_pct);
    let (trend, recommendation) = if delta > 0.0 {
        (ComparisonTrend::Degraded, degraded_recommendation)
    } else {
        (ComparisonTrend::NoActionNeeded, "No action.")
    };
    PeriodComparison {
        current_pct,
        previous_pct,
        delta_pct_points: delta,
        trend,
        recommendation: recommendation.to_string(),
    }
}

pub fn compare_power_factor(
    current: &PowerFactorStats,
    previous: &PowerFactorStats,
) -> PeriodComparison {
    compare_percentages(
        current.violation.percentage,
        previous.violation.percentage,
        "Investigate why power factor has degraded since previous month",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dimensions::power_factor,
        domain::{Channel, Classification},
        testing::{period_of_minutes, table_from_fn},
    };
    use time::macros::datetime;

    #[test]
    fn increase_degrades() {
        let c = compare_percentages(2.5, 1.25, "look");
        assert_eq!(c.delta_pct_points, 1.25);
        assert_eq!(c.trend, ComparisonTrend::Degraded);
        assert_eq!(c.recommendation, "look");
    }

    #[test]
    fn equal_or_lower_needs_no_action() {
        for prev in [2.5, 3.0] {
            let c = compare_percentages(2.5, prev, "look");
            assert_eq!(c.trend, ComparisonTrend::NoActionNeeded);
            assert_eq!(c.recommendation, "No action.");
        }
    }

    #[test]
    fn passing_power_factor_becomes_degraded() {
        let start = datetime!(2021-05-01 00:00:00 UTC);
        let period = period_of_minutes(start, 1440);
        let finding = |low: usize| {
            let t = table_from_fn(start, 1440, &[Channel::PowerFactor], |i, _| {
                Some(if i < low { 0.5 } else { 1.0 })
            });
            power_factor::assess(&t, &period, false).unwrap()
        };
        let current = finding(120);
        let previous = finding(60);
        let comparison = compare_power_factor(
            current.power_factor().unwrap(),
            previous.power_factor().unwrap(),
        );
        assert_eq!(comparison.current_pct, 8.33);
        assert_eq!(comparison.previous_pct, 4.17);
        assert_eq!(comparison.delta_pct_points, 4.16);

        let layered = current.clone().with_comparison(comparison);
        assert_eq!(current.classification, Classification::Pass);
        assert_eq!(layered.classification, Classification::Degraded);
        assert_eq!(
            layered.recommendation.as_deref(),
            Some("Investigate why power factor has degraded since previous month")
        );
        assert_eq!(layered.conclusions, current.conclusions);
    }
}
