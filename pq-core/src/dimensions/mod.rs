//! One assessment per power-quality dimension. Every function here is pure:
//! tables in, `Finding` out.

pub mod ground_current;
pub mod harmonics;
pub mod power;
pub mod power_factor;
pub mod unbalance;
pub mod voltage;

use serde::Serialize;

use crate::{
    domain::{ReportingPeriod, Verdict},
    error::Result,
    evaluate::{column_summary, evaluate, round2, Exposure, Predicate},
    table::TimeSeriesTable,
};

/// Statistics for a "column at or above threshold for more than N% of the
/// period" rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RuleStats {
    pub threshold: f64,
    pub max_violation_pct: f64,
    pub violation: Exposure,
    /// Whole-period mean of the column, rounded.
    pub period_mean: Option<f64>,
    pub verdict: Verdict,
}

impl RuleStats {
    pub fn at_or_above(
        table: &TimeSeriesTable,
        period: &ReportingPeriod,
        column: &str,
        threshold: f64,
        max_violation_pct: f64,
    ) -> Result<Self> {
        let violation = evaluate(table, &Predicate::ge(column, threshold), period)?.exposure();
        let period_mean = column_summary(table, column)?.map(|s| round2(s.mean));
        Ok(Self {
            threshold,
            max_violation_pct,
            violation,
            period_mean,
            verdict: Verdict::exceeded_if(violation.percentage > max_violation_pct),
        })
    }
}

/// Render an optional statistic, `n/a` when undefined.
pub(crate) fn display_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}
