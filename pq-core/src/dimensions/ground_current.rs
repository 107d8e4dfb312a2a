use serde::Serialize;

use crate::{
    dimensions::display_opt,
    domain::{
        format_duration, Channel, Classification, Dimension, Finding, FindingDetails,
        ReportingPeriod, Verdict,
    },
    error::Result,
    evaluate::{column_summary, evaluate, round2, Exposure, Predicate},
    table::TimeSeriesTable,
};

pub const GROUND_CURRENT_AMPS: f64 = 0.1;
/// Minute-over-minute rise that marks a ground current step event.
pub const STEP_RISE_AMPS: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroundCurrentStats {
    pub violation: Exposure,
    pub period_mean: Option<f64>,
    pub period_max: Option<f64>,
    pub violation_mean: Option<f64>,
    pub violation_max: Option<f64>,
    pub step_events: usize,
    pub verdict: Verdict,
}

/// Expects the ground current difference column to be derived.
pub fn assess(table: &TimeSeriesTable, period: &ReportingPeriod) -> Result<Finding> {
    let gnd = Channel::GroundCurrent.column();
    let eval = evaluate(table, &Predicate::ge(gnd, GROUND_CURRENT_AMPS), period)?;
    let steps = evaluate(
        table,
        &Predicate::gt(Channel::GroundCurrent.diff_column(), STEP_RISE_AMPS)
            .and(Predicate::ge(gnd, GROUND_CURRENT_AMPS)),
        period,
    )?;
    let whole = column_summary(table, gnd)?;
    let during = eval.summary(gnd)?;

    let stats = GroundCurrentStats {
        violation: eval.exposure(),
        period_mean: whole.map(|s| round2(s.mean)),
        period_max: whole.map(|s| round2(s.max)),
        violation_mean: during.map(|s| round2(s.mean)),
        violation_max: during.map(|s| round2(s.max)),
        step_events: steps.count(),
        verdict: Verdict::exceeded_if(eval.count() > 0),
    };

    let conclusion = match stats.verdict {
        Verdict::Exceeded => format!(
            "Ground current exceeded 0.1 A during this 30-day period for an accumulated time of {} with an average ground current reading of {} A and the maximum reading of {} A.",
            format_duration(eval.duration()),
            display_opt(stats.period_mean),
            display_opt(stats.period_max),
        ),
        Verdict::WithinTolerance => {
            "Ground current remained within the defined tolerance of 0.1 A during this 30-day period."
                .to_string()
        }
    };

    Ok(Finding::new(
        Dimension::GroundCurrent,
        Classification::from_verdicts([stats.verdict]),
        FindingDetails::GroundCurrent(stats),
        vec![conclusion],
    ))
}
