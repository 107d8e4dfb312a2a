use serde::Serialize;
use time::Duration;

use crate::{
    domain::{
        format_duration, Channel, Classification, Dimension, Finding, FindingDetails,
        ReportingPeriod, Verdict, LINE_CURRENTS,
    },
    error::Result,
    evaluate::{evaluate, round2, Exposure, Predicate},
    table::TimeSeriesTable,
};

pub const LOW_POWER_FACTOR: f64 = 0.9;
/// Per-line current every phase must exceed for a low-PF minute to count when gated.
pub const GATE_CURRENT_AMPS: f64 = 40.0;

pub fn max_low_pf_duration() -> Duration {
    Duration::hours(5)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerFactorStats {
    pub current_gated: bool,
    pub violation: Exposure,
    pub mean_low_pf: Option<f64>,
    pub min_low_pf: Option<f64>,
    pub verdict: Verdict,
}

pub fn violation_predicate(apply_current_gate: bool) -> Predicate {
    let low = Predicate::lt(Channel::PowerFactor.column(), LOW_POWER_FACTOR);
    if !apply_current_gate {
        return low;
    }
    LINE_CURRENTS
        .iter()
        .fold(low, |p, line| p.and(Predicate::gt(line.column(), GATE_CURRENT_AMPS)))
}

pub fn assess(
    table: &TimeSeriesTable,
    period: &ReportingPeriod,
    apply_current_gate: bool,
) -> Result<Finding> {
    let pf = Channel::PowerFactor.column();
    let eval = evaluate(table, &violation_predicate(apply_current_gate), period)?;
    let verdict = Verdict::exceeded_if(eval.duration() > max_low_pf_duration());

    let stats = PowerFactorStats {
        current_gated: apply_current_gate,
        violation: eval.exposure(),
        mean_low_pf: eval.mean(pf)?.map(round2),
        min_low_pf: eval.min(pf)?.map(round2),
        verdict,
    };
    let state = match verdict {
        Verdict::Exceeded => "exceeds",
        Verdict::WithinTolerance => "is within tolerance of",
    };
    let conclusion = format!(
        "For this period, Power Factor (PF) degraded below 0.9 for a total of {} which {state} the 5-hour threshold for a 30-day period.",
        format_duration(eval.duration())
    );

    Ok(Finding::new(
        Dimension::PowerFactor,
        Classification::from_verdicts([verdict]),
        FindingDetails::PowerFactor(stats),
        vec![conclusion],
    ))
}
