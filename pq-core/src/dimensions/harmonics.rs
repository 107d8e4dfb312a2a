use serde::Serialize;

use crate::{
    dimensions::RuleStats,
    domain::{
        Channel, Classification, Dimension, Finding, FindingDetails, ReportingPeriod, Verdict,
    },
    error::Result,
    evaluate::{column_summary, round2},
    table::TimeSeriesTable,
};

pub const THD_PCT: f64 = 5.0;
pub const MAX_THD_PERIOD_PCT: f64 = 5.0;
pub const TDD_PCT: f64 = 25.0;
pub const MAX_TDD_PERIOD_PCT: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HarmonicsStats {
    pub thd: RuleStats,
    pub tdd: RuleStats,
    pub tdd_max: Option<f64>,
}

pub fn assess(table: &TimeSeriesTable, period: &ReportingPeriod) -> Result<Finding> {
    let thd = RuleStats::at_or_above(
        table,
        period,
        Channel::VoltageThd.column(),
        THD_PCT,
        MAX_THD_PERIOD_PCT,
    )?;
    let tdd = RuleStats::at_or_above(
        table,
        period,
        Channel::CurrentTdd.column(),
        TDD_PCT,
        MAX_TDD_PERIOD_PCT,
    )?;
    let tdd_max = column_summary(table, Channel::CurrentTdd.column())?.map(|s| round2(s.max));

    // TDD is reported first.
    let conclusions = vec![
        match tdd.verdict {
            Verdict::Exceeded => {
                "Total Demand Distortion (TDD) values exceeded 25% for more than 25% of the month."
            }
            Verdict::WithinTolerance => {
                "TDD values remained under the defined tolerance of 25% for at least 75% of the month."
            }
        }
        .to_string(),
        match thd.verdict {
            Verdict::Exceeded => {
                "Total Harmonic Distortion (THD-V) values exceeded 5% for more than 5% of the month."
            }
            Verdict::WithinTolerance => {
                "Total Harmonic Distortion (THD-V) values remained under 5% for at least 95% of the month."
            }
        }
        .to_string(),
    ];

    Ok(Finding::new(
        Dimension::Harmonics,
        Classification::from_verdicts([thd.verdict, tdd.verdict]),
        FindingDetails::Harmonics(HarmonicsStats { thd, tdd, tdd_max }),
        conclusions,
    ))
}
