use serde::Serialize;

use crate::{
    dimensions::RuleStats,
    domain::{
        Channel, Classification, Dimension, Finding, FindingDetails, ReportingPeriod, Verdict,
    },
    error::Result,
    table::TimeSeriesTable,
};

pub const VOLTAGE_UNBALANCE_PCT: f64 = 2.0;
pub const CURRENT_UNBALANCE_PCT: f64 = 50.0;
pub const MAX_UNBALANCE_PERIOD_PCT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UnbalanceStats {
    pub voltage: RuleStats,
    pub current: RuleStats,
}

pub fn assess(table: &TimeSeriesTable, period: &ReportingPeriod) -> Result<Finding> {
    let voltage = RuleStats::at_or_above(
        table,
        period,
        Channel::NegSeqVoltageUnbalance.column(),
        VOLTAGE_UNBALANCE_PCT,
        MAX_UNBALANCE_PERIOD_PCT,
    )?;
    let current = RuleStats::at_or_above(
        table,
        period,
        Channel::NegSeqCurrentUnbalance.column(),
        CURRENT_UNBALANCE_PCT,
        MAX_UNBALANCE_PERIOD_PCT,
    )?;

    let conclusions = vec![
        match voltage.verdict {
            Verdict::Exceeded => {
                "Negative voltage unbalance exceeded 2% for more than 5% of the month."
            }
            Verdict::WithinTolerance => {
                "Negative voltage unbalance remained within the defined tolerance of 2% for at least 95% of the month."
            }
        }
        .to_string(),
        match current.verdict {
            Verdict::Exceeded => {
                "Negative current unbalance exceeded 50% for more than 5% of the month."
            }
            Verdict::WithinTolerance => {
                "Negative current unbalance remained within the defined tolerance of 50% for at least 95% of the month."
            }
        }
        .to_string(),
    ];

    Ok(Finding::new(
        Dimension::Unbalance,
        Classification::from_verdicts([voltage.verdict, current.verdict]),
        FindingDetails::Unbalance(UnbalanceStats { voltage, current }),
        conclusions,
    ))
}
