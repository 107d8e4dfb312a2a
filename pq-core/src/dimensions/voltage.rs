//! Voltage fluctuation and flicker.

use serde::Serialize;

use crate::{
    dimensions::RuleStats,
    domain::{
        Channel, Classification, Dimension, Finding, FindingDetails, ReportingPeriod, Verdict,
        LINE_VOLTAGES,
    },
    error::Result,
    evaluate::{column_summary, evaluate, round2, Exposure, Predicate},
    table::{derive::fluctuation_column, TimeSeriesTable},
};

/// Allowed deviation from nominal phase-to-neutral voltage.
pub const FLUCTUATION_BAND: f64 = 0.07;
/// A line is within tolerance while it spends less than this share of the period outside the band.
pub const MAX_FLUCTUATION_PCT: f64 = 5.0;
pub const FLICKER_THRESHOLD: f64 = 1.0;
pub const MAX_FLICKER_PCT: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineFluctuation {
    pub line: Channel,
    pub violation: Exposure,
    /// Whole-period mean fluctuation, in percent of nominal.
    pub mean_fluctuation_pct: Option<f64>,
    pub violation_mean_pct: Option<f64>,
    pub violation_max_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoltageStats {
    pub nominal_phase_to_neutral: f64,
    pub lower_limit: f64,
    pub upper_limit: f64,
    pub lines: Vec<LineFluctuation>,
    pub fluctuation_verdict: Verdict,
    pub flicker: RuleStats,
}

/// Rows where `line` leaves the band. Rows without a defined fluctuation
/// (zero or missing voltage) never count.
pub fn line_violation(line: Channel, lower: f64, upper: f64) -> Predicate {
    Predicate::defined(fluctuation_column(line)).and(
        Predicate::gt(line.column(), upper).or(Predicate::lt(line.column(), lower)),
    )
}

/// Expects the voltage table with fluctuation columns already derived.
pub fn assess(
    table: &TimeSeriesTable,
    period: &ReportingPeriod,
    nominal_phase_to_neutral: f64,
) -> Result<Finding> {
    let lower = nominal_phase_to_neutral - nominal_phase_to_neutral * FLUCTUATION_BAND;
    let upper = nominal_phase_to_neutral + nominal_phase_to_neutral * FLUCTUATION_BAND;

    let mut lines = Vec::with_capacity(LINE_VOLTAGES.len());
    for line in LINE_VOLTAGES {
        let fluct = fluctuation_column(line);
        let eval = evaluate(table, &line_violation(line, lower, upper), period)?;
        let during = eval.summary(&fluct)?;
        lines.push(LineFluctuation {
            line,
            violation: eval.exposure(),
            mean_fluctuation_pct: column_summary(table, &fluct)?.map(|s| round2(s.mean)),
            violation_mean_pct: during.map(|s| round2(s.mean)),
            violation_max_pct: during.map(|s| round2(s.max)),
        });
    }

    let fluctuation_verdict = Verdict::exceeded_if(
        !lines
            .iter()
            .any(|l| l.violation.percentage < MAX_FLUCTUATION_PCT),
    );
    let flicker = RuleStats::at_or_above(
        table,
        period,
        Channel::Flicker.column(),
        FLICKER_THRESHOLD,
        MAX_FLICKER_PCT,
    )?;

    let conclusions = vec![
        format!(
            "Short term Flicker (Pst) values exceeded 1 for {}% of the 30-day period.",
            flicker.violation.percentage
        ),
        match flicker.verdict {
            Verdict::Exceeded => "Short Term Flicker Perceptibility (Pst) values exceeded 1 for at least 95% of the month.",
            Verdict::WithinTolerance => "Short Term Flicker Perceptibility (Pst) values remained under 1 for 95% of the month.",
        }
        .to_string(),
        match fluctuation_verdict {
            Verdict::Exceeded => "Voltage fluctuation exceeded 7% of nominal voltage for more than 5% of the month.",
            Verdict::WithinTolerance => "Voltage fluctuation remained within 7% of nominal voltage for more than 95% of the month.",
        }
        .to_string(),
    ];

    let classification = Classification::from_verdicts([fluctuation_verdict, flicker.verdict]);
    let stats = VoltageStats {
        nominal_phase_to_neutral,
        lower_limit: lower,
        upper_limit: upper,
        lines,
        fluctuation_verdict,
        flicker,
    };
    Ok(Finding::new(
        Dimension::VoltageFluctuation,
        classification,
        FindingDetails::Voltage(stats),
        conclusions,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::VOLTAGE_CHANNELS,
        table::derive::with_fluctuation,
        testing::{period_of_minutes, table_from_fn},
    };
    use time::macros::datetime;

    const NOMINAL: f64 = 347.0;

    fn stats(f: &Finding) -> &VoltageStats {
        match &f.details {
            FindingDetails::Voltage(s) => s,
            other => panic!("unexpected details {other:?}"),
        }
    }

    fn voltage_table(f: impl Fn(usize, Channel) -> Option<f64>) -> TimeSeriesTable {
        let t = table_from_fn(datetime!(2021-05-01 00:00:00 UTC), 1000, &VOLTAGE_CHANNELS, f);
        with_fluctuation(&t, NOMINAL).unwrap()
    }

    #[test]
    fn flicker_at_exactly_95_percent_is_not_exceeded() {
        let t = voltage_table(|i, c| match c {
            Channel::Flicker => Some(if i < 950 { 1.0 } else { 0.2 }),
            _ => Some(NOMINAL),
        });
        let period = period_of_minutes(datetime!(2021-05-01 00:00:00 UTC), 1000);
        let f = assess(&t, &period, NOMINAL).unwrap();
        let s = stats(&f);
        assert_eq!(s.flicker.violation.percentage, 95.0);
        assert_eq!(s.flicker.verdict, Verdict::WithinTolerance);
        assert_eq!(f.classification, Classification::Pass);
        assert_eq!(
            f.conclusions[0],
            "Short term Flicker (Pst) values exceeded 1 for 95% of the 30-day period."
        );
        assert_eq!(
            f.conclusions[1],
            "Short Term Flicker Perceptibility (Pst) values remained under 1 for 95% of the month."
        );
    }

    #[test]
    fn lines_are_counted_independently() {
        // L1 out of band for 10%, L2 for 20%, L3 for 30%.
        let t = voltage_table(|i, c| match c {
            Channel::L1Voltage if i < 100 => Some(400.0),
            Channel::L2Voltage if i < 200 => Some(300.0),
            Channel::L3Voltage if i < 300 => Some(380.0),
            Channel::Flicker => Some(0.1),
            _ => Some(NOMINAL),
        });
        let period = period_of_minutes(datetime!(2021-05-01 00:00:00 UTC), 1000);
        let f = assess(&t, &period, NOMINAL).unwrap();
        let s = stats(&f);
        let pcts: Vec<f64> = s.lines.iter().map(|l| l.violation.percentage).collect();
        assert_eq!(pcts, vec![10.0, 20.0, 30.0]);
        assert_eq!(s.fluctuation_verdict, Verdict::Exceeded);
        assert_eq!(f.classification, Classification::Fail);
        assert_eq!(
            f.conclusions[2],
            "Voltage fluctuation exceeded 7% of nominal voltage for more than 5% of the month."
        );
        assert_eq!(s.lines[0].violation_max_pct, Some(13.25));
    }

    #[test]
    fn one_quiet_line_keeps_fluctuation_within_tolerance() {
        let t = voltage_table(|i, c| match c {
            Channel::L1Voltage | Channel::L2Voltage if i < 500 => Some(400.0),
            Channel::Flicker => Some(0.1),
            _ => Some(NOMINAL),
        });
        let period = period_of_minutes(datetime!(2021-05-01 00:00:00 UTC), 1000);
        let f = assess(&t, &period, NOMINAL).unwrap();
        assert_eq!(stats(&f).fluctuation_verdict, Verdict::WithinTolerance);
    }

    #[test]
    fn zero_voltage_is_excluded() {
        let t = voltage_table(|i, c| match c {
            Channel::L1Voltage if i == 0 => Some(0.0),
            Channel::Flicker => Some(0.1),
            _ => Some(NOMINAL),
        });
        let period = period_of_minutes(datetime!(2021-05-01 00:00:00 UTC), 1000);
        let f = assess(&t, &period, NOMINAL).unwrap();
        let l1 = &stats(&f).lines[0];
        assert_eq!(l1.violation.count, 0);
        assert_eq!(l1.mean_fluctuation_pct, Some(0.0));
        assert_eq!(l1.violation_mean_pct, None);
    }
}
