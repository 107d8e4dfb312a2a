//! Derived columns: sample-to-sample differences and voltage fluctuation
//! relative to nominal. Each operation returns a new table and skips columns
//! the input already carries.

use crate::{
    domain::{Channel, LINE_VOLTAGES},
    error::Result,
    table::TimeSeriesTable,
};

pub const DIFFERENCED_CHANNELS: [Channel; 8] = [
    Channel::ActivePower,
    Channel::PowerFactor,
    Channel::Flicker,
    Channel::VoltageThd,
    Channel::CurrentTdd,
    Channel::NegSeqVoltageUnbalance,
    Channel::NegSeqCurrentUnbalance,
    Channel::GroundCurrent,
];

pub fn fluctuation_column(line: Channel) -> String {
    format!("{}_fluct_pct", line.column())
}

/// `x[i] - x[i-1]`; the first row and rows with a missing operand are missing.
pub fn difference(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(None);
    out.extend(values.windows(2).map(|w| match (w[0], w[1]) {
        (Some(prev), Some(cur)) => Some(cur - prev),
        _ => None,
    }));
    out
}

/// `|1 - nominal / measured| * 100`, missing when `measured` is zero or missing.
pub fn fluctuation_percent(measured: Option<f64>, nominal: f64) -> Option<f64> {
    let measured = measured?;
    if measured == 0.0 {
        return None;
    }
    let pct = (1.0 - nominal / measured).abs() * 100.0;
    pct.is_finite().then_some(pct)
}

/// Append difference columns for every differenced channel present in `table`.
pub fn with_differences(table: &TimeSeriesTable) -> Result<TimeSeriesTable> {
    let mut out = table.clone();
    for channel in DIFFERENCED_CHANNELS {
        let name = channel.diff_column();
        if !table.has_column(channel.column()) || table.has_column(&name) {
            continue;
        }
        let diff = difference(table.channel(channel)?);
        out = out.with_column(name, diff)?;
    }
    Ok(out)
}

/// Append per-line fluctuation percentage columns for the voltages present in `table`.
pub fn with_fluctuation(
    table: &TimeSeriesTable,
    nominal_phase_to_neutral: f64,
) -> Result<TimeSeriesTable> {
    let mut out = table.clone();
    for line in LINE_VOLTAGES {
        let name = fluctuation_column(line);
        if !table.has_column(line.column()) || table.has_column(&name) {
            continue;
        }
        let values = table
            .channel(line)?
            .iter()
            .map(|v| fluctuation_percent(*v, nominal_phase_to_neutral))
            .collect();
        out = out.with_column(name, values)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::table_from_fn;
    use time::macros::datetime;

    #[test]
    fn difference_leaves_first_row_missing() {
        let diff = difference(&[Some(1.0), Some(3.0), None, Some(2.0), Some(2.5)]);
        assert_eq!(diff, vec![None, Some(2.0), None, None, Some(0.5)]);
        assert!(difference(&[]).is_empty());
    }

    #[test]
    fn fluctuation_is_relative_to_measured() {
        let pct = fluctuation_percent(Some(400.0), 347.0).unwrap();
        assert!((pct - 13.25).abs() < 1e-9);
        assert_eq!(fluctuation_percent(Some(0.0), 347.0), None);
        assert_eq!(fluctuation_percent(None, 347.0), None);
    }

    #[test]
    fn differences_only_cover_present_channels() {
        let table = table_from_fn(
            datetime!(2021-05-01 00:00:00 UTC),
            3,
            &[Channel::GroundCurrent, Channel::L1Current],
            |i, _| Some(i as f64 * 0.5),
        );
        let derived = with_differences(&table).unwrap();
        assert_eq!(
            derived.column("ground_current_diff").unwrap(),
            &[None, Some(0.5), Some(0.5)]
        );
        assert!(!derived.has_column("l1_current_diff"));
        assert!(!derived.has_column("power_factor_diff"));
        assert!(!table.has_column("ground_current_diff"));
    }

    #[test]
    fn derivation_is_idempotent() {
        let table = table_from_fn(
            datetime!(2021-05-01 00:00:00 UTC),
            4,
            &[Channel::L1Voltage, Channel::L2Voltage, Channel::L3Voltage, Channel::Flicker],
            |i, _| Some(340.0 + i as f64),
        );
        let once = with_fluctuation(&with_differences(&table).unwrap(), 347.0).unwrap();
        let twice = with_fluctuation(&with_differences(&once).unwrap(), 347.0).unwrap();
        assert_eq!(once, twice);
        assert!(once.has_column("l3_voltage_fluct_pct"));
        assert!(once.has_column("pst_diff"));
    }

    #[test]
    fn zero_voltage_yields_missing_fluctuation() {
        let table = table_from_fn(
            datetime!(2021-05-01 00:00:00 UTC),
            3,
            &[Channel::L1Voltage],
            |i, _| Some(if i == 1 { 0.0 } else { 347.0 }),
        );
        let derived = with_fluctuation(&table, 347.0).unwrap();
        assert_eq!(
            derived.column(&fluctuation_column(Channel::L1Voltage)).unwrap(),
            &[Some(0.0), None, Some(0.0)]
        );
    }
}
