//! Fixtures shared by unit tests.

use time::{Duration, OffsetDateTime};

use crate::{
    domain::{Channel, ReportingPeriod},
    table::{RawSamples, TimeSeriesTable},
};

pub(crate) fn minute_samples(
    start: OffsetDateTime,
    channels: &[Channel],
    rows: Vec<Vec<Option<f64>>>,
) -> RawSamples {
    let mut samples = RawSamples::new(channels.to_vec());
    for (i, values) in rows.into_iter().enumerate() {
        samples.push(start + Duration::minutes(i as i64), values);
    }
    samples
}

/// A UTC table of `minutes` rows where `f(row, channel)` yields each value.
pub(crate) fn table_from_fn(
    start: OffsetDateTime,
    minutes: usize,
    channels: &[Channel],
    f: impl Fn(usize, Channel) -> Option<f64>,
) -> TimeSeriesTable {
    let rows = (0..minutes)
        .map(|i| channels.iter().map(|&c| f(i, c)).collect())
        .collect();
    TimeSeriesTable::from_samples(minute_samples(start, channels, rows), chrono_tz::UTC)
        .expect("fixture table")
}

pub(crate) fn period_of_minutes(start: OffsetDateTime, minutes: i64) -> ReportingPeriod {
    ReportingPeriod::new(start, start + Duration::minutes(minutes)).expect("fixture period")
}
