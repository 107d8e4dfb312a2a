use pq_core::{domain::ReportingPeriod, table::RawSamples};

use crate::metrics_export::SAMPLES_OUT_OF_PERIOD;

/// Pure clipping of retrieved samples to the half-open reporting period.
///
/// Rules:
/// - rows with `start <= ts < end` are kept, in their original order.
/// - everything else is dropped and counted.
pub fn clip_samples(samples: RawSamples, period: &ReportingPeriod) -> (RawSamples, usize) {
    let before = samples.rows.len();
    let rows: Vec<_> = samples
        .rows
        .into_iter()
        .filter(|row| period.contains(row.ts))
        .collect();
    let dropped = before - rows.len();
    (
        RawSamples {
            channels: samples.channels,
            rows,
        },
        dropped,
    )
}

/// `clip_samples`, recording dropped rows.
pub fn clip_to_period(samples: RawSamples, period: &ReportingPeriod) -> (RawSamples, usize) {
    let (clipped, dropped) = clip_samples(samples, period);
    if dropped > 0 {
        metrics::counter!(SAMPLES_OUT_OF_PERIOD).increment(dropped as u64);
        tracing::debug!(
            dropped,
            kept = clipped.len(),
            period = %period.label(),
            "samples outside reporting period dropped"
        );
    }
    (clipped, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pq_core::domain::Channel;
    use time::{macros::datetime, Month, UtcOffset};

    fn may() -> ReportingPeriod {
        ReportingPeriod::calendar_month(2021, Month::May, UtcOffset::UTC).unwrap()
    }

    #[test]
    fn keeps_rows_inside_period() {
        let mut samples = RawSamples::new(vec![Channel::PowerFactor]);
        samples.push(datetime!(2021-05-01 00:00:00 UTC), vec![Some(0.9)]);
        samples.push(datetime!(2021-05-31 23:59:00 UTC), vec![Some(0.8)]);

        let (clipped, dropped) = clip_to_period(samples.clone(), &may());
        assert_eq!(dropped, 0);
        assert_eq!(clipped, samples);
    }

    #[test]
    fn drops_rows_at_end_and_before_start() {
        let mut samples = RawSamples::new(vec![Channel::PowerFactor]);
        samples.push(datetime!(2021-04-30 23:59:00 UTC), vec![Some(0.1)]);
        samples.push(datetime!(2021-05-15 12:00:00 UTC), vec![Some(0.9)]);
        samples.push(datetime!(2021-06-01 00:00:00 UTC), vec![Some(0.2)]);

        let (clipped, dropped) = clip_to_period(samples, &may());
        assert_eq!(dropped, 2);
        assert_eq!(clipped.len(), 1);
        assert_eq!(clipped.rows[0].values, vec![Some(0.9)]);
        assert_eq!(clipped.channels, vec![Channel::PowerFactor]);
    }

    #[test]
    fn offset_timestamps_compare_as_instants() {
        let mut samples = RawSamples::new(vec![Channel::Flicker]);
        // 2021-05-01 00:30 UTC expressed at -7 is still April locally.
        samples.push(datetime!(2021-04-30 17:30:00 -7), vec![Some(0.5)]);

        let (clipped, dropped) = clip_samples(samples, &may());
        assert_eq!(dropped, 0);
        assert_eq!(clipped.len(), 1);
    }
}
