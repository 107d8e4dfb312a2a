//! Fixtures shared by unit tests.

use std::collections::BTreeMap;

use pq_core::{
    domain::{
        Channel, ChannelMap, EnergySummary, ParamValue, RawParameter, ReportingPeriod,
        SiteConfiguration, SiteMetadata, SiteParameters, WiringConfiguration,
    },
    table::RawSamples,
    EnergyTotals, PeriodTables, RunConfig, SiteAssessment, SiteData,
};
use time::{Duration, Month, UtcOffset};

use crate::sources::{Dataset, SourceError, TelemetrySource};

/// One healthy value per channel; low PF for the first `low_pf_minutes` rows.
fn value(channel: Channel, row: usize, low_pf_minutes: usize) -> Option<f64> {
    match channel {
        Channel::PowerFactor if row < low_pf_minutes => Some(0.8),
        Channel::PowerFactor => Some(0.98),
        Channel::L1Current | Channel::L2Current | Channel::L3Current => Some(100.0),
        Channel::GroundCurrent => Some(0.01),
        Channel::VoltageThd => Some(1.5),
        Channel::CurrentTdd => Some(6.0),
        Channel::NegSeqVoltageUnbalance => Some(0.4),
        Channel::NegSeqCurrentUnbalance => Some(8.0),
        Channel::Flicker => Some(0.3),
        Channel::L1Voltage | Channel::L2Voltage | Channel::L3Voltage => Some(350.0),
        _ => Some(50_000.0),
    }
}

/// One row per minute of `period`, plus `stray` rows before its start.
pub(crate) fn period_samples(
    period: &ReportingPeriod,
    dataset: Dataset,
    low_pf_minutes: usize,
    stray: usize,
) -> RawSamples {
    let channels = dataset.channels();
    let mut samples = RawSamples::new(channels.to_vec());
    for i in (1..=stray).rev() {
        let ts = period.start() - Duration::minutes(i as i64);
        samples.push(ts, channels.iter().map(|&c| value(c, 0, 1)).collect());
    }
    let minutes = period.duration().whole_minutes() as usize;
    for row in 0..minutes {
        let ts = period.start() + Duration::minutes(row as i64);
        samples.push(
            ts,
            channels
                .iter()
                .map(|&c| value(c, row, low_pf_minutes))
                .collect(),
        );
    }
    samples
}

pub(crate) fn may_2021() -> ReportingPeriod {
    ReportingPeriod::calendar_month(2021, Month::May, UtcOffset::UTC).unwrap()
}

/// A fully assessed site with every dimension passing.
pub(crate) fn sample_assessment() -> SiteAssessment {
    let site = SiteConfiguration::new(347.0, 600.0, WiringConfiguration::Wye).unwrap();
    let config = RunConfig::new("2167", may_2021(), site).unwrap();
    let tables = |period: &ReportingPeriod| {
        PeriodTables::from_samples(
            period_samples(period, Dataset::Trend, 0, 0),
            period_samples(period, Dataset::Voltage, 0, 0),
            pq_core::Tz::UTC,
        )
        .unwrap()
    };
    let data = SiteData {
        current: tables(&config.current),
        previous: tables(&config.previous),
        energy: EnergyTotals {
            current: 105_000.0,
            previous: 100_000.0,
        },
    };
    pq_core::assess_site(&config, &data).unwrap()
}

fn parameters() -> SiteParameters {
    let param = |v: ParamValue| RawParameter {
        value: Some(v),
        default_value: None,
    };
    SiteParameters {
        measurement_point_id: Some("2167".to_string()),
        content: BTreeMap::from([
            (
                "nominalPhaseToNeutralVoltage".to_string(),
                param(ParamValue::Number(347.0)),
            ),
            (
                "nominalPhaseToPhaseVoltage".to_string(),
                param(ParamValue::Text("600".to_string())),
            ),
            (
                "powerConfiguration".to_string(),
                param(ParamValue::Text("Wye".to_string())),
            ),
        ]),
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeSite {
    pub metadata: SiteMetadata,
    pub parameters: SiteParameters,
    /// Active energy by period month key.
    pub energy: BTreeMap<String, f64>,
    pub low_pf_minutes: usize,
    pub stray_rows: usize,
}

impl FakeSite {
    pub fn healthy(account: &str) -> Self {
        Self {
            metadata: SiteMetadata {
                mp_id: " - 01".to_string(),
                account_name: account.to_string(),
                timezone: "UTC".to_string(),
                city: None,
                country: None,
            },
            parameters: parameters(),
            energy: BTreeMap::from([
                ("2021-04".to_string(), 100_000.0),
                ("2021-05".to_string(), 105_000.0),
            ]),
            low_pf_minutes: 0,
            stray_rows: 0,
        }
    }
}

/// In-memory `TelemetrySource` keyed by site id.
#[derive(Debug, Default)]
pub(crate) struct FakeSource {
    pub sites: BTreeMap<String, FakeSite>,
}

impl FakeSource {
    pub fn with_site(mut self, id: &str, site: FakeSite) -> Self {
        self.sites.insert(id.to_string(), site);
        self
    }

    fn site(&self, id: &str) -> Result<&FakeSite, SourceError> {
        self.sites
            .get(id)
            .ok_or_else(|| SourceError::NoData(format!("unknown site {id}")))
    }
}

#[async_trait::async_trait]
impl TelemetrySource for FakeSource {
    async fn site_metadata(&self, site_id: &str) -> Result<SiteMetadata, SourceError> {
        Ok(self.site(site_id)?.metadata.clone())
    }

    async fn site_parameters(&self, site_id: &str) -> Result<SiteParameters, SourceError> {
        Ok(self.site(site_id)?.parameters.clone())
    }

    async fn energy(
        &self,
        site_id: &str,
        period: &ReportingPeriod,
    ) -> Result<EnergySummary, SourceError> {
        let total = self
            .site(site_id)?
            .energy
            .get(&period.month_key())
            .copied()
            .ok_or_else(|| SourceError::NoData(format!("no energy for {}", period.label())))?;
        Ok(EnergySummary {
            total_active_energy_consumed: total,
            total_apparent_energy_consumed: None,
            total_reactive_energy_consumed: None,
            max_active_power_demand: None,
            avg_power_factor: None,
            samples: None,
        })
    }

    async fn trend(
        &self,
        site_id: &str,
        period: &ReportingPeriod,
        dataset: Dataset,
        _channels: &ChannelMap,
    ) -> Result<RawSamples, SourceError> {
        let site = self.site(site_id)?;
        Ok(period_samples(
            period,
            dataset,
            site.low_pf_minutes,
            site.stray_rows,
        ))
    }
}
