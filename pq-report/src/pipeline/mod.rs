//! Multi-site runner: retrieve, clip, assess and report each site in turn.

use std::path::PathBuf;

use anyhow::Context;
use pq_core::{
    domain::{ChannelMap, ReportingPeriod, SiteConfiguration},
    EnergyTotals, EvaluationOptions, PeriodTables, RunConfig, SiteData, Tz,
};
use time::Month;

use crate::{
    config::{AppConfig, SiteEntry},
    metrics_export::{SITES_FAILED, SITES_REPORTED},
    report::ReportWriter,
    sources::{Dataset, TelemetrySource},
    transform::clip_to_period,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub reported: usize,
    pub failed: usize,
}

impl RunSummary {
    /// True when there were sites to run and none of them produced a report.
    pub fn all_failed(&self) -> bool {
        self.reported == 0 && self.failed > 0
    }
}

pub struct ReportPipeline<S> {
    pub source: S,
    pub writer: ReportWriter,
    pub channels: ChannelMap,
    pub options: EvaluationOptions,
    pub year: i32,
    pub month: Month,
}

impl<S: TelemetrySource> ReportPipeline<S> {
    pub fn from_config(source: S, cfg: &AppConfig) -> anyhow::Result<Self> {
        let (year, month) = cfg.report.year_month()?;
        Ok(Self {
            source,
            writer: ReportWriter::new(&cfg.report.output_dir, cfg.report.write_json),
            channels: cfg.channel_map()?,
            options: cfg.evaluation.options(),
            year,
            month,
        })
    }

    async fn period_tables(
        &self,
        site_id: &str,
        period: &ReportingPeriod,
        tz: Tz,
    ) -> anyhow::Result<PeriodTables> {
        let trend = self
            .source
            .trend(site_id, period, Dataset::Trend, &self.channels)
            .await
            .with_context(|| format!("trend retrieval for {}", period.label()))?;
        let voltage = self
            .source
            .trend(site_id, period, Dataset::Voltage, &self.channels)
            .await
            .with_context(|| format!("voltage retrieval for {}", period.label()))?;

        let (trend, _) = clip_to_period(trend, period);
        let (voltage, _) = clip_to_period(voltage, period);
        Ok(PeriodTables::from_samples(trend, voltage, tz)?)
    }

    /// Produce one site's report. Any failure aborts this site only.
    pub async fn run_site(&self, entry: &SiteEntry) -> anyhow::Result<PathBuf> {
        let site_id = entry.id.as_str();
        let metadata = self
            .source
            .site_metadata(site_id)
            .await
            .context("site metadata retrieval")?;
        let parameters = self
            .source
            .site_parameters(site_id)
            .await
            .context("site parameter retrieval")?;
        let site = SiteConfiguration::from_parameters(&parameters)?;
        let tz = metadata.time_zone()?;

        let current = entry.period(self.year, self.month)?;
        let config = RunConfig::new(site_id, current, site)?
            .with_channels(self.channels.clone())
            .with_options(self.options);

        let energy = EnergyTotals {
            current: self
                .source
                .energy(site_id, &config.current)
                .await
                .context("energy retrieval for current period")?
                .total_active_energy_consumed,
            previous: self
                .source
                .energy(site_id, &config.previous)
                .await
                .context("energy retrieval for previous period")?
                .total_active_energy_consumed,
        };

        let data = SiteData {
            current: self.period_tables(site_id, &config.current, tz).await?,
            previous: self.period_tables(site_id, &config.previous, tz).await?,
            energy,
        };
        tracing::debug!(
            site_id,
            current_rows = data.current.trend.len(),
            previous_rows = data.previous.trend.len(),
            "site data retrieved"
        );

        let assessment = pq_core::assess_site(&config, &data)?;
        let name = match &entry.label {
            Some(label) => label.clone(),
            None => metadata.display_name(),
        };
        self.writer.write(&name, &assessment).await
    }

    /// Run every site in order. A failed site is logged and counted, and the
    /// run moves on.
    pub async fn run(&self, sites: &[SiteEntry]) -> RunSummary {
        let mut summary = RunSummary::default();
        for entry in sites {
            match self.run_site(entry).await {
                Ok(path) => {
                    summary.reported += 1;
                    metrics::counter!(SITES_REPORTED).increment(1);
                    tracing::info!(
                        site_id = %entry.id,
                        site = entry.name(),
                        path = %path.display(),
                        "site reported"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    metrics::counter!(SITES_FAILED).increment(1);
                    tracing::error!(
                        site_id = %entry.id,
                        site = entry.name(),
                        error = ?e,
                        "site report failed"
                    );
                }
            }
        }
        tracing::info!(
            reported = summary.reported,
            failed = summary.failed,
            "report run finished"
        );
        summary
    }
}
