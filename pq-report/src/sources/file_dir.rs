use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use pq_core::{
    domain::{ChannelMap, EnergySummary, ReportingPeriod, SiteMetadata, SiteParameters},
    table::RawSamples,
};
use serde::de::DeserializeOwned;

use super::{csv_trend::parse_trend_csv, Dataset, SourceError, TelemetrySource};

/// Offline source reading exports saved under one directory per site:
///
/// ```text
/// {root}/{site}/site.json
/// {root}/{site}/parameters.json
/// {root}/{site}/energy_YYYY-MM.json
/// {root}/{site}/trend_YYYY-MM.csv
/// {root}/{site}/voltage_YYYY-MM.csv
/// ```
///
/// Period files are keyed by the month the period starts in.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn site_file(&self, site_id: &str, name: &str) -> PathBuf {
        self.root.join(site_id).join(name)
    }

    async fn read(&self, path: &Path) -> Result<String, SourceError> {
        metrics::counter!(crate::metrics_export::SOURCE_REQUESTS).increment(1);
        match tokio::fs::read_to_string(path).await {
            Ok(s) => Ok(s),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                metrics::counter!(crate::metrics_export::SOURCE_REQUEST_FAILURES).increment(1);
                Err(SourceError::NoData(format!("{} does not exist", path.display())))
            }
            Err(source) => {
                metrics::counter!(crate::metrics_export::SOURCE_REQUEST_FAILURES).increment(1);
                Err(SourceError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T, SourceError> {
        let contents = self.read(path).await?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[async_trait::async_trait]
impl TelemetrySource for DirectorySource {
    async fn site_metadata(&self, site_id: &str) -> Result<SiteMetadata, SourceError> {
        self.read_json(&self.site_file(site_id, "site.json")).await
    }

    async fn site_parameters(&self, site_id: &str) -> Result<SiteParameters, SourceError> {
        self.read_json(&self.site_file(site_id, "parameters.json"))
            .await
    }

    async fn energy(
        &self,
        site_id: &str,
        period: &ReportingPeriod,
    ) -> Result<EnergySummary, SourceError> {
        let name = format!("energy_{}.json", period.month_key());
        self.read_json(&self.site_file(site_id, &name)).await
    }

    async fn trend(
        &self,
        site_id: &str,
        period: &ReportingPeriod,
        dataset: Dataset,
        channels: &ChannelMap,
    ) -> Result<RawSamples, SourceError> {
        let name = format!("{}_{}.csv", dataset.name(), period.month_key());
        let contents = self.read(&self.site_file(site_id, &name)).await?;
        parse_trend_csv(&contents, dataset.channels(), channels)
    }
}
