//! Retrieval of site data: metadata, parameters, energy totals and one-minute
//! trend samples.

pub mod csv_trend;
pub mod file_dir;
pub mod http_api;

pub use file_dir::DirectorySource;
pub use http_api::HttpApiSource;

use std::path::PathBuf;

use pq_core::{
    domain::{
        Channel, ChannelMap, EnergySummary, ReportingPeriod, SiteMetadata, SiteParameters,
        TREND_CHANNELS, VOLTAGE_CHANNELS,
    },
    table::RawSamples,
};

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },
    #[error("csv error: {0}")]
    Csv(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("timestamp formatting failed: {0}")]
    Format(#[from] time::error::Format),
    #[error("no data: {0}")]
    NoData(String),
}

/// The two trend requests made per period. Kept apart so no single request
/// asks for too many columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Trend,
    Voltage,
}

impl Dataset {
    pub fn channels(self) -> &'static [Channel] {
        match self {
            Self::Trend => &TREND_CHANNELS,
            Self::Voltage => &VOLTAGE_CHANNELS,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Trend => "trend",
            Self::Voltage => "voltage",
        }
    }
}

#[async_trait::async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn site_metadata(&self, site_id: &str) -> Result<SiteMetadata, SourceError>;

    async fn site_parameters(&self, site_id: &str) -> Result<SiteParameters, SourceError>;

    async fn energy(
        &self,
        site_id: &str,
        period: &ReportingPeriod,
    ) -> Result<EnergySummary, SourceError>;

    async fn trend(
        &self,
        site_id: &str,
        period: &ReportingPeriod,
        dataset: Dataset,
        channels: &ChannelMap,
    ) -> Result<RawSamples, SourceError>;
}
