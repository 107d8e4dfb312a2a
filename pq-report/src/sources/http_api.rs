use std::time::Duration;

use pq_core::{
    domain::{ChannelMap, EnergySummary, ReportingPeriod, SiteMetadata, SiteParameters},
    table::RawSamples,
};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use time::{format_description::well_known::Rfc3339, UtcOffset};

use super::{csv_trend::parse_trend_csv, Dataset, SourceError, TelemetrySource};
use crate::metrics_export::{SOURCE_REQUESTS, SOURCE_REQUEST_FAILURES};

/// Body of a one-minute trend export request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrendRequest {
    start_time: String,
    end_time: String,
    table: &'static str,
    interval: u32,
    period: &'static str,
    output: &'static str,
    write_to_file: bool,
    columns: Vec<String>,
}

fn utc_string(ts: time::OffsetDateTime) -> Result<String, SourceError> {
    Ok(ts.to_offset(UtcOffset::UTC).format(&Rfc3339)?)
}

/// Client for the monitoring REST API.
pub struct HttpApiSource {
    client: Client,
    base_url: String,
    authorization: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl HttpApiSource {
    /// `authorization` is sent verbatim as the `authorization` header.
    pub fn new(
        base_url: impl Into<String>,
        authorization: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
        retry_backoff: Duration,
    ) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            authorization: authorization.into(),
            max_retries,
            retry_backoff,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send with linear backoff on transport errors and 5xx responses. Any
    /// other non-200 status fails at once.
    async fn send<F>(&self, endpoint: &str, build: F) -> Result<Response, SourceError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut attempt: u32 = 0;
        loop {
            metrics::counter!(SOURCE_REQUESTS).increment(1);
            let err = match build()
                .header(header::AUTHORIZATION, &self.authorization)
                .send()
                .await
            {
                Ok(resp) if resp.status() == StatusCode::OK => return Ok(resp),
                Ok(resp) => SourceError::Status {
                    endpoint: endpoint.to_string(),
                    status: resp.status().as_u16(),
                },
                Err(e) => SourceError::Http(e),
            };

            let retryable = match &err {
                SourceError::Status { status, .. } => *status >= 500,
                SourceError::Http(_) => true,
                _ => false,
            };
            if retryable && attempt < self.max_retries {
                attempt += 1;
                tracing::warn!(
                    error = %err,
                    endpoint,
                    attempt,
                    "monitoring API request failed, retrying with backoff"
                );
                tokio::time::sleep(self.retry_backoff * attempt).await;
                continue;
            }

            tracing::error!(error = %err, endpoint, "monitoring API request failed, giving up");
            metrics::counter!(SOURCE_REQUEST_FAILURES).increment(1);
            return Err(err);
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = self.url(endpoint);
        let resp = self
            .send(endpoint, || self.client.get(&url).query(query))
            .await?;
        let body = resp.text().await?;
        if body.trim().is_empty() || body.trim() == "null" {
            return Err(SourceError::NoData(format!("{endpoint} returned an empty body")));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait::async_trait]
impl TelemetrySource for HttpApiSource {
    async fn site_metadata(&self, site_id: &str) -> Result<SiteMetadata, SourceError> {
        self.get_json(&format!("measurementPoint/{site_id}"), &[])
            .await
    }

    async fn site_parameters(&self, site_id: &str) -> Result<SiteParameters, SourceError> {
        self.get_json(&format!("parameters/{site_id}"), &[]).await
    }

    async fn energy(
        &self,
        site_id: &str,
        period: &ReportingPeriod,
    ) -> Result<EnergySummary, SourceError> {
        let query = [
            ("dateRangeStart", utc_string(period.start())?),
            ("dateRangeEnd", utc_string(period.end())?),
        ];
        self.get_json(&format!("energy/measurementPoint/{site_id}"), &query)
            .await
    }

    async fn trend(
        &self,
        site_id: &str,
        period: &ReportingPeriod,
        dataset: Dataset,
        channels: &ChannelMap,
    ) -> Result<RawSamples, SourceError> {
        let endpoint = format!("trends/measurementPoint/{site_id}");
        let url = self.url(&endpoint);
        let body = TrendRequest {
            start_time: utc_string(period.start())?,
            end_time: utc_string(period.end())?,
            table: "oneminute",
            interval: 1,
            period: "minute",
            output: "csv",
            write_to_file: false,
            columns: channels.remote_ids(dataset.channels()),
        };

        let resp = self
            .send(&endpoint, || {
                self.client
                    .post(&url)
                    .header(header::ACCEPT, "text/csv")
                    .json(&body)
            })
            .await?;
        let text = resp.text().await?;
        let samples = parse_trend_csv(&text, dataset.channels(), channels)?;
        tracing::debug!(
            site_id,
            dataset = dataset.name(),
            rows = samples.len(),
            "trend export received"
        );
        Ok(samples)
    }
}
