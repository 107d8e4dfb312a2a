//! Prometheus text snapshot for batch runs, written once at the end of a run
//! for a node-exporter textfile collector.

use std::path::Path;

use anyhow::Context;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const SITES_REPORTED: &str = "pq_sites_reported_total";
pub const SITES_FAILED: &str = "pq_sites_failed_total";
pub const SOURCE_REQUESTS: &str = "pq_source_requests_total";
pub const SOURCE_REQUEST_FAILURES: &str = "pq_source_request_failures_total";
pub const SAMPLES_OUT_OF_PERIOD: &str = "pq_samples_out_of_period_total";

pub fn install() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus metrics recorder")
}

/// Write the current rendering atomically: to a sibling temp file, then rename.
pub async fn write_textfile(handle: &PrometheusHandle, path: &Path) -> anyhow::Result<()> {
    let tmp = path.with_extension("prom.tmp");
    tokio::fs::write(&tmp, handle.render())
        .await
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to move metrics snapshot to {}", path.display()))?;
    tracing::info!(path = %path.display(), "metrics snapshot written");
    Ok(())
}
