use std::time::Duration;

use anyhow::{bail, Context, Result};
use pq_report::{
    config::AppConfig, metrics_export, observability, pipeline::ReportPipeline,
    sources::HttpApiSource,
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    // Only batch snapshots: the recorder is rendered once when the run ends.
    let metrics = match &cfg.metrics {
        Some(_) => Some(metrics_export::install()?),
        None => None,
    };

    let Some(api) = &cfg.api else {
        bail!("[api] section is required to run against the monitoring API");
    };
    let source = HttpApiSource::new(
        api.base_url.clone(),
        api.auth_token()?,
        Duration::from_secs(api.timeout_secs),
        api.max_retries,
        Duration::from_millis(api.retry_backoff_ms),
    )
    .context("failed to build monitoring API client")?;

    let pipeline = ReportPipeline::from_config(source, &cfg)?;
    let summary = pipeline.run(&cfg.sites).await;

    if let (Some(handle), Some(metrics_cfg)) = (&metrics, &cfg.metrics) {
        metrics_export::write_textfile(handle, &metrics_cfg.textfile_path).await?;
    }

    if summary.all_failed() {
        bail!("all {} sites failed", summary.failed);
    }
    Ok(())
}
