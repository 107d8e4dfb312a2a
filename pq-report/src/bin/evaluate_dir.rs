use anyhow::{bail, Result};
use pq_report::{
    config::AppConfig, metrics_export, observability, pipeline::ReportPipeline,
    sources::DirectorySource,
};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: pq-evaluate-dir <dir>");
    }
    let dir = &args[1];

    // The [api] section is ignored; sites and report settings still come from config.
    let cfg = AppConfig::load()?;

    let metrics = match &cfg.metrics {
        Some(_) => Some(metrics_export::install()?),
        None => None,
    };

    let pipeline = ReportPipeline::from_config(DirectorySource::new(dir), &cfg)?;
    let summary = pipeline.run(&cfg.sites).await;

    if let (Some(handle), Some(metrics_cfg)) = (&metrics, &cfg.metrics) {
        metrics_export::write_textfile(handle, &metrics_cfg.textfile_path).await?;
    }

    if summary.all_failed() {
        bail!("all {} sites failed", summary.failed);
    }
    Ok(())
}
