pub mod config;
pub mod metrics_export;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod sources;
pub mod transform;

#[cfg(test)]
mod testing;

pub use pipeline::{ReportPipeline, RunSummary};
