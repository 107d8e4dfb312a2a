//! Power-quality assessment engine.
//!
//! Turns per-minute meter samples into threshold statistics and findings for
//! power, power factor, voltage fluctuation, unbalance, harmonics and ground
//! current. Pure and synchronous; retrieval and presentation live elsewhere.

pub mod compare;
pub mod dimensions;
pub mod domain;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod table;

#[cfg(test)]
mod testing;

pub use chrono_tz::Tz;
pub use engine::{
    assess_site, DimensionAssessment, EnergyTotals, EvaluationOptions, PeriodTables,
    PowerFactorGate, RunConfig, SiteAssessment, SiteData,
};
pub use error::{EngineError, Result};
