//! Whole-site assessment: derive columns, run every dimension over both
//! periods and layer the period comparison.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    compare::compare_power_factor,
    dimensions::{
        ground_current, harmonics,
        power::{self, EnergyBranching},
        power_factor, unbalance, voltage,
    },
    domain::{ChannelMap, Dimension, Finding, ReportingPeriod, SiteConfiguration},
    error::{EngineError, Result},
    table::{
        derive::{with_differences, with_fluctuation},
        RawSamples, TimeSeriesTable,
    },
};

/// Whether low-PF minutes only count while every line carries load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerFactorGate {
    pub current_period: bool,
    pub previous_period: bool,
}

impl Default for PowerFactorGate {
    fn default() -> Self {
        Self {
            current_period: false,
            previous_period: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationOptions {
    pub power_factor_gate: PowerFactorGate,
    pub energy_branching: EnergyBranching,
}

/// Everything one site run needs besides the data itself.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub site_id: String,
    pub current: ReportingPeriod,
    pub previous: ReportingPeriod,
    pub channels: ChannelMap,
    pub site: SiteConfiguration,
    pub options: EvaluationOptions,
}

impl RunConfig {
    /// The previous period is derived from `current`.
    pub fn new(
        site_id: impl Into<String>,
        current: ReportingPeriod,
        site: SiteConfiguration,
    ) -> Result<Self> {
        Ok(Self {
            site_id: site_id.into(),
            previous: current.previous()?,
            current,
            channels: ChannelMap::default(),
            site,
            options: EvaluationOptions::default(),
        })
    }

    pub fn with_channels(mut self, channels: ChannelMap) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_options(mut self, options: EvaluationOptions) -> Self {
        self.options = options;
        self
    }
}

/// The two datasets retrieved for one period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodTables {
    pub trend: TimeSeriesTable,
    pub voltage: TimeSeriesTable,
}

impl PeriodTables {
    pub fn from_samples(trend: RawSamples, voltage: RawSamples, tz: Tz) -> Result<Self> {
        Ok(Self {
            trend: TimeSeriesTable::from_samples(trend, tz)?,
            voltage: TimeSeriesTable::from_samples(voltage, tz)?,
        })
    }
}

/// Active energy consumed in each period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyTotals {
    pub current: f64,
    pub previous: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteData {
    pub current: PeriodTables,
    pub previous: PeriodTables,
    pub energy: EnergyTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionAssessment {
    pub current: Finding,
    /// Kept for reference; power has none since it already compares periods.
    pub previous: Option<Finding>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteAssessment {
    pub site_id: String,
    pub current_period: ReportingPeriod,
    pub previous_period: ReportingPeriod,
    pub site: SiteConfiguration,
    /// In report order.
    pub dimensions: Vec<DimensionAssessment>,
}

impl SiteAssessment {
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.dimensions.iter().map(|d| &d.current)
    }

    pub fn dimension(&self, dimension: Dimension) -> Option<&DimensionAssessment> {
        self.dimensions
            .iter()
            .find(|d| d.current.dimension == dimension)
    }
}

/// Single-period findings for the table-based dimensions, in report order.
struct PeriodFindings {
    power_factor: Finding,
    voltage: Finding,
    unbalance: Finding,
    harmonics: Finding,
    ground_current: Finding,
}

fn assess_period(
    tables: &PeriodTables,
    period: &ReportingPeriod,
    site: &SiteConfiguration,
    apply_current_gate: bool,
) -> Result<PeriodFindings> {
    let trend = with_differences(&tables.trend)?;
    let voltage_table = with_fluctuation(
        &with_differences(&tables.voltage)?,
        site.nominal_phase_to_neutral,
    )?;

    Ok(PeriodFindings {
        power_factor: power_factor::assess(&trend, period, apply_current_gate)?,
        voltage: voltage::assess(&voltage_table, period, site.nominal_phase_to_neutral)?,
        unbalance: unbalance::assess(&trend, period)?,
        harmonics: harmonics::assess(&trend, period)?,
        ground_current: ground_current::assess(&trend, period)?,
    })
}

/// Assess one site over its current and previous periods.
pub fn assess_site(config: &RunConfig, data: &SiteData) -> Result<SiteAssessment> {
    let gate = config.options.power_factor_gate;
    let power = power::assess(
        data.energy.current,
        data.energy.previous,
        config.options.energy_branching,
    )?;
    let current = assess_period(
        &data.current,
        &config.current,
        &config.site,
        gate.current_period,
    )?;
    let previous = assess_period(
        &data.previous,
        &config.previous,
        &config.site,
        gate.previous_period,
    )?;

    let comparison = match (
        current.power_factor.power_factor(),
        previous.power_factor.power_factor(),
    ) {
        (Some(cur), Some(prev)) => compare_power_factor(cur, prev),
        _ => {
            return Err(EngineError::MissingValue(
                "power factor statistics".to_string(),
            ))
        }
    };

    debug!(
        site_id = %config.site_id,
        current_rows = data.current.trend.len(),
        previous_rows = data.previous.trend.len(),
        pf_delta = comparison.delta_pct_points,
        "site assessed"
    );

    let dimensions = vec![
        DimensionAssessment {
            current: power,
            previous: None,
        },
        DimensionAssessment {
            current: current.power_factor.with_comparison(comparison),
            previous: Some(previous.power_factor),
        },
        DimensionAssessment {
            current: current.voltage,
            previous: Some(previous.voltage),
        },
        DimensionAssessment {
            current: current.unbalance,
            previous: Some(previous.unbalance),
        },
        DimensionAssessment {
            current: current.harmonics,
            previous: Some(previous.harmonics),
        },
        DimensionAssessment {
            current: current.ground_current,
            previous: Some(previous.ground_current),
        },
    ];

    Ok(SiteAssessment {
        site_id: config.site_id.clone(),
        current_period: config.current,
        previous_period: config.previous,
        site: config.site.clone(),
        dimensions,
    })
}
