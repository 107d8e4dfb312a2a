use serde::{Deserialize, Serialize};

use crate::{
    domain::{Classification, Dimension, Finding, FindingDetails},
    error::{EngineError, Result},
    evaluate::round2,
};

/// Largest month-over-month change, in percent, still considered minor.
pub const MINOR_CHANGE_PCT: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyTrend {
    MinorIncrease,
    Reduction,
    ExcessiveIncrease,
}

impl EnergyTrend {
    fn phrase(self) -> &'static str {
        match self {
            Self::MinorIncrease => "a minor increase",
            Self::Reduction => "a reduction",
            Self::ExcessiveIncrease => "an excessive increase",
        }
    }

    fn recommendation(self) -> Option<&'static str> {
        match self {
            Self::MinorIncrease => Some("No action."),
            Self::Reduction => None,
            Self::ExcessiveIncrease => Some("Investigate increase in energy consumption."),
        }
    }
}

/// How the energy trend is picked from the month-over-month change.
///
/// `Legacy` branches on the rounded magnitude, so any drop larger than the
/// minor band reads as an excessive increase. `Signed` branches on the signed
/// change and reports reductions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyBranching {
    #[default]
    Legacy,
    Signed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerStats {
    pub this_period_energy: f64,
    pub previous_period_energy: f64,
    /// Signed, unrounded change in percent.
    pub delta_pct: f64,
    /// `|delta_pct|` rounded to two decimals.
    pub magnitude_pct: f64,
    pub trend: EnergyTrend,
    pub branching: EnergyBranching,
}

pub fn classify(delta_pct: f64, branching: EnergyBranching) -> EnergyTrend {
    match branching {
        EnergyBranching::Legacy => {
            let magnitude = round2(delta_pct.abs());
            if magnitude <= MINOR_CHANGE_PCT {
                EnergyTrend::MinorIncrease
            } else {
                EnergyTrend::ExcessiveIncrease
            }
        }
        EnergyBranching::Signed => {
            // Sign from the raw change, band from the rounded magnitude.
            if delta_pct < 0.0 {
                EnergyTrend::Reduction
            } else if round2(delta_pct.abs()) <= MINOR_CHANGE_PCT {
                EnergyTrend::MinorIncrease
            } else {
                EnergyTrend::ExcessiveIncrease
            }
        }
    }
}

/// Compare active energy consumed this period against the previous one.
pub fn assess(
    this_period: f64,
    previous_period: f64,
    branching: EnergyBranching,
) -> Result<Finding> {
    if !this_period.is_finite() {
        return Err(EngineError::MissingValue(
            "active energy for this period".to_string(),
        ));
    }
    if !previous_period.is_finite() || previous_period == 0.0 {
        return Err(EngineError::MissingValue(
            "active energy for the previous period".to_string(),
        ));
    }

    let delta_pct = 100.0 * (this_period - previous_period) / previous_period;
    let magnitude_pct = round2(delta_pct.abs());
    let trend = classify(delta_pct, branching);

    let classification = if trend == EnergyTrend::ExcessiveIncrease {
        Classification::Fail
    } else {
        Classification::Pass
    };
    let conclusion = format!(
        "This measurement point had {} in power consumption of {magnitude_pct:.2}% from the previous month.",
        trend.phrase()
    );

    let stats = PowerStats {
        this_period_energy: this_period,
        previous_period_energy: previous_period,
        delta_pct,
        magnitude_pct,
        trend,
        branching,
    };
    Ok(Finding::new(
        Dimension::Power,
        classification,
        FindingDetails::Power(stats),
        vec![conclusion],
    )
    .with_recommendation(trend.recommendation().map(str::to_string)))
}
