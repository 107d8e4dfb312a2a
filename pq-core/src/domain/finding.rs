use serde::Serialize;

use crate::{
    compare::{ComparisonTrend, PeriodComparison},
    dimensions::{
        ground_current::GroundCurrentStats, harmonics::HarmonicsStats, power::PowerStats,
        power_factor::PowerFactorStats, unbalance::UnbalanceStats, voltage::VoltageStats,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Power,
    PowerFactor,
    VoltageFluctuation,
    Unbalance,
    Harmonics,
    GroundCurrent,
}

impl Dimension {
    /// Order in which findings are emitted and reported.
    pub const REPORT_ORDER: [Dimension; 6] = [
        Self::Power,
        Self::PowerFactor,
        Self::VoltageFluctuation,
        Self::Unbalance,
        Self::Harmonics,
        Self::GroundCurrent,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Power => "POWER",
            Self::PowerFactor => "POWER FACTOR",
            Self::VoltageFluctuation => "VOLTAGE FLUCTUATION",
            Self::Unbalance => "UNBALANCE",
            Self::Harmonics => "HARMONICS",
            Self::GroundCurrent => "GROUND CURRENT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Pass,
    Fail,
    Degraded,
}

/// Outcome of a single threshold rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    WithinTolerance,
    Exceeded,
}

impl Verdict {
    pub fn exceeded_if(cond: bool) -> Self {
        if cond {
            Self::Exceeded
        } else {
            Self::WithinTolerance
        }
    }

    pub fn is_exceeded(self) -> bool {
        self == Self::Exceeded
    }
}

impl Classification {
    /// `Fail` as soon as one rule is exceeded.
    pub fn from_verdicts(verdicts: impl IntoIterator<Item = Verdict>) -> Self {
        if verdicts.into_iter().any(Verdict::is_exceeded) {
            Self::Fail
        } else {
            Self::Pass
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingDetails {
    Power(PowerStats),
    PowerFactor(PowerFactorStats),
    Voltage(VoltageStats),
    Unbalance(UnbalanceStats),
    Harmonics(HarmonicsStats),
    GroundCurrent(GroundCurrentStats),
}

/// Result of assessing one dimension over one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub dimension: Dimension,
    pub classification: Classification,
    pub details: FindingDetails,
    pub conclusions: Vec<String>,
    pub recommendation: Option<String>,
    pub comparison: Option<PeriodComparison>,
}

impl Finding {
    pub fn new(
        dimension: Dimension,
        classification: Classification,
        details: FindingDetails,
        conclusions: Vec<String>,
    ) -> Self {
        Self {
            dimension,
            classification,
            details,
            conclusions,
            recommendation: None,
            comparison: None,
        }
    }

    pub fn with_recommendation(mut self, recommendation: Option<String>) -> Self {
        self.recommendation = recommendation;
        self
    }

    /// Layer a period comparison on top of this finding. A passing finding
    /// whose comparison degraded becomes `Degraded`.
    pub fn with_comparison(mut self, comparison: PeriodComparison) -> Self {
        if comparison.trend == ComparisonTrend::Degraded
            && self.classification == Classification::Pass
        {
            self.classification = Classification::Degraded;
        }
        self.recommendation = Some(comparison.recommendation.clone());
        self.comparison = Some(comparison);
        self
    }

    pub fn power_factor(&self) -> Option<&PowerFactorStats> {
        match &self.details {
            FindingDetails::PowerFactor(s) => Some(s),
            _ => None,
        }
    }
}
