//! Threshold evaluation over a `TimeSeriesTable`.
//!
//! Every row stands for one elapsed minute. Durations are therefore exact only
//! when sampling is gap-free.

use serde::Serialize;
use time::Duration;

use crate::{
    domain::ReportingPeriod,
    error::Result,
    table::TimeSeriesTable,
};

/// Round half away from zero to two decimals.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Lt => value < threshold,
            Self::Le => value <= threshold,
            Self::Gt => value > threshold,
            Self::Ge => value >= threshold,
        }
    }
}

/// Row condition over one or more columns. Comparisons against a missing
/// value never hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    True,
    False,
    Compare {
        column: String,
        op: Comparison,
        threshold: f64,
    },
    Defined(String),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn compare(column: impl Into<String>, op: Comparison, threshold: f64) -> Self {
        Self::Compare {
            column: column.into(),
            op,
            threshold,
        }
    }

    pub fn lt(column: impl Into<String>, threshold: f64) -> Self {
        Self::compare(column, Comparison::Lt, threshold)
    }

    pub fn le(column: impl Into<String>, threshold: f64) -> Self {
        Self::compare(column, Comparison::Le, threshold)
    }

    pub fn gt(column: impl Into<String>, threshold: f64) -> Self {
        Self::compare(column, Comparison::Gt, threshold)
    }

    pub fn ge(column: impl Into<String>, threshold: f64) -> Self {
        Self::compare(column, Comparison::Ge, threshold)
    }

    pub fn defined(column: impl Into<String>) -> Self {
        Self::Defined(column.into())
    }

    pub fn and(self, other: Predicate) -> Self {
        match self {
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            p => Self::And(vec![p, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        match self {
            Self::Or(mut parts) => {
                parts.push(other);
                Self::Or(parts)
            }
            p => Self::Or(vec![p, other]),
        }
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    fn bind<'t>(&self, table: &'t TimeSeriesTable) -> Result<Bound<'t>> {
        Ok(match self {
            Self::True => Bound::Const(true),
            Self::False => Bound::Const(false),
            Self::Compare {
                column,
                op,
                threshold,
            } => Bound::Compare {
                values: table.column(column)?,
                op: *op,
                threshold: *threshold,
            },
            Self::Defined(column) => Bound::Defined(table.column(column)?),
            Self::And(parts) => Bound::And(
                parts
                    .iter()
                    .map(|p| p.bind(table))
                    .collect::<Result<_>>()?,
            ),
            Self::Or(parts) => Bound::Or(
                parts
                    .iter()
                    .map(|p| p.bind(table))
                    .collect::<Result<_>>()?,
            ),
            Self::Not(inner) => Bound::Not(Box::new(inner.bind(table)?)),
        })
    }
}

/// A predicate with its columns resolved against one table.
enum Bound<'t> {
    Const(bool),
    Compare {
        values: &'t [Option<f64>],
        op: Comparison,
        threshold: f64,
    },
    Defined(&'t [Option<f64>]),
    And(Vec<Bound<'t>>),
    Or(Vec<Bound<'t>>),
    Not(Box<Bound<'t>>),
}

impl Bound<'_> {
    fn matches(&self, row: usize) -> bool {
        match self {
            Self::Const(b) => *b,
            Self::Compare {
                values,
                op,
                threshold,
            } => values[row].is_some_and(|v| op.holds(v, *threshold)),
            Self::Defined(values) => values[row].is_some(),
            Self::And(parts) => parts.iter().all(|p| p.matches(row)),
            Self::Or(parts) => parts.iter().any(|p| p.matches(row)),
            Self::Not(inner) => !inner.matches(row),
        }
    }
}

/// Mean, minimum and maximum over the defined values of a column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    /// `None` when no value is defined.
    pub fn of(values: impl IntoIterator<Item = Option<f64>>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values.into_iter().flatten() {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        (count > 0).then(|| Self {
            count,
            mean: sum / count as f64,
            min,
            max,
        })
    }
}

/// Statistics over a whole column, ignoring missing values.
pub fn column_summary(table: &TimeSeriesTable, column: &str) -> Result<Option<Summary>> {
    Ok(Summary::of(table.column(column)?.iter().copied()))
}

/// How long a condition held within a period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Exposure {
    pub count: usize,
    pub duration: Duration,
    /// Share of the period, rounded to two decimals.
    pub percentage: f64,
}

impl Exposure {
    pub fn from_count(count: usize, period: &ReportingPeriod) -> Self {
        let duration = Duration::minutes(count as i64);
        let percentage =
            round2(100.0 * duration.as_seconds_f64() / period.duration().as_seconds_f64());
        Self {
            count,
            duration,
            percentage,
        }
    }
}

/// Rows of a table that satisfied a predicate, with their exposure in a period.
#[derive(Debug, Clone)]
pub struct Evaluation<'t> {
    table: &'t TimeSeriesTable,
    rows: Vec<usize>,
    exposure: Exposure,
}

impl<'t> Evaluation<'t> {
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn count(&self) -> usize {
        self.exposure.count
    }

    pub fn duration(&self) -> Duration {
        self.exposure.duration
    }

    pub fn percentage(&self) -> f64 {
        self.exposure.percentage
    }

    pub fn exposure(&self) -> Exposure {
        self.exposure
    }

    /// The matching rows as their own table.
    pub fn subset(&self) -> TimeSeriesTable {
        self.table.select_rows(&self.rows)
    }

    /// Statistics of `column` restricted to the matching rows.
    pub fn summary(&self, column: &str) -> Result<Option<Summary>> {
        let values = self.table.column(column)?;
        Ok(Summary::of(self.rows.iter().map(|&i| values[i])))
    }

    pub fn mean(&self, column: &str) -> Result<Option<f64>> {
        Ok(self.summary(column)?.map(|s| s.mean))
    }

    pub fn min(&self, column: &str) -> Result<Option<f64>> {
        Ok(self.summary(column)?.map(|s| s.min))
    }

    pub fn max(&self, column: &str) -> Result<Option<f64>> {
        Ok(self.summary(column)?.map(|s| s.max))
    }
}

pub fn evaluate<'t>(
    table: &'t TimeSeriesTable,
    predicate: &Predicate,
    period: &ReportingPeriod,
) -> Result<Evaluation<'t>> {
    let bound = predicate.bind(table)?;
    let rows: Vec<usize> = (0..table.len()).filter(|&i| bound.matches(i)).collect();
    let exposure = Exposure::from_count(rows.len(), period);
    Ok(Evaluation {
        table,
        rows,
        exposure,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::Channel,
        error::EngineError,
        testing::{period_of_minutes, table_from_fn},
    };
    use time::macros::datetime;

    fn pf_table() -> TimeSeriesTable {
        table_from_fn(
            datetime!(2021-05-01 00:00:00 UTC),
            1440,
            &[Channel::PowerFactor, Channel::L1Current],
            |i, c| match c {
                Channel::PowerFactor if i % 10 == 0 => Some(0.8),
                Channel::PowerFactor if i == 5 => None,
                Channel::PowerFactor => Some(0.95),
                _ => Some(i as f64),
            },
        )
    }

    #[test]
    fn always_false_matches_nothing() {
        let table = pf_table();
        let period = period_of_minutes(datetime!(2021-05-01 00:00:00 UTC), 1440);
        let eval = evaluate(&table, &Predicate::False, &period).unwrap();
        assert_eq!(eval.count(), 0);
        assert_eq!(eval.duration(), Duration::ZERO);
        assert_eq!(eval.percentage(), 0.0);
        assert!(eval.subset().is_empty());
        assert_eq!(eval.mean("power_factor").unwrap(), None);
        assert_eq!(eval.min("power_factor").unwrap(), None);
        assert_eq!(eval.max("power_factor").unwrap(), None);
    }

    #[test]
    fn always_true_covers_the_period() {
        let table = pf_table();
        let period = period_of_minutes(datetime!(2021-05-01 00:00:00 UTC), 1440);
        let eval = evaluate(&table, &Predicate::True, &period).unwrap();
        assert_eq!(eval.count(), table.len());
        assert_eq!(eval.duration(), period.duration());
        assert_eq!(eval.percentage(), 100.0);
        assert_eq!(eval.subset(), table);
    }

    #[test]
    fn comparison_skips_missing_values() {
        let table = pf_table();
        let period = period_of_minutes(datetime!(2021-05-01 00:00:00 UTC), 1440);
        let eval = evaluate(&table, &Predicate::lt("power_factor", 0.9), &period).unwrap();
        assert_eq!(eval.count(), 144);
        assert_eq!(eval.percentage(), 10.0);
        let mean = eval.mean("power_factor").unwrap().unwrap();
        assert!((mean - 0.8).abs() < 1e-9);
        assert_eq!(round2(mean), 0.8);

        let negated = evaluate(
            &table,
            &Predicate::lt("power_factor", 0.9).negate(),
            &period,
        )
        .unwrap();
        assert_eq!(negated.count(), 1440 - 144);
    }

    #[test]
    fn combined_predicates() {
        let table = pf_table();
        let period = period_of_minutes(datetime!(2021-05-01 00:00:00 UTC), 1440);
        let gated = Predicate::lt("power_factor", 0.9).and(Predicate::gt("l1_current", 719.0));
        let eval = evaluate(&table, &gated, &period).unwrap();
        assert_eq!(eval.count(), 72);
        assert_eq!(eval.min("l1_current").unwrap(), Some(720.0));

        let either = Predicate::le("l1_current", 0.0).or(Predicate::ge("l1_current", 1439.0));
        assert_eq!(evaluate(&table, &either, &period).unwrap().rows(), &[0, 1439]);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let table = pf_table();
        let period = period_of_minutes(datetime!(2021-05-01 00:00:00 UTC), 1440);
        assert!(matches!(
            evaluate(&table, &Predicate::defined("tdd"), &period),
            Err(EngineError::MissingColumn(_))
        ));
    }

    #[test]
    fn evaluation_is_repeatable() {
        let table = pf_table();
        let period = period_of_minutes(datetime!(2021-05-01 00:00:00 UTC), 44_640);
        let p = Predicate::lt("power_factor", 0.9);
        let a = evaluate(&table, &p, &period).unwrap();
        let b = evaluate(&table, &p, &period).unwrap();
        assert_eq!(a.rows(), b.rows());
        assert_eq!(a.exposure(), b.exposure());
        assert_eq!(a.percentage(), 0.32);
    }

    #[test]
    fn round2_rounds_half_away_from_zero() {
        assert_eq!(round2(2.345_000_1), 2.35);
        assert_eq!(round2(-2.5), -2.5);
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
    }
}
