//! Time-indexed sample table.
//!
//! One row per sample minute, one column per channel, plus the weekday of the
//! row's local timestamp. Columns are only ever appended.

pub mod derive;

use chrono_tz::Tz;
use time::{OffsetDateTime, Weekday};
use tracing::debug;

use crate::{
    domain::{localize, Channel},
    error::{EngineError, Result},
};

pub const WEEKDAY_COLUMN: &str = "weekday";

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
    Weekday::Saturday,
    Weekday::Sunday,
];

/// One retrieved row: a timestamp and one value per requested channel.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub ts: OffsetDateTime,
    pub values: Vec<Option<f64>>,
}

/// Samples as they come back from retrieval, before localization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSamples {
    pub channels: Vec<Channel>,
    pub rows: Vec<RawRow>,
}

impl RawSamples {
    pub fn new(channels: Vec<Channel>) -> Self {
        Self {
            channels,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, ts: OffsetDateTime, values: Vec<Option<f64>>) {
        self.rows.push(RawRow { ts, values });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Column {
    name: String,
    values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    timestamps: Vec<OffsetDateTime>,
    weekdays: Vec<Weekday>,
    columns: Vec<Column>,
}

impl TimeSeriesTable {
    /// Build a table from retrieved samples, localizing timestamps to `tz`.
    ///
    /// Rows must be non-decreasing in time; repeated timestamps are collapsed
    /// to their first occurrence. Non-finite values become missing.
    pub fn from_samples(samples: RawSamples, tz: Tz) -> Result<Self> {
        if samples.rows.is_empty() {
            return Err(EngineError::NoData("time-series samples".to_string()));
        }

        let width = samples.channels.len();
        let capacity = samples.rows.len();
        let mut columns: Vec<Column> = Vec::with_capacity(width);
        for channel in &samples.channels {
            if columns.iter().any(|c| c.name == channel.column()) {
                return Err(EngineError::DuplicateColumn(channel.column().to_string()));
            }
            columns.push(Column {
                name: channel.column().to_string(),
                values: Vec::with_capacity(capacity),
            });
        }

        let mut timestamps = Vec::with_capacity(capacity);
        let mut weekdays = Vec::with_capacity(capacity);
        let mut duplicates = 0usize;
        let mut last: Option<OffsetDateTime> = None;

        for (row, raw) in samples.rows.into_iter().enumerate() {
            if raw.values.len() != width {
                return Err(EngineError::RowShape {
                    row,
                    got: raw.values.len(),
                    expected: width,
                });
            }
            if let Some(prev) = last {
                if raw.ts < prev {
                    return Err(EngineError::UnorderedSamples { row, ts: raw.ts });
                }
                if raw.ts == prev {
                    duplicates += 1;
                    continue;
                }
            }
            last = Some(raw.ts);

            let local = localize(raw.ts, tz)?;
            timestamps.push(local);
            weekdays.push(local.weekday());
            for (column, value) in columns.iter_mut().zip(raw.values) {
                column.values.push(value.filter(|v| v.is_finite()));
            }
        }

        debug!(
            rows = timestamps.len(),
            duplicates,
            channels = width,
            "time-series table constructed"
        );

        Ok(Self {
            timestamps,
            weekdays,
            columns,
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[OffsetDateTime] {
        &self.timestamps
    }

    pub fn weekdays(&self) -> &[Weekday] {
        &self.weekdays
    }

    /// Column names in insertion order, followed by the weekday label.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .chain(std::iter::once(WEEKDAY_COLUMN))
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Result<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| EngineError::MissingColumn(name.to_string()))
    }

    pub fn channel(&self, channel: Channel) -> Result<&[Option<f64>]> {
        self.column(channel.column())
    }

    /// Append a column. Existing columns are never replaced.
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<Self> {
        let name = name.into();
        if name == WEEKDAY_COLUMN || self.has_column(&name) {
            return Err(EngineError::DuplicateColumn(name));
        }
        if values.len() != self.len() {
            return Err(EngineError::RowShape {
                row: 0,
                got: values.len(),
                expected: self.len(),
            });
        }
        self.columns.push(Column { name, values });
        Ok(self)
    }

    /// A new table holding only `rows`, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            timestamps: rows.iter().map(|&i| self.timestamps[i]).collect(),
            weekdays: rows.iter().map(|&i| self.weekdays[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: rows.iter().map(|&i| c.values[i]).collect(),
                })
                .collect(),
        }
    }

    pub fn weekday_partition(&self, day: Weekday) -> Self {
        let rows: Vec<usize> = self
            .weekdays
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == day)
            .map(|(i, _)| i)
            .collect();
        self.select_rows(&rows)
    }

    pub fn partition_by_weekday(&self) -> Vec<(Weekday, Self)> {
        WEEKDAYS
            .iter()
            .map(|&day| (day, self.weekday_partition(day)))
            .collect()
    }
}
