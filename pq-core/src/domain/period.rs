use chrono::{Offset, TimeZone};
use chrono_tz::Tz;
use serde::Serialize;
use time::{Date, Duration, Month, OffsetDateTime, UtcOffset};

use crate::error::{EngineError, Result};

/// A half-open reporting window `[start, end)`.
///
/// `start` and `end` carry the fixed query offset they were built with; the
/// site's own time zone only applies to sample timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportingPeriod {
    #[serde(with = "time::serde::rfc3339")]
    start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    end: OffsetDateTime,
}

impl ReportingPeriod {
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Result<Self> {
        if end <= start {
            return Err(EngineError::InvalidPeriod(format!(
                "end {end} is not after start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The calendar month starting at local midnight for the given query offset.
    pub fn calendar_month(year: i32, month: Month, offset: UtcOffset) -> Result<Self> {
        let first = Date::from_calendar_date(year, month, 1)
            .map_err(|e| EngineError::InvalidPeriod(e.to_string()))?;
        let (next_year, next_month) = match month {
            Month::December => (year + 1, Month::January),
            m => (year, m.next()),
        };
        let next_first = Date::from_calendar_date(next_year, next_month, 1)
            .map_err(|e| EngineError::InvalidPeriod(e.to_string()))?;

        Self::new(
            first.midnight().assume_offset(offset),
            next_first.midnight().assume_offset(offset),
        )
    }

    /// The window ending where this one starts, spanning the calendar length
    /// of the month preceding `start`.
    pub fn previous(&self) -> Result<Self> {
        let month = self.start.month();
        let (year, prev_month) = match month {
            Month::January => (self.start.year() - 1, Month::December),
            m => (self.start.year(), m.previous()),
        };
        let days = time::util::days_in_year_month(year, prev_month);
        Self::new(self.start - Duration::days(i64::from(days)), self.start)
    }

    pub fn start(&self) -> OffsetDateTime {
        self.start
    }

    pub fn end(&self) -> OffsetDateTime {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, ts: OffsetDateTime) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Human label such as "May 2021".
    pub fn label(&self) -> String {
        format!("{} {}", self.start.month(), self.start.year())
    }

    /// Sortable key such as "2021-05".
    pub fn month_key(&self) -> String {
        format!("{:04}-{:02}", self.start.year(), u8::from(self.start.month()))
    }
}

pub fn parse_time_zone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| EngineError::UnknownTimeZone(name.to_string()))
}

/// Re-express an instant in the wall-clock offset `tz` observes at that instant.
pub fn localize(ts: OffsetDateTime, tz: Tz) -> Result<OffsetDateTime> {
    let utc = chrono::DateTime::from_timestamp(ts.unix_timestamp(), ts.nanosecond())
        .ok_or(EngineError::TimestampOutOfRange(ts))?;
    let seconds = tz
        .offset_from_utc_datetime(&utc.naive_utc())
        .fix()
        .local_minus_utc();
    let offset =
        UtcOffset::from_whole_seconds(seconds).map_err(|_| EngineError::TimestampOutOfRange(ts))?;
    Ok(ts.to_offset(offset))
}
