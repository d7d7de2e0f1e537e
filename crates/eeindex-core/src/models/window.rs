use chrono::{DateTime, Datelike, Duration, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{IndexerError, Result};

/// Half-open time interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window, rejecting `start > end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(IndexerError::config(
                "time",
                format!("window start {} is after its end {}", fmt_instant(start), fmt_instant(end)),
            ));
        }
        Ok(Self { start, end })
    }

    /// `[since, max(now, since))`, the window covered by a rolling update
    pub fn since(since: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            start: since,
            end: now.max(since),
        }
    }

    /// Parse a user-supplied period or interval.
    ///
    /// A single period (`2020`, `2020-01`, `2020-01-15`) covers that whole
    /// year, month, or day. An interval `A/B` runs from the start of `A` to
    /// the start of `B`; each side may be a period or an RFC 3339 instant.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if let Some((from, to)) = input.split_once('/') {
            let (from, to) = (from.trim(), to.trim());
            if from.is_empty() || to.is_empty() {
                return Err(IndexerError::config(
                    "time",
                    format!("'{}' has a missing bound; both start and end are required", input),
                ));
            }
            let (start, _) = parse_period(from)?;
            let (end, _) = parse_period(to)?;
            return Self::new(start, end);
        }

        let (start, end) = parse_period(input)?;
        if start == end {
            return Err(IndexerError::config(
                "time",
                format!("'{}' is a single instant, not a window", input),
            ));
        }
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Split into one sub-window per calendar year, in ascending order.
    /// An empty window yields no sub-windows.
    pub fn split_by_year(&self) -> Vec<TimeWindow> {
        let mut windows = Vec::new();
        let mut cursor = self.start;

        while cursor < self.end {
            let boundary = match start_of_year(cursor.year() + 1) {
                Some(boundary) => boundary.min(self.end),
                None => self.end,
            };
            windows.push(TimeWindow {
                start: cursor,
                end: boundary,
            });
            cursor = boundary;
        }

        windows
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", fmt_instant(self.start), fmt_instant(self.end))
    }
}

/// RFC 3339 with a `Z` suffix, the form catalog query strings expect
pub fn fmt_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn start_of_year(year: i32) -> Option<DateTime<Utc>> {
    start_of_day(year, 1, 1)
}

fn start_of_day(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Returns the start and end of the period named by `text`; an instant has start == end
fn parse_period(text: &str) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let invalid = || {
        IndexerError::config(
            "time",
            format!("'{}' is not a year, month, date, or RFC 3339 timestamp", text),
        )
    };

    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        let instant = instant.with_timezone(&Utc);
        return Ok((instant, instant));
    }

    let parts: Vec<&str> = text.split('-').collect();
    let numbers: Vec<u32> = parts
        .iter()
        .map(|part| part.parse::<u32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| invalid())?;

    match numbers.as_slice() {
        [year] if parts[0].len() == 4 => {
            let year = *year as i32;
            let start = start_of_year(year).ok_or_else(invalid)?;
            let end = start_of_year(year + 1).ok_or_else(invalid)?;
            Ok((start, end))
        }
        [year, month] if parts[0].len() == 4 => {
            let year = *year as i32;
            let start = start_of_day(year, *month, 1).ok_or_else(invalid)?;
            let end = if *month == 12 {
                start_of_year(year + 1)
            } else {
                start_of_day(year, month + 1, 1)
            }
            .ok_or_else(invalid)?;
            Ok((start, end))
        }
        [year, month, day] if parts[0].len() == 4 => {
            let start = start_of_day(*year as i32, *month, *day).ok_or_else(invalid)?;
            Ok((start, start + Duration::days(1)))
        }
        _ => Err(invalid()),
    }
}
