use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::fmt;
use thiserror::Error;

/// Format of `@timestamp` values reported by the query service (always UTC).
pub const SERVICE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("failed to parse timestamp '{value}' with format '{format}': {source}")]
    ParseError {
        value: String,
        format: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Time range covered by one query, in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Local>, end: DateTime<Local>) -> Self {
        Self { start, end }
    }

    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }

    /// Move the lower bound to a boundary record's timestamp.
    pub fn advance_start(&mut self, start: DateTime<Local>) {
        self.start = start;
        if self.end < self.start {
            self.end = self.start;
        }
    }

    /// Move the upper bound to `now`, never below `start`.
    pub fn extend_to(&mut self, now: DateTime<Local>) {
        self.end = now.max(self.start);
    }

    /// Lower bound in whole epoch seconds. Truncation keeps the boundary
    /// record inside the next query.
    pub fn start_epoch(&self) -> i64 {
        self.start.timestamp()
    }

    pub fn end_epoch(&self) -> i64 {
        self.end.timestamp()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} .. {}]",
            self.start.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.end.format("%Y-%m-%d %H:%M:%S%.3f")
        )
    }
}

/// Parse a service-reported `@timestamp` (UTC) into local time.
pub fn parse_service_timestamp(value: &str) -> Result<DateTime<Local>, TimestampError> {
    NaiveDateTime::parse_from_str(value.trim(), SERVICE_TIMESTAMP_FORMAT)
        .map(|ndt| Utc.from_utc_datetime(&ndt).with_timezone(&Local))
        .map_err(|e| TimestampError::ParseError {
            value: value.to_string(),
            format: SERVICE_TIMESTAMP_FORMAT.to_string(),
            source: e,
        })
}
