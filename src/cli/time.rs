use crate::query::TimeWindow;
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone};
use thiserror::Error;

/// Format accepted by `--start` / `--end`, interpreted in local time.
pub const CLI_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum TimeArgError {
    #[error("invalid time '{value}', expected format YYYY-MM-DD HH:MM:SS: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("'{0}' does not exist in the local timezone")]
    NonexistentLocalTime(String),

    #[error("invalid time delta '{0}', expected e.g. 120m, 3h or 2d")]
    InvalidDelta(String),
}

/// Parse `--timedelta` values such as `120m`, `3h` or `2d`.
///
/// A missing or unrecognised unit falls back to 60 minutes.
pub fn parse_time_delta(input: &str) -> Result<Duration, TimeArgError> {
    let input = input.trim();
    let Some(unit) = input.chars().last() else {
        return Ok(Duration::minutes(60));
    };
    let value = &input[..input.len() - unit.len_utf8()];

    let scale: fn(i64) -> Option<Duration> = match unit {
        'm' => Duration::try_minutes,
        'h' => Duration::try_hours,
        'd' => Duration::try_days,
        _ => return Ok(Duration::minutes(60)),
    };

    let amount: i64 = value
        .parse()
        .map_err(|_| TimeArgError::InvalidDelta(input.to_string()))?;
    if amount < 0 {
        return Err(TimeArgError::InvalidDelta(input.to_string()));
    }

    scale(amount).ok_or_else(|| TimeArgError::InvalidDelta(input.to_string()))
}

pub fn parse_local_time(input: &str) -> Result<DateTime<Local>, TimeArgError> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), CLI_TIME_FORMAT).map_err(|e| {
        TimeArgError::InvalidTimestamp {
            value: input.to_string(),
            source: e,
        }
    })?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| TimeArgError::NonexistentLocalTime(input.to_string()))
}

/// Build the initial query window from the command line.
///
/// - `--start` and `--end`: exactly that range
/// - `--start` only: from start until `now`
/// - `--end` only: `timedelta` before end, until end
/// - neither: `timedelta` before `now`, until `now`
pub fn resolve_window(
    start: Option<&str>,
    end: Option<&str>,
    timedelta: &str,
    now: DateTime<Local>,
) -> Result<TimeWindow, TimeArgError> {
    let window = match (start, end) {
        (Some(start), Some(end)) => TimeWindow::new(parse_local_time(start)?, parse_local_time(end)?),
        (Some(start), None) => TimeWindow::new(parse_local_time(start)?, now),
        (None, Some(end)) => {
            let end = parse_local_time(end)?;
            TimeWindow::new(go_back(end, timedelta)?, end)
        }
        (None, None) => TimeWindow::new(go_back(now, timedelta)?, now),
    };
    Ok(window)
}

fn go_back(from: DateTime<Local>, timedelta: &str) -> Result<DateTime<Local>, TimeArgError> {
    from.checked_sub_signed(parse_time_delta(timedelta)?)
        .ok_or_else(|| TimeArgError::InvalidDelta(timedelta.to_string()))
}
