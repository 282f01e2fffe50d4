//! `HH:MM` wall-clock parsing.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Malformed wall-clock input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    MissingMinutes(String),
    InvalidNumber(String),
}

impl Display for ClockError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingMinutes(value) => write!(f, "time `{value}` has no minute part"),
            Self::InvalidNumber(value) => write!(f, "time `{value}` is not numeric"),
        }
    }
}

impl Error for ClockError {}

/// Parses `HH:MM` into decimal hours.
///
/// Empty input is `0.0`. Parts are trimmed, an empty part counts as zero and
/// anything after the minute part is ignored.
pub fn parse_clock(value: &str) -> Result<f64, ClockError> {
    if value.is_empty() {
        return Ok(0.0);
    }

    let mut parts = value.split(':');
    let hours = parse_part(parts.next().unwrap_or_default(), value)?;
    let minutes = match parts.next() {
        Some(part) => parse_part(part, value)?,
        None => return Err(ClockError::MissingMinutes(value.to_string())),
    };

    Ok(f64::from(hours) + f64::from(minutes) / 60.0)
}

/// Lenient form of [`parse_clock`] used by geometry.
///
/// Malformed input becomes `NaN`, which geometry treats as "no visible bar".
pub fn to_decimal_hours(value: &str) -> f64 {
    parse_clock(value).unwrap_or(f64::NAN)
}

fn parse_part(part: &str, whole: &str) -> Result<i32, ClockError> {
    let trimmed = part.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed
        .parse::<i32>()
        .map_err(|_| ClockError::InvalidNumber(whole.to_string()))
}
