use std::fmt;

use chrono::{NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<(?P<timestamp>[\d\-T:\.]+)Z>").unwrap());

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Display form of the `<...Z>` token that prefixes most telemetry lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayTime {
    Local(String),
    Invalid,
    Unknown,
}

impl fmt::Display for DisplayTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayTime::Local(text) => f.write_str(text),
            DisplayTime::Invalid => f.write_str("InvalidTime"),
            DisplayTime::Unknown => f.write_str("UnknownTime"),
        }
    }
}

/// Converts the leading UTC token of `line` into `tz`, usually [`chrono::Local`].
///
/// Nothing is cached: every call re-derives the conversion.
pub fn normalize_in<Tz>(line: &str, tz: &Tz) -> DisplayTime
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let Some(caps) = LEADING_TIMESTAMP.captures(line) else {
        return DisplayTime::Unknown;
    };

    match NaiveDateTime::parse_from_str(&caps["timestamp"], "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => {
            let local = Utc.from_utc_datetime(&naive).with_timezone(tz);
            DisplayTime::Local(local.format(DISPLAY_FORMAT).to_string())
        }
        Err(_) => DisplayTime::Invalid,
    }
}
