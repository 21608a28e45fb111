//! UTC timestamps in FIX `UTCTimestamp` form.

use chrono::{DateTime, Utc};

const FORMAT: &str = "%Y%m%d-%H:%M:%S%.3f";

/// Current time as `YYYYMMDD-HH:MM:SS.mmm`.
pub fn now_utc() -> String {
    format_utc(Utc::now())
}

pub fn format_utc(at: DateTime<Utc>) -> String {
    at.format(FORMAT).to_string()
}
