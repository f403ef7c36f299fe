//! Run identifiers and timestamps.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// Generates a time-ordered run identifier.
#[must_use]
pub fn generate_run_id() -> Uuid {
    Uuid::now_v7()
}

/// Current UTC time.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC time as RFC 3339 with microseconds, e.g. `2024-01-02T03:04:05.000006Z`.
#[must_use]
pub fn iso_timestamp() -> String {
    format_timestamp(&now())
}

/// Formats `ts` the way [`iso_timestamp`] does.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
