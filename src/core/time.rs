//! Shared timestamp and identifier helpers.

use chrono::{DateTime, SecondsFormat, Utc};
use ulid::Ulid;

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// ISO-8601 UTC to the second (e.g. `2026-10-16T09:30:00Z`).
pub fn iso8601(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn now_iso8601() -> String {
    iso8601(now())
}

pub fn new_profile_id() -> String {
    Ulid::new().to_string()
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// True when `s` looks like an identifier we (or an older release) generated,
/// as opposed to a folder someone named by hand.
pub fn is_generated_id(s: &str) -> bool {
    Ulid::from_string(s).is_ok() || uuid::Uuid::parse_str(s).is_ok()
}
