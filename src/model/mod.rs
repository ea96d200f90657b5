use chrono::{DateTime, Timelike, Utc};

pub mod api;
pub mod common;
pub mod db;
pub mod mongodb;

/// The current time, truncated to the millisecond precision BSON stores, so
/// that timestamps compare equal after a round trip through the database.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(now.timestamp_subsec_millis() * 1_000_000)
        .unwrap_or(now)
}
