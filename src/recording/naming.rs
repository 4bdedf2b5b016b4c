//! Deterministic folder and file names derived from wall-clock time.
//!
//! Names are computed at a fixed +05:30 offset so the on-disk layout does not
//! depend on the host's timezone configuration.

use chrono::{DateTime, FixedOffset, Utc};

/// Fixed archive offset from UTC, in seconds (+05:30).
pub const ARCHIVE_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Capability yielding the current instant, injected so naming stays
/// deterministic under test.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

fn archive_offset() -> FixedOffset {
    // The offset is a compile-time constant well within chrono's bounds.
    FixedOffset::east_opt(ARCHIVE_OFFSET_SECS).unwrap()
}

/// Day folder name for the given instant: `YYYY-MM-DD`.
pub fn folder_name(now: DateTime<Utc>) -> String {
    now.with_timezone(&archive_offset())
        .format("%Y-%m-%d")
        .to_string()
}

/// Segment file stem for the given instant: `HH-MM-SS`.
pub fn file_name(now: DateTime<Utc>) -> String {
    now.with_timezone(&archive_offset())
        .format("%H-%M-%S")
        .to_string()
}
