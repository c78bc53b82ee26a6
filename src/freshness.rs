use chrono::{DateTime, Duration, Utc};

use crate::model::PositionRecord;

pub const DEFAULT_FRESHNESS_MINUTES: i64 = 10;

/// How recent a report must be for its vehicle to count as currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    window: Duration,
}

impl FreshnessPolicy {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Oldest timestamp still considered fresh at `now`. A window reaching
    /// past the representable range clamps to the earliest instant.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        look_back(now, self.window)
    }

    /// Per-record form of the filter: a record is fresh exactly when its
    /// timestamp is at or after [`cutoff`](Self::cutoff).
    pub fn is_fresh(&self, record: &PositionRecord, now: DateTime<Utc>) -> bool {
        now - record.timestamp <= self.window
    }
}

/// `now - window`, clamped to `DateTime::<Utc>::MIN_UTC` instead of overflowing.
pub fn look_back(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_FRESHNESS_MINUTES))
    }
}
