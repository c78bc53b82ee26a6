//! Runtime configuration read from the environment (and `.env`, via dotenvy).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use axum::http::HeaderValue;
use chrono::Duration;

use crate::freshness::{FreshnessPolicy, DEFAULT_FRESHNESS_MINUTES};
use crate::log::MemoryLog;
use crate::service::HistoryBounds;

pub const DEFAULT_BIND_ADDR: &str = "localhost:3000";
pub const DEFAULT_SNAPSHOT_TIMEOUT_MS: u64 = 5_000;

pub const MAX_FRESHNESS_MINUTES: i64 = 24 * 60;
pub const MAX_HISTORY_HOURS: i64 = 24 * 366;
pub const MAX_SNAPSHOT_TIMEOUT_MS: u64 = 60_000;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{var} is not a valid value: {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("FRESHNESS_MINUTES must be positive, got {0}")]
    NonPositiveFreshness(i64),
    #[error("{var} must be at most {max}, got {value}")]
    TooLarge { var: &'static str, value: i64, max: i64 },
    #[error("history bounds are inconsistent: min {min}h, max {max}h, default {default}h")]
    HistoryBounds { min: i64, max: i64, default: i64 },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub freshness: FreshnessPolicy,
    pub history: HistoryBounds,
    pub seed_csv: Option<PathBuf>,
    /// Longest a query waits for a read view of the position log.
    pub snapshot_timeout: StdDuration,
    /// `None` allows any origin.
    pub cors_allowed_origins: Option<Vec<HeaderValue>>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let freshness_minutes = parse_or(&lookup, "FRESHNESS_MINUTES", DEFAULT_FRESHNESS_MINUTES)?;
        if freshness_minutes <= 0 {
            return Err(ConfigError::NonPositiveFreshness(freshness_minutes));
        }
        if freshness_minutes > MAX_FRESHNESS_MINUTES {
            return Err(ConfigError::TooLarge {
                var: "FRESHNESS_MINUTES",
                value: freshness_minutes,
                max: MAX_FRESHNESS_MINUTES,
            });
        }
        let freshness_window = Duration::try_minutes(freshness_minutes).ok_or_else(|| ConfigError::Invalid {
            var: "FRESHNESS_MINUTES",
            value: freshness_minutes.to_string(),
        })?;

        let defaults = HistoryBounds::default();
        let history = HistoryBounds {
            min_hours: parse_or(&lookup, "HISTORY_MIN_HOURS", defaults.min_hours)?,
            max_hours: parse_or(&lookup, "HISTORY_MAX_HOURS", defaults.max_hours)?,
            default_hours: parse_or(&lookup, "HISTORY_DEFAULT_HOURS", defaults.default_hours)?,
        };
        if history.min_hours < 1
            || history.min_hours > history.max_hours
            || !(history.min_hours..=history.max_hours).contains(&history.default_hours)
        {
            return Err(ConfigError::HistoryBounds {
                min: history.min_hours,
                max: history.max_hours,
                default: history.default_hours,
            });
        }

        if history.max_hours > MAX_HISTORY_HOURS {
            return Err(ConfigError::TooLarge {
                var: "HISTORY_MAX_HOURS",
                value: history.max_hours,
                max: MAX_HISTORY_HOURS,
            });
        }

        let snapshot_timeout_ms = parse_or(&lookup, "SNAPSHOT_TIMEOUT_MS", DEFAULT_SNAPSHOT_TIMEOUT_MS)?;
        if snapshot_timeout_ms == 0 || snapshot_timeout_ms > MAX_SNAPSHOT_TIMEOUT_MS {
            return Err(ConfigError::Invalid {
                var: "SNAPSHOT_TIMEOUT_MS",
                value: snapshot_timeout_ms.to_string(),
            });
        }

        let cors_allowed_origins = match lookup("CORS_ALLOWED_ORIGINS") {
            Some(raw) if !raw.trim().is_empty() => Some(
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(|origin| {
                        HeaderValue::from_str(origin).map_err(|_| ConfigError::Invalid {
                            var: "CORS_ALLOWED_ORIGINS",
                            value: origin.to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            _ => None,
        };

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            freshness: FreshnessPolicy::new(freshness_window),
            history,
            seed_csv: lookup("SEED_CSV").filter(|p| !p.is_empty()).map(PathBuf::from),
            snapshot_timeout: StdDuration::from_millis(snapshot_timeout_ms),
            cors_allowed_origins,
        })
    }

    /// Empty log whose snapshots give up after `snapshot_timeout`.
    pub fn position_log(&self) -> MemoryLog {
        MemoryLog::new().with_acquire_timeout(self.snapshot_timeout)
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}
