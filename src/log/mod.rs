//! Access to the append-only position log.
//!
//! The query layer only ever reads through a [`LogSnapshot`], which pins one
//! consistent view of the log for the duration of a single query. The handle
//! is released when it is dropped, whichever way the query exits.

mod memory;

pub use memory::MemoryLog;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::PositionRecord;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("position log unavailable: {0}")]
    Unavailable(String),
    #[error("timed out waiting for the position log")]
    Timeout,
}

#[async_trait]
pub trait PositionLog: Send + Sync {
    /// Acquire a read view of the log for one query.
    async fn snapshot(&self) -> Result<Box<dyn LogSnapshot + '_>, StorageError>;
}

/// One consistent view of the log. All sequences are ascending by
/// `(timestamp, id)`.
pub trait LogSnapshot: Send + Sync {
    fn records_for_bus(&self, bus_id: &str, since: DateTime<Utc>) -> Vec<PositionRecord>;

    fn records_for_route(&self, route_id: &str, since: DateTime<Utc>) -> Vec<PositionRecord>;

    fn all_records_since(&self, since: DateTime<Utc>) -> Vec<PositionRecord>;

    /// Most recent record for the bus regardless of age.
    fn latest_for_bus(&self, bus_id: &str) -> Option<PositionRecord>;

    fn stats(&self) -> LogStats;
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    pub total_records: usize,
    pub unique_buses: usize,
    pub unique_routes: usize,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
}
