use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, RwLockReadGuard};

use super::{LogSnapshot, LogStats, PositionLog, StorageError};
use crate::model::{NewPosition, PositionRecord, RecordId};

type TimeKey = (DateTime<Utc>, RecordId);

#[derive(Debug, Default)]
struct Inner {
    // id n lives at index n - 1
    records: Vec<PositionRecord>,
    by_bus: HashMap<String, BTreeSet<TimeKey>>,
    by_route: HashMap<String, BTreeSet<TimeKey>>,
    by_time: BTreeSet<TimeKey>,
}

impl Inner {
    fn push(&mut self, new: NewPosition) -> PositionRecord {
        let id = self.records.len() as RecordId + 1;
        let record = new.into_record(id);
        let key = (record.timestamp, id);

        self.by_bus.entry(record.bus_id.clone()).or_default().insert(key);
        if let Some(route_id) = &record.route_id {
            self.by_route.entry(route_id.clone()).or_default().insert(key);
        }
        self.by_time.insert(key);
        self.records.push(record.clone());

        record
    }

    fn get(&self, id: RecordId) -> &PositionRecord {
        &self.records[(id - 1) as usize]
    }

    fn scan(&self, index: Option<&BTreeSet<TimeKey>>, since: DateTime<Utc>) -> Vec<PositionRecord> {
        match index {
            Some(index) => index
                .range((since, RecordId::MIN)..)
                .map(|&(_, id)| self.get(id).clone())
                .collect(),
            None => Vec::new(),
        }
    }
}

/// In-process position log with ordered indexes on (bus, time), (route, time)
/// and time alone. Readers share a lock, so every snapshot sees whole appends
/// only.
#[derive(Debug, Default)]
pub struct MemoryLog {
    inner: RwLock<Inner>,
    acquire_timeout: Option<Duration>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail snapshots with [`StorageError::Timeout`] instead of waiting on a
    /// writer for longer than `timeout`.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    pub async fn append(&self, new: NewPosition) -> PositionRecord {
        self.inner.write().await.push(new)
    }

    /// Appends a batch under one write lock so readers see all of it or none.
    pub async fn extend(&self, batch: impl IntoIterator<Item = NewPosition>) -> usize {
        let mut inner = self.inner.write().await;
        let mut appended = 0;
        for new in batch {
            inner.push(new);
            appended += 1;
        }
        appended
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl PositionLog for MemoryLog {
    async fn snapshot(&self) -> Result<Box<dyn LogSnapshot + '_>, StorageError> {
        let guard = match self.acquire_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.inner.read())
                .await
                .map_err(|_| StorageError::Timeout)?,
            None => self.inner.read().await,
        };
        Ok(Box::new(MemorySnapshot(guard)))
    }
}

struct MemorySnapshot<'a>(RwLockReadGuard<'a, Inner>);

impl LogSnapshot for MemorySnapshot<'_> {
    fn records_for_bus(&self, bus_id: &str, since: DateTime<Utc>) -> Vec<PositionRecord> {
        self.0.scan(self.0.by_bus.get(bus_id), since)
    }

    fn records_for_route(&self, route_id: &str, since: DateTime<Utc>) -> Vec<PositionRecord> {
        self.0.scan(self.0.by_route.get(route_id), since)
    }

    fn all_records_since(&self, since: DateTime<Utc>) -> Vec<PositionRecord> {
        self.0.scan(Some(&self.0.by_time), since)
    }

    fn latest_for_bus(&self, bus_id: &str) -> Option<PositionRecord> {
        let &(_, id) = self.0.by_bus.get(bus_id)?.last()?;
        Some(self.0.get(id).clone())
    }

    fn stats(&self) -> LogStats {
        LogStats {
            total_records: self.0.records.len(),
            unique_buses: self.0.by_bus.len(),
            unique_routes: self.0.by_route.len(),
            first_timestamp: self.0.by_time.first().map(|&(ts, _)| ts),
            last_timestamp: self.0.by_time.last().map(|&(ts, _)| ts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn at(bus: &str, route: Option<&str>, minutes: i64) -> NewPosition {
        let pos = NewPosition::new(bus, 44.23, -76.48, t0() + ChronoDuration::minutes(minutes));
        match route {
            Some(route) => pos.on_route(route),
            None => pos,
        }
    }

    #[tokio::test]
    async fn test_ids_are_assigned_in_insertion_order() {
        let log = MemoryLog::new();
        let a = log.append(at("B1", None, 5)).await;
        let b = log.append(at("B1", None, 0)).await;
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(log.len().await, 2);
    }

    #[tokio::test]
    async fn test_bus_scan_is_ascending_and_bounded() {
        let log = MemoryLog::new();
        log.extend([
            at("B1", Some("5"), 10),
            at("B1", Some("5"), 0),
            at("B2", Some("5"), 3),
            at("B1", Some("7"), 5),
        ])
        .await;

        let snapshot = log.snapshot().await.unwrap();
        let since = t0() + ChronoDuration::minutes(5);
        let times: Vec<_> = snapshot
            .records_for_bus("B1", since)
            .iter()
            .map(|r| r.timestamp)
            .collect();
        assert_eq!(times, vec![since, t0() + ChronoDuration::minutes(10)]);
        assert!(snapshot.records_for_bus("nobody", t0()).is_empty());
    }

    #[tokio::test]
    async fn test_route_scan_skips_unassigned_records() {
        let log = MemoryLog::new();
        log.extend([at("B1", Some("5"), 0), at("B2", None, 1), at("B3", Some("5"), 2)])
            .await;

        let snapshot = log.snapshot().await.unwrap();
        let buses: Vec<_> = snapshot
            .records_for_route("5", t0())
            .into_iter()
            .map(|r| r.bus_id)
            .collect();
        assert_eq!(buses, vec!["B1", "B3"]);
        assert_eq!(snapshot.all_records_since(t0()).len(), 3);
    }

    #[tokio::test]
    async fn test_latest_for_bus_prefers_later_insert_on_equal_timestamps() {
        let log = MemoryLog::new();
        log.append(at("B1", None, 2)).await;
        let later = log.append(at("B1", Some("9"), 2)).await;
        log.append(at("B1", None, 1)).await;

        let snapshot = log.snapshot().await.unwrap();
        assert_eq!(snapshot.latest_for_bus("B1"), Some(later));
        assert_eq!(snapshot.latest_for_bus("B2"), None);
    }

    #[tokio::test]
    async fn test_stats() {
        let log = MemoryLog::new();
        let empty = log.snapshot().await.unwrap().stats();
        assert_eq!(empty.total_records, 0);
        assert_eq!(empty.first_timestamp, None);

        log.extend([at("B1", Some("5"), 3), at("B2", None, 0), at("B1", Some("7"), 9)])
            .await;
        let stats = log.snapshot().await.unwrap().stats();
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.unique_buses, 2);
        assert_eq!(stats.unique_routes, 2);
        assert_eq!(stats.first_timestamp, Some(t0()));
        assert_eq!(stats.last_timestamp, Some(t0() + ChronoDuration::minutes(9)));
    }

    #[tokio::test]
    async fn test_snapshot_times_out_behind_writer() {
        let log = MemoryLog::new().with_acquire_timeout(std::time::Duration::from_millis(20));
        let _writer = log.inner.write().await;
        assert!(matches!(log.snapshot().await, Err(StorageError::Timeout)));
    }

    #[tokio::test]
    async fn test_configured_log_times_out_behind_writer() {
        let config = crate::config::Config::from_lookup(|var| {
            (var == "SNAPSHOT_TIMEOUT_MS").then(|| "20".to_string())
        })
        .unwrap();
        let log = config.position_log();
        let _writer = log.inner.write().await;
        assert!(matches!(log.snapshot().await, Err(StorageError::Timeout)));
    }
}
