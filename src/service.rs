//! Read-only queries over the position log: the current fleet, per-route
//! rosters, single-vehicle lookup and bounded history.
//!
//! Every operation takes one snapshot of the log, reduces it in memory and
//! drops the snapshot before returning.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument};

use crate::error::QueryError;
use crate::freshness::{look_back, FreshnessPolicy};
use crate::log::{LogStats, PositionLog};
use crate::model::PositionRecord;
use crate::resolver::latest_per_bus;

/// Accepted range for history look-back, in hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryBounds {
    pub min_hours: i64,
    pub max_hours: i64,
    /// Used when a caller does not ask for a specific window.
    pub default_hours: i64,
}

impl HistoryBounds {
    pub fn check(&self, hours: i64) -> Result<i64, QueryError> {
        if (self.min_hours..=self.max_hours).contains(&hours) {
            Ok(hours)
        } else {
            Err(QueryError::Validation(format!(
                "Hours must be between {} and {}",
                self.min_hours, self.max_hours
            )))
        }
    }
}

impl Default for HistoryBounds {
    fn default() -> Self {
        Self {
            min_hours: 1,
            max_hours: 168,
            default_hours: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummary {
    pub route_id: String,
    pub active_vehicle_count: usize,
    /// One snapshot per vehicle, sorted by bus id.
    pub vehicles: Vec<PositionRecord>,
}

pub struct TransitService {
    log: Arc<dyn PositionLog>,
    freshness: FreshnessPolicy,
    history: HistoryBounds,
}

impl TransitService {
    pub fn new(log: Arc<dyn PositionLog>, freshness: FreshnessPolicy, history: HistoryBounds) -> Self {
        Self { log, freshness, history }
    }

    pub fn freshness(&self) -> FreshnessPolicy {
        self.freshness
    }

    pub fn history_bounds(&self) -> HistoryBounds {
        self.history
    }

    /// Latest fresh report of every vehicle, with or without a route.
    #[instrument(skip(self))]
    pub async fn current_fleet(&self, now: DateTime<Utc>) -> Result<Vec<PositionRecord>, QueryError> {
        let records = {
            let snapshot = self.log.snapshot().await?;
            snapshot.all_records_since(self.freshness.cutoff(now))
        };

        let fleet = sorted_by_bus(latest_per_bus(records).into_values().collect());
        debug_assert!(fleet.iter().all(|r| self.freshness.is_fresh(r, now)));
        debug!(vehicles = fleet.len(), "resolved current fleet");
        Ok(fleet)
    }

    /// Fresh rosters for every route that has at least one reporting vehicle,
    /// sorted by route id.
    #[instrument(skip(self))]
    pub async fn current_routes(&self, now: DateTime<Utc>) -> Result<Vec<RouteSummary>, QueryError> {
        let records = {
            let snapshot = self.log.snapshot().await?;
            snapshot.all_records_since(self.freshness.cutoff(now))
        };

        let mut by_route: BTreeMap<String, Vec<PositionRecord>> = BTreeMap::new();
        for record in records {
            if let Some(route_id) = record.route_id.clone() {
                by_route.entry(route_id).or_default().push(record);
            }
        }

        let routes: Vec<RouteSummary> = by_route
            .into_iter()
            .map(|(route_id, group)| {
                let vehicles = sorted_by_bus(latest_per_bus(group).into_values().collect());
                debug_assert!(vehicles.iter().all(|r| self.freshness.is_fresh(r, now)));
                RouteSummary {
                    route_id,
                    active_vehicle_count: vehicles.len(),
                    vehicles,
                }
            })
            .collect();
        debug!(routes = routes.len(), "resolved route rosters");
        Ok(routes)
    }

    /// Fresh roster of a single route. Unknown routes give an empty list.
    #[instrument(skip(self))]
    pub async fn vehicles_for_route(
        &self,
        route_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<PositionRecord>, QueryError> {
        let records = {
            let snapshot = self.log.snapshot().await?;
            snapshot.records_for_route(route_id, self.freshness.cutoff(now))
        };
        let vehicles = sorted_by_bus(latest_per_bus(records).into_values().collect::<Vec<_>>());
        debug_assert!(vehicles.iter().all(|r| self.freshness.is_fresh(r, now)));
        Ok(vehicles)
    }

    /// Most recent report for `bus_id` at any age; `None` if it never reported.
    #[instrument(skip(self))]
    pub async fn current_position(&self, bus_id: &str) -> Result<Option<PositionRecord>, QueryError> {
        let snapshot = self.log.snapshot().await?;
        Ok(snapshot.latest_for_bus(bus_id))
    }

    /// Every report for `bus_id` in the last `hours_back` hours, oldest first.
    #[instrument(skip(self))]
    pub async fn history(
        &self,
        bus_id: &str,
        hours_back: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<PositionRecord>, QueryError> {
        let hours_back = self.history.check(hours_back)?;
        let cutoff = match Duration::try_hours(hours_back) {
            Some(window) => look_back(now, window),
            None => DateTime::<Utc>::MIN_UTC,
        };

        let points = {
            let snapshot = self.log.snapshot().await?;
            snapshot.records_for_bus(bus_id, cutoff)
        };

        if points.is_empty() {
            return Err(QueryError::NotFound(format!("No history found for vehicle {bus_id}")));
        }
        debug!(points = points.len(), "extracted history");
        Ok(points)
    }

    pub async fn statistics(&self) -> Result<LogStats, QueryError> {
        let snapshot = self.log.snapshot().await?;
        Ok(snapshot.stats())
    }
}

fn sorted_by_bus(mut records: Vec<PositionRecord>) -> Vec<PositionRecord> {
    records.sort_by(|a, b| a.bus_id.cmp(&b.bus_id));
    records
}
