use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Surrogate key handed out by the log in insertion order.
pub type RecordId = u64;

/// A single stored position report. Never mutated once appended.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    pub id: RecordId,
    pub bus_id: String,
    pub route_id: Option<String>,
    pub trip_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub bearing: Option<f64>,
    pub speed: Option<f64>,
    /// When the position was true in the real world.
    pub timestamp: DateTime<Utc>,
    pub current_stop_sequence: Option<i32>,
    pub stop_id: Option<String>,
    pub current_status: Option<String>,
    pub collected_at: DateTime<Utc>,
}

/// A position report before the log has assigned it an id.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct NewPosition {
    pub bus_id: String,
    pub route_id: Option<String>,
    pub trip_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub bearing: Option<f64>,
    pub speed: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub current_stop_sequence: Option<i32>,
    pub stop_id: Option<String>,
    pub current_status: Option<String>,
    pub collected_at: DateTime<Utc>,
}

impl NewPosition {
    /// Minimal report with everything optional left empty, collected at `timestamp`.
    pub fn new(bus_id: impl Into<String>, latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            bus_id: bus_id.into(),
            route_id: None,
            trip_id: None,
            latitude,
            longitude,
            bearing: None,
            speed: None,
            timestamp,
            current_stop_sequence: None,
            stop_id: None,
            current_status: None,
            collected_at: timestamp,
        }
    }

    pub fn on_route(mut self, route_id: impl Into<String>) -> Self {
        self.route_id = Some(route_id.into());
        self
    }

    pub fn into_record(self, id: RecordId) -> PositionRecord {
        PositionRecord {
            id,
            bus_id: self.bus_id,
            route_id: self.route_id,
            trip_id: self.trip_id,
            latitude: self.latitude,
            longitude: self.longitude,
            bearing: self.bearing,
            speed: self.speed,
            timestamp: self.timestamp,
            current_stop_sequence: self.current_stop_sequence,
            stop_id: self.stop_id,
            current_status: self.current_status,
            collected_at: self.collected_at,
        }
    }
}
