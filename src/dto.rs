//! Wire shapes returned by the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::PositionRecord;
use crate::service::RouteSummary;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDto {
    pub bus_id: String,
    pub route_id: Option<String>,
    pub trip_id: Option<String>,
    pub location: LocationDto,
    pub speed: Option<f64>,
    pub bearing: Option<f64>,
    pub current_status: Option<String>,
    pub stop_id: Option<String>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LocationDto {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteDto {
    pub route_id: String,
    pub active_vehicles: usize,
    pub vehicles: Vec<VehicleDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VehicleHistoryDto {
    pub bus_id: String,
    pub history: Vec<HistoryPoint>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: Option<f64>,
    pub route_id: Option<String>,
}

impl From<PositionRecord> for VehicleDto {
    fn from(position: PositionRecord) -> Self {
        Self {
            bus_id: position.bus_id,
            route_id: position.route_id,
            trip_id: position.trip_id,
            location: LocationDto {
                latitude: position.latitude,
                longitude: position.longitude,
            },
            speed: position.speed,
            bearing: position.bearing,
            current_status: position.current_status,
            stop_id: position.stop_id,
            last_updated: position.timestamp,
        }
    }
}

impl From<RouteSummary> for RouteDto {
    fn from(route: RouteSummary) -> Self {
        Self {
            route_id: route.route_id,
            active_vehicles: route.active_vehicle_count,
            vehicles: route.vehicles.into_iter().map(VehicleDto::from).collect(),
        }
    }
}

impl From<PositionRecord> for HistoryPoint {
    fn from(position: PositionRecord) -> Self {
        Self {
            timestamp: position.timestamp,
            latitude: position.latitude,
            longitude: position.longitude,
            speed: position.speed,
            route_id: position.route_id,
        }
    }
}

impl VehicleHistoryDto {
    pub fn new(bus_id: String, points: Vec<PositionRecord>) -> Self {
        Self {
            bus_id,
            history: points.into_iter().map(HistoryPoint::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewPosition;
    use chrono::TimeZone;

    #[test]
    fn test_vehicle_json_shape() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let mut new = NewPosition::new("B7", 44.25, -76.5, ts).on_route("12");
        new.stop_id = Some("S101".into());
        let json = serde_json::to_value(VehicleDto::from(new.into_record(1))).unwrap();

        assert_eq!(json["busId"], "B7");
        assert_eq!(json["routeId"], "12");
        assert_eq!(json["stopId"], "S101");
        assert_eq!(json["location"]["latitude"], 44.25);
        assert_eq!(json["lastUpdated"], "2025-03-01T12:00:00Z");
        assert!(json["speed"].is_null());
    }
}
