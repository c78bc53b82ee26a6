use std::sync::Arc;

use bus_tracker::dto::{RouteDto, VehicleDto, VehicleHistoryDto};
use bus_tracker::{api, FreshnessPolicy, HistoryBounds, LogStats, MemoryLog, NewPosition, TransitService};
use chrono::{Duration, Utc};
use reqwest::StatusCode;

async fn spawn_app(log: Arc<MemoryLog>) -> String {
    let service = Arc::new(TransitService::new(log, FreshnessPolicy::default(), HistoryBounds::default()));
    let router = api::router(service, None);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn kingston_log() -> Arc<MemoryLog> {
    let now = Utc::now();
    let log = Arc::new(MemoryLog::new());
    log.extend([
        NewPosition::new("B1", 44.2312, -76.4860, now - Duration::minutes(4)).on_route("5"),
        NewPosition::new("B1", 44.2320, -76.4871, now - Duration::minutes(2)).on_route("5"),
        NewPosition::new("B2", 44.2500, -76.5000, now - Duration::minutes(1)).on_route("5"),
        NewPosition::new("B3", 44.2200, -76.5200, now - Duration::minutes(3)).on_route("12"),
        NewPosition::new("B4", 44.2100, -76.5300, now - Duration::hours(30)).on_route("12"),
    ])
    .await;
    log
}

#[tokio::test]
async fn test_vehicles_lists_fresh_fleet() {
    let base = spawn_app(kingston_log().await).await;

    let res = reqwest::get(format!("{base}/vehicles")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let vehicles: Vec<VehicleDto> = res.json().await.unwrap();

    let mut ids: Vec<_> = vehicles.iter().map(|v| v.bus_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["B1", "B2", "B3"]);
    let b1 = vehicles.iter().find(|v| v.bus_id == "B1").unwrap();
    assert_eq!(b1.location.latitude, 44.2320);
}

#[tokio::test]
async fn test_vehicle_lookup_any_age() {
    let base = spawn_app(kingston_log().await).await;

    let res = reqwest::get(format!("{base}/vehicles/B4")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let vehicle: VehicleDto = res.json().await.unwrap();
    assert_eq!(vehicle.route_id.as_deref(), Some("12"));

    let res = reqwest::get(format!("{base}/vehicles/B99")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_routes_and_rosters() {
    let base = spawn_app(kingston_log().await).await;

    let routes: Vec<RouteDto> = reqwest::get(format!("{base}/routes")).await.unwrap().json().await.unwrap();
    let five = routes.iter().find(|r| r.route_id == "5").unwrap();
    let twelve = routes.iter().find(|r| r.route_id == "12").unwrap();
    assert_eq!(routes.len(), 2);
    assert_eq!(five.active_vehicles, 2);
    assert_eq!(five.vehicles.len(), 2);
    assert_eq!(twelve.active_vehicles, 1);

    let res = reqwest::get(format!("{base}/routes/12/vehicles")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let roster: Vec<VehicleDto> = res.json().await.unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].bus_id, "B3");

    let res = reqwest::get(format!("{base}/routes/99/vehicles")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let empty: Vec<VehicleDto> = res.json().await.unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn test_history_status_codes() {
    let base = spawn_app(kingston_log().await).await;

    for hours in [0, 169] {
        let res = reqwest::get(format!("{base}/history/B1?hours={hours}")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "hours={hours}");
    }

    let res = reqwest::get(format!("{base}/history/B1?hours=abc")).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("integer"));

    let res = reqwest::get(format!("{base}/history/B4?hours=24")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("B4"));

    let res = reqwest::get(format!("{base}/history/B4?hours=48")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let history: VehicleHistoryDto = res.json().await.unwrap();
    assert_eq!(history.history.len(), 1);

    // default window is 24h
    let res = reqwest::get(format!("{base}/history/B1")).await.unwrap();
    let history: VehicleHistoryDto = res.json().await.unwrap();
    assert_eq!(history.bus_id, "B1");
    assert_eq!(history.history.len(), 2);
    assert!(history.history[0].timestamp < history.history[1].timestamp);
}

#[tokio::test]
async fn test_stats() {
    let base = spawn_app(kingston_log().await).await;

    let stats: LogStats = reqwest::get(format!("{base}/stats")).await.unwrap().json().await.unwrap();
    assert_eq!(stats.total_records, 5);
    assert_eq!(stats.unique_buses, 4);
    assert_eq!(stats.unique_routes, 2);
}
