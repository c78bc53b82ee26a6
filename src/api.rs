use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::dto::{RouteDto, VehicleDto, VehicleHistoryDto};
use crate::error::QueryError;
use crate::service::TransitService;

pub struct ApiError(pub QueryError);

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            QueryError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            QueryError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            QueryError::Storage(err) => {
                error!(error = %err, "position log query failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(serde_json::json!({ "error": message }));
        (status, body).into_response()
    }
}

pub fn router(service: Arc<TransitService>, allowed_origins: Option<Vec<HeaderValue>>) -> Router {
    let origin = match allowed_origins {
        Some(origins) => AllowOrigin::list(origins),
        None => AllowOrigin::from(Any),
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/vehicles", get(get_vehicles))
        .route("/vehicles/{bus_id}", get(get_vehicle))
        .route("/routes", get(get_routes))
        .route("/routes/{route_id}/vehicles", get(get_route_vehicles))
        .route("/history/{bus_id}", get(get_history))
        .route("/stats", get(get_stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(service))
}

async fn get_vehicles(Extension(service): Extension<Arc<TransitService>>) -> Result<impl IntoResponse, ApiError> {
    let vehicles = service.current_fleet(Utc::now()).await?;
    Ok(Json(vehicles.into_iter().map(VehicleDto::from).collect::<Vec<_>>()))
}

async fn get_vehicle(
    Extension(service): Extension<Arc<TransitService>>,
    Path(bus_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let vehicle = service
        .current_position(&bus_id)
        .await?
        .ok_or_else(|| QueryError::NotFound(format!("Vehicle {bus_id} not found")))?;
    Ok(Json(VehicleDto::from(vehicle)))
}

async fn get_routes(Extension(service): Extension<Arc<TransitService>>) -> Result<impl IntoResponse, ApiError> {
    let routes = service.current_routes(Utc::now()).await?;
    Ok(Json(routes.into_iter().map(RouteDto::from).collect::<Vec<_>>()))
}

async fn get_route_vehicles(
    Extension(service): Extension<Arc<TransitService>>,
    Path(route_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let vehicles = service.vehicles_for_route(&route_id, Utc::now()).await?;
    Ok(Json(vehicles.into_iter().map(VehicleDto::from).collect::<Vec<_>>()))
}

#[derive(Deserialize, Debug)]
struct HistoryParams {
    hours: Option<i64>,
}

async fn get_history(
    Extension(service): Extension<Arc<TransitService>>,
    Path(bus_id): Path<String>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let bounds = service.history_bounds();
    let Query(params) = params.map_err(|_| {
        QueryError::Validation(format!(
            "Hours must be an integer between {} and {}",
            bounds.min_hours, bounds.max_hours
        ))
    })?;
    let hours = params.hours.unwrap_or(bounds.default_hours);
    let points = service.history(&bus_id, hours, Utc::now()).await?;
    Ok(Json(VehicleHistoryDto::new(bus_id, points)))
}

async fn get_stats(Extension(service): Extension<Arc<TransitService>>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(service.statistics().await?))
}
