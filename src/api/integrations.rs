use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::integrations::{get_traffic, get_weather, TrafficReport, WeatherReport};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/integrations/traffic", get(traffic))
        .route("/integrations/weather", get(weather))
}

#[derive(Deserialize)]
pub struct TrafficQuery {
    pub origin: String,
    pub destination: String,
}

async fn traffic(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    Query(query): Query<TrafficQuery>,
) -> Result<Json<TrafficReport>, AppError> {
    if query.origin.trim().is_empty() || query.destination.trim().is_empty() {
        return Err(AppError::BadRequest(
            "origin and destination are required".to_string(),
        ));
    }

    let scope = format!("{}|{}", query.origin.trim(), query.destination.trim());
    Ok(Json(
        get_traffic(&state, query.origin.trim(), query.destination.trim(), &scope).await,
    ))
}

#[derive(Deserialize)]
pub struct WeatherQuery {
    pub lat: f64,
    pub lon: f64,
}

async fn weather(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<WeatherReport>, AppError> {
    if !query.lat.is_finite() || !query.lon.is_finite() {
        return Err(AppError::BadRequest(
            "coordinates must be finite numbers".to_string(),
        ));
    }

    // Two-decimal scope buckets nearby lookups onto one cache entry.
    let scope = format!("{:.2},{:.2}", query.lat, query.lon);
    Ok(Json(get_weather(&state, query.lat, query.lon, &scope).await))
}
