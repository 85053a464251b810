use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::models::snapshot::SignalSnapshot;
use crate::providers::{
    RouteSignal, TrafficLevel, WeatherSeverity, WeatherSignal, TRAFFIC_TTL_MIN, WEATHER_TTL_MIN,
};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct TrafficReport {
    #[serde(flatten)]
    pub signal: RouteSignal,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeatherReport {
    #[serde(flatten)]
    pub signal: WeatherSignal,
    pub cache_hit: bool,
}

/// Snapshot-cached traffic lookup. Provider failures never propagate; the
/// caller gets the well-defined unavailable sentinel instead.
pub async fn get_traffic(
    state: &AppState,
    origin: &str,
    destination: &str,
    geo_scope: &str,
) -> TrafficReport {
    let now = Utc::now();
    if let Some(snapshot) = state.snapshots.fresh_traffic(geo_scope, now) {
        if let Ok(signal) = serde_json::from_value::<RouteSignal>(snapshot.payload.clone()) {
            return TrafficReport {
                signal,
                cache_hit: true,
            };
        }
    }

    match state.traffic.route(origin, destination).await {
        Ok(signal) => {
            if let Ok(payload) = serde_json::to_value(&signal) {
                state.snapshots.put_traffic(SignalSnapshot {
                    geo_scope: geo_scope.to_string(),
                    payload,
                    source: signal.source.clone(),
                    expires_at: signal.expires_at,
                });
            }
            TrafficReport {
                signal,
                cache_hit: false,
            }
        }
        Err(err) => {
            warn!(error = %err, origin, destination, "traffic provider unavailable");
            TrafficReport {
                signal: RouteSignal {
                    eta_normal_min: 20,
                    eta_with_traffic_min: None,
                    level: TrafficLevel::Unknown,
                    source: "unavailable".to_string(),
                    expires_at: now + Duration::minutes(TRAFFIC_TTL_MIN),
                },
                cache_hit: false,
            }
        }
    }
}

pub async fn get_weather(state: &AppState, lat: f64, lon: f64, geo_scope: &str) -> WeatherReport {
    let now = Utc::now();
    if let Some(snapshot) = state.snapshots.fresh_weather(geo_scope, now) {
        if let Ok(signal) = serde_json::from_value::<WeatherSignal>(snapshot.payload.clone()) {
            return WeatherReport {
                signal,
                cache_hit: true,
            };
        }
    }

    match state.weather.weather(lat, lon).await {
        Ok(signal) => {
            if let Ok(payload) = serde_json::to_value(&signal) {
                state.snapshots.put_weather(SignalSnapshot {
                    geo_scope: geo_scope.to_string(),
                    payload,
                    source: signal.source.clone(),
                    expires_at: signal.expires_at,
                });
            }
            WeatherReport {
                signal,
                cache_hit: false,
            }
        }
        Err(err) => {
            warn!(error = %err, lat, lon, "weather provider unavailable");
            WeatherReport {
                signal: WeatherSignal {
                    severity: WeatherSeverity::Unknown,
                    payload: json!({ "lat": lat, "lon": lon }),
                    source: "unavailable".to_string(),
                    expires_at: now + Duration::minutes(WEATHER_TTL_MIN),
                },
                cache_hit: false,
            }
        }
    }
}
