use chrono::{Duration, Utc};
use futures::future::BoxFuture;
use serde_json::json;

use crate::error::AppError;
use crate::providers::{
    RouteSignal, TrafficLevel, TrafficProvider, WeatherProvider, WeatherSeverity, WeatherSignal,
    TRAFFIC_TTL_MIN, WEATHER_TTL_MIN,
};

/// Polynomial rolling hash over the input bytes. Stable across runs so that
/// identical inputs always reproduce identical signals; this is a
/// reproducibility contract for test fixtures, not a security property.
pub fn rolling_hash(input: &str) -> u64 {
    input
        .bytes()
        .fold(0u64, |acc, byte| acc.wrapping_mul(31).wrapping_add(byte as u64))
}

/// Reduces the hash to a float in [0, 1) for threshold comparisons.
pub fn hash_unit(input: &str) -> f64 {
    (rolling_hash(input) % 10_000) as f64 / 10_000.0
}

#[derive(Debug, Clone, Default)]
pub struct MockTrafficProvider;

impl TrafficProvider for MockTrafficProvider {
    fn route(
        &self,
        origin: &str,
        destination: &str,
    ) -> BoxFuture<'static, Result<RouteSignal, AppError>> {
        let seed = format!("{origin}|{destination}");
        Box::pin(async move {
            let unit = hash_unit(&seed);
            let congestion_min = (rolling_hash(&seed) % 21) as i64;
            let level = if unit < 0.5 {
                TrafficLevel::Low
            } else if unit < 0.85 {
                TrafficLevel::Moderate
            } else {
                TrafficLevel::Heavy
            };

            Ok(RouteSignal {
                eta_normal_min: 20,
                eta_with_traffic_min: Some(20 + congestion_min),
                level,
                source: "mock-traffic".to_string(),
                expires_at: Utc::now() + Duration::minutes(TRAFFIC_TTL_MIN),
            })
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockWeatherProvider;

impl WeatherProvider for MockWeatherProvider {
    fn weather(&self, lat: f64, lon: f64) -> BoxFuture<'static, Result<WeatherSignal, AppError>> {
        let seed = format!("{lat:.4},{lon:.4}");
        Box::pin(async move {
            let unit = hash_unit(&seed);
            let severity = if unit < 0.6 {
                WeatherSeverity::Low
            } else if unit < 0.9 {
                WeatherSeverity::Medium
            } else {
                WeatherSeverity::High
            };

            Ok(WeatherSignal {
                severity,
                payload: json!({
                    "lat": lat,
                    "lon": lon,
                    "severity_index": unit,
                }),
                source: "mock-weather".to_string(),
                expires_at: Utc::now() + Duration::minutes(WEATHER_TTL_MIN),
            })
        })
    }
}
