pub mod mock;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

pub const TRAFFIC_TTL_MIN: i64 = 5;
pub const WEATHER_TTL_MIN: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrafficLevel {
    Low,
    Moderate,
    Heavy,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeatherSeverity {
    Low,
    Medium,
    High,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSignal {
    pub eta_normal_min: i64,
    pub eta_with_traffic_min: Option<i64>,
    pub level: TrafficLevel,
    pub source: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSignal {
    pub severity: WeatherSeverity,
    pub payload: Value,
    pub source: String,
    pub expires_at: DateTime<Utc>,
}

/// Route lookup against an external traffic source. Failures are expected
/// and handled by the integrations layer; they never fail the caller.
pub trait TrafficProvider: Send + Sync {
    fn route(&self, origin: &str, destination: &str)
        -> BoxFuture<'static, Result<RouteSignal, AppError>>;
}

pub trait WeatherProvider: Send + Sync {
    fn weather(&self, lat: f64, lon: f64) -> BoxFuture<'static, Result<WeatherSignal, AppError>>;
}
