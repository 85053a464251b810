use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub risk_queue_size: usize,
    pub import_queue_size: usize,
    pub event_buffer_size: usize,
    pub jwt_secret: String,
    pub internal_secret: String,
    /// Base URL of the API process the workers relay events through.
    /// Unset means the workers emit through the in-process hub.
    pub relay_base_url: Option<String>,
    pub heartbeat_interval_secs: u64,
    pub heartbeat_ttl_secs: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            risk_queue_size: parse_or_default("RISK_QUEUE_SIZE", 1024)?,
            import_queue_size: parse_or_default("IMPORT_QUEUE_SIZE", 256)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "dev_secret".to_string()),
            internal_secret: env::var("INTERNAL_SECRET")
                .unwrap_or_else(|_| "internal_secret".to_string()),
            relay_base_url: env::var("RELAY_BASE_URL").ok(),
            heartbeat_interval_secs: parse_or_default("HEARTBEAT_INTERVAL_SECS", 10)?,
            heartbeat_ttl_secs: parse_or_default("HEARTBEAT_TTL_SECS", 20)?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
