use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub location: GeoPoint,
    pub is_available: bool,
    pub capacity: u8,
    pub last_location_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Links one courier to one order. At most one assignment per order is
/// active at a time; prior ones are deactivated before a new one is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierAssignment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub courier_id: Uuid,
    pub is_active: bool,
    pub assigned_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}
