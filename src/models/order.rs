use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Preparing,
    Ready,
    Assigned,
    PickedUp,
    OnRoute,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Statuses shown on the live ops map: everything between acceptance
    /// and delivery, exclusive of the not-yet-started `CREATED` state.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            OrderStatus::Preparing
                | OrderStatus::Ready
                | OrderStatus::Assigned
                | OrderStatus::PickedUp
                | OrderStatus::OnRoute
        )
    }

    pub fn cancellable(&self) -> bool {
        matches!(self, OrderStatus::Created | OrderStatus::Preparing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    None,
    Pending,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub promised_eta: i64,
    pub current_eta: i64,
    pub eta_delta_minutes: i64,
    pub risk_score: f64,
    pub risk_reasons: Value,
    pub payment_status: PaymentStatus,
    pub refund_status: RefundStatus,
    pub customer_zone: String,
    pub restaurant_zone: String,
    pub address_lat: f64,
    pub address_lon: f64,
    pub external_id: Option<String>,
    pub delay_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

/// Append-only transition log; `Order.status` is the projection of the
/// latest entry per order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusEvent {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub actor_user_id: Option<Uuid>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueTicket {
    pub id: Uuid,
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub issue_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
