use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::engine::risk::{delay_level, DelayLevel};
use crate::geo::zone_coordinates;
use crate::models::courier::{Courier, GeoPoint};
use crate::models::order::OrderStatus;
use crate::store::couriers::CourierRepository;
use crate::store::orders::OrderRepository;
use crate::store::snapshots::SnapshotRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrafficStatus {
    Ok,
    Unavailable,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapCourierPin {
    pub id: Uuid,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapOrder {
    pub id: Uuid,
    pub status: OrderStatus,
    pub current_eta: i64,
    pub eta_delta_minutes: i64,
    pub delay_reason: Option<String>,
    pub delay_level: DelayLevel,
    pub pickup: GeoPoint,
    pub dropoff: Option<GeoPoint>,
    pub courier: Option<MapCourierPin>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapSnapshot {
    pub couriers: Vec<Courier>,
    pub orders: Vec<MapOrder>,
    pub traffic_status: TrafficStatus,
    pub last_snapshot_age_min: Option<i64>,
}

/// Point-in-time operational view assembled from current entity state, not
/// from the queue.
pub fn build_map_snapshot(
    orders: &OrderRepository,
    couriers: &CourierRepository,
    snapshots: &SnapshotRepository,
    now: DateTime<Utc>,
) -> MapSnapshot {
    let map_orders = orders
        .in_flight()
        .into_iter()
        .map(|order| {
            let courier_pin = couriers
                .active_assignment_for_order(order.id)
                .and_then(|assignment| couriers.get(assignment.courier_id))
                .map(|courier| MapCourierPin {
                    id: courier.id,
                    lat: courier.location.lat,
                    lon: courier.location.lon,
                });

            let dropoff = (order.address_lat.is_finite() && order.address_lon.is_finite()).then(
                || GeoPoint {
                    lat: order.address_lat,
                    lon: order.address_lon,
                },
            );

            MapOrder {
                id: order.id,
                status: order.status,
                current_eta: order.current_eta,
                eta_delta_minutes: order.eta_delta_minutes,
                delay_reason: order.delay_reason.clone(),
                delay_level: delay_level(order.eta_delta_minutes),
                pickup: zone_coordinates(&order.restaurant_zone),
                dropoff,
                courier: courier_pin,
            }
        })
        .collect();

    let (traffic_status, last_snapshot_age_min) =
        match snapshots.most_recently_expiring_traffic() {
            Some(snapshot) => {
                let status = if snapshot.expires_at < now {
                    TrafficStatus::Unavailable
                } else {
                    TrafficStatus::Ok
                };
                // Age is the distance from *expiry*, not from creation.
                (status, Some(expiry_distance_min(now, snapshot.expires_at)))
            }
            None => (TrafficStatus::Unavailable, None),
        };

    MapSnapshot {
        couriers: couriers.list(),
        orders: map_orders,
        traffic_status,
        last_snapshot_age_min,
    }
}

pub fn expiry_distance_min(now: DateTime<Utc>, expires_at: DateTime<Utc>) -> i64 {
    let age_ms = (now - expires_at).num_milliseconds();
    age_ms.div_euclid(60_000).abs()
}
