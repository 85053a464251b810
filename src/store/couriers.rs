use std::sync::RwLock;

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::courier::{Courier, CourierAssignment, GeoPoint};

#[derive(Default)]
pub struct CourierRepository {
    couriers: DashMap<Uuid, Courier>,
    assignments: RwLock<Vec<CourierAssignment>>,
}

impl CourierRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, courier: Courier) {
        self.couriers.insert(courier.id, courier);
    }

    pub fn get(&self, id: Uuid) -> Option<Courier> {
        self.couriers.get(&id).map(|entry| entry.value().clone())
    }

    pub fn list(&self) -> Vec<Courier> {
        self.couriers
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Couriers authenticate with their user id; the courier record is
    /// created lazily on first contact.
    pub fn ensure(&self, id: Uuid, name: &str) -> Courier {
        self.couriers
            .entry(id)
            .or_insert_with(|| Courier {
                id,
                name: name.to_string(),
                location: GeoPoint {
                    lat: 41.02,
                    lon: 29.0,
                },
                is_available: true,
                capacity: 1,
                last_location_at: None,
                updated_at: Utc::now(),
            })
            .value()
            .clone()
    }

    pub fn set_location(&self, id: Uuid, location: GeoPoint) -> Option<Courier> {
        let mut courier = self.couriers.get_mut(&id)?;
        courier.location = location;
        courier.last_location_at = Some(Utc::now());
        courier.updated_at = Utc::now();
        Some(courier.value().clone())
    }

    pub fn set_availability(&self, id: Uuid, is_available: bool) -> Option<Courier> {
        let mut courier = self.couriers.get_mut(&id)?;
        courier.is_available = is_available;
        courier.updated_at = Utc::now();
        Some(courier.value().clone())
    }

    /// Creates the assignment after deactivating any still-active assignment
    /// for the order, so at most one is active per order at a time.
    pub fn create_assignment(&self, order_id: Uuid, courier_id: Uuid) -> CourierAssignment {
        let now = Utc::now();
        let mut assignments = self.assignments.write().expect("assignments lock poisoned");
        for assignment in assignments.iter_mut() {
            if assignment.order_id == order_id && assignment.is_active {
                assignment.is_active = false;
                assignment.ended_at = Some(now);
            }
        }

        let assignment = CourierAssignment {
            id: Uuid::new_v4(),
            order_id,
            courier_id,
            is_active: true,
            assigned_at: now,
            ended_at: None,
        };
        assignments.push(assignment.clone());
        assignment
    }

    /// Most-recently-assigned still-active assignment for the order.
    pub fn active_assignment_for_order(&self, order_id: Uuid) -> Option<CourierAssignment> {
        let assignments = self.assignments.read().expect("assignments lock poisoned");
        assignments
            .iter()
            .filter(|a| a.order_id == order_id && a.is_active && a.ended_at.is_none())
            .max_by_key(|a| a.assigned_at)
            .cloned()
    }

    pub fn active_assignment(&self, courier_id: Uuid, order_id: Uuid) -> Option<CourierAssignment> {
        self.active_assignment_for_order(order_id)
            .filter(|a| a.courier_id == courier_id)
    }

    pub fn active_assignments_for_courier(&self, courier_id: Uuid) -> Vec<CourierAssignment> {
        let assignments = self.assignments.read().expect("assignments lock poisoned");
        let mut active: Vec<CourierAssignment> = assignments
            .iter()
            .filter(|a| a.courier_id == courier_id && a.is_active && a.ended_at.is_none())
            .cloned()
            .collect();
        active.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at));
        active
    }

    pub fn end_assignment(&self, assignment_id: Uuid) {
        let mut assignments = self.assignments.write().expect("assignments lock poisoned");
        if let Some(assignment) = assignments.iter_mut().find(|a| a.id == assignment_id) {
            assignment.is_active = false;
            assignment.ended_at = Some(Utc::now());
        }
    }
}
