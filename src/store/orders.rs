use std::sync::RwLock;

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::order::{IssueTicket, Order, OrderItem, OrderStatus, OrderStatusEvent};

/// Single source of truth for order state. Writes are last-write-wins; risk
/// recomputation always reads current state through here rather than any
/// value captured at enqueue time.
#[derive(Default)]
pub struct OrderRepository {
    orders: DashMap<Uuid, Order>,
    items: RwLock<Vec<OrderItem>>,
    status_events: RwLock<Vec<OrderStatusEvent>>,
    issues: RwLock<Vec<IssueTicket>>,
}

impl OrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, order: Order) {
        self.orders.insert(order.id, order);
    }

    pub fn get(&self, id: Uuid) -> Option<Order> {
        self.orders.get(&id).map(|entry| entry.value().clone())
    }

    pub fn get_for_customer(&self, id: Uuid, customer_id: Uuid) -> Option<Order> {
        self.get(id).filter(|order| order.customer_id == customer_id)
    }

    pub fn list_for_customer(&self, customer_id: Uuid, limit: usize) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| entry.value().customer_id == customer_id)
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders.truncate(limit);
        orders
    }

    pub fn list_filtered(
        &self,
        status: Option<OrderStatus>,
        min_risk: Option<f64>,
        zone: Option<&str>,
        limit: usize,
    ) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| {
                let order = entry.value();
                status.is_none_or(|wanted| order.status == wanted)
                    && min_risk.is_none_or(|floor| order.risk_score >= floor)
                    && zone.is_none_or(|wanted| order.customer_zone == wanted)
            })
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders.truncate(limit);
        orders
    }

    /// Applies a mutation to the stored order and returns the updated copy.
    pub fn update<F>(&self, id: Uuid, mutate: F) -> Option<Order>
    where
        F: FnOnce(&mut Order),
    {
        let mut entry = self.orders.get_mut(&id)?;
        mutate(entry.value_mut());
        entry.updated_at = Utc::now();
        Some(entry.value().clone())
    }

    pub fn external_id_exists(&self, external_id: &str) -> bool {
        self.orders
            .iter()
            .any(|entry| entry.value().external_id.as_deref() == Some(external_id))
    }

    pub fn in_flight(&self) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|entry| entry.value().status.is_in_flight())
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn count_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Order) -> bool,
    {
        self.orders
            .iter()
            .filter(|entry| predicate(entry.value()))
            .count()
    }

    pub fn insert_items(&self, mut new_items: Vec<OrderItem>) {
        let mut items = self.items.write().expect("order items lock poisoned");
        items.append(&mut new_items);
    }

    pub fn items_for_order(&self, order_id: Uuid) -> Vec<OrderItem> {
        let items = self.items.read().expect("order items lock poisoned");
        items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect()
    }

    pub fn record_status_event(
        &self,
        order_id: Uuid,
        status: OrderStatus,
        actor_user_id: Option<Uuid>,
    ) {
        let mut events = self
            .status_events
            .write()
            .expect("status events lock poisoned");
        events.push(OrderStatusEvent {
            id: Uuid::new_v4(),
            order_id,
            status,
            actor_user_id,
            recorded_at: Utc::now(),
        });
    }

    pub fn status_history(&self, order_id: Uuid) -> Vec<OrderStatusEvent> {
        let events = self
            .status_events
            .read()
            .expect("status events lock poisoned");
        events
            .iter()
            .filter(|event| event.order_id == order_id)
            .cloned()
            .collect()
    }

    pub fn insert_issue(&self, issue: IssueTicket) {
        let mut issues = self.issues.write().expect("issues lock poisoned");
        issues.push(issue);
    }

    pub fn issues_for(&self, order_id: Uuid, customer_id: Uuid) -> Vec<IssueTicket> {
        let issues = self.issues.read().expect("issues lock poisoned");
        issues
            .iter()
            .filter(|issue| issue.order_id == order_id && issue.customer_id == customer_id)
            .cloned()
            .collect()
    }
}
