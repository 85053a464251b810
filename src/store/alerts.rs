use std::sync::RwLock;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::alert::{Alert, AlertSeverity, AlertType, NotificationLog};

#[derive(Default)]
pub struct AlertRepository {
    alerts: DashMap<Uuid, Alert>,
}

impl AlertRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, alert: Alert) {
        self.alerts.insert(alert.id, alert);
    }

    pub fn get(&self, id: Uuid) -> Option<Alert> {
        self.alerts.get(&id).map(|entry| entry.value().clone())
    }

    pub fn list_for_order(&self, order_id: Uuid) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .alerts
            .iter()
            .filter(|entry| entry.value().order_id == order_id)
            .map(|entry| entry.value().clone())
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts
    }

    pub fn list_for_orders(&self, order_ids: &[Uuid]) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .alerts
            .iter()
            .filter(|entry| order_ids.contains(&entry.value().order_id))
            .map(|entry| entry.value().clone())
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts
    }

    pub fn list_filtered(
        &self,
        alert_type: Option<AlertType>,
        severity: Option<AlertSeverity>,
        is_new: Option<bool>,
    ) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .alerts
            .iter()
            .filter(|entry| {
                let alert = entry.value();
                alert_type.is_none_or(|wanted| alert.alert_type == wanted)
                    && severity.is_none_or(|wanted| alert.severity == wanted)
                    && is_new.is_none_or(|wanted| alert.is_new == wanted)
            })
            .map(|entry| entry.value().clone())
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts
    }

    /// Acknowledgement is the only way `is_new` flips to false.
    pub fn acknowledge(&self, id: Uuid, actor: Uuid) -> Option<Alert> {
        let mut alert = self.alerts.get_mut(&id)?;
        alert.is_new = false;
        alert.acknowledged_by = Some(actor);
        Some(alert.value().clone())
    }
}

/// Append-only notification ledger; the dedup check reads the most recent
/// entry per (order, alert type).
#[derive(Default)]
pub struct NotificationRepository {
    logs: RwLock<Vec<NotificationLog>>,
}

impl NotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, log: NotificationLog) {
        let mut logs = self.logs.write().expect("notification logs lock poisoned");
        logs.push(log);
    }

    pub fn last_logged_at(
        &self,
        order_id: Uuid,
        alert_type: AlertType,
    ) -> Option<DateTime<Utc>> {
        let logs = self.logs.read().expect("notification logs lock poisoned");
        logs.iter()
            .filter(|log| log.order_id == order_id && log.alert_type == Some(alert_type))
            .map(|log| log.created_at)
            .max()
    }

    pub fn list_for_order(&self, order_id: Uuid) -> Vec<NotificationLog> {
        let logs = self.logs.read().expect("notification logs lock poisoned");
        logs.iter()
            .filter(|log| log.order_id == order_id)
            .cloned()
            .collect()
    }
}
