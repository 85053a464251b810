use std::sync::RwLock;

use chrono::Utc;
use uuid::Uuid;

use crate::models::audit::AuditLog;

#[derive(Default)]
pub struct AuditRepository {
    logs: RwLock<Vec<AuditLog>>,
}

impl AuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, actor_user_id: Uuid, action: &str, entity_type: &str, entity_id: &str) {
        let mut logs = self.logs.write().expect("audit logs lock poisoned");
        logs.push(AuditLog {
            id: Uuid::new_v4(),
            actor_user_id,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            created_at: Utc::now(),
        });
    }

    pub fn list(&self, entity_id: Option<&str>) -> Vec<AuditLog> {
        let logs = self.logs.read().expect("audit logs lock poisoned");
        logs.iter()
            .filter(|log| entity_id.is_none_or(|wanted| log.entity_id == wanted))
            .cloned()
            .collect()
    }
}
