use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::dedup;
use crate::engine::risk::{alert_severity, compute_risk, should_alert};
use crate::error::AppError;
use crate::integrations;
use crate::models::alert::{
    Alert, AlertSeverity, AlertType, NotificationChannel, NotificationLog, NotificationStatus,
};
use crate::queue::{Job, RiskJob, MAX_ATTEMPTS, RISK_QUEUE};
use crate::realtime::{customer_room, relay::EventSink};
use crate::state::AppState;

pub async fn run_risk_worker(
    state: Arc<AppState>,
    sink: Arc<dyn EventSink>,
    mut rx: mpsc::Receiver<Job<RiskJob>>,
) {
    info!("risk worker started");

    while let Some(job) = rx.recv().await {
        state
            .metrics
            .jobs_in_queue
            .with_label_values(&[RISK_QUEUE])
            .dec();

        let start = Instant::now();
        match process_risk_job(&state, sink.as_ref(), job.payload.order_id).await {
            Ok(()) => {
                let elapsed = start.elapsed().as_secs_f64();
                state
                    .metrics
                    .job_latency_seconds
                    .with_label_values(&[RISK_QUEUE, "success"])
                    .observe(elapsed);
                state
                    .metrics
                    .jobs_total
                    .with_label_values(&[RISK_QUEUE, "success"])
                    .inc();
            }
            Err(err) => {
                let elapsed = start.elapsed().as_secs_f64();
                state
                    .metrics
                    .job_latency_seconds
                    .with_label_values(&[RISK_QUEUE, "error"])
                    .observe(elapsed);
                state
                    .metrics
                    .jobs_total
                    .with_label_values(&[RISK_QUEUE, "error"])
                    .inc();
                error!(error = %err, order_id = %job.payload.order_id, "risk job failed");

                if job.attempt + 1 < MAX_ATTEMPTS {
                    let retry = Job {
                        payload: job.payload,
                        attempt: job.attempt + 1,
                    };
                    if let Err(err) = state.risk_queue.enqueue_job(retry).await {
                        error!(error = %err, "failed to re-enqueue risk job");
                    }
                }
            }
        }
    }

    warn!("risk worker stopped: queue channel closed");
}

/// Recomputes ETA delta/risk for one order. Safe to re-run: reads the
/// order's current persisted state, writes last-write-wins, and the alert
/// path is guarded by the notification-log dedup window.
pub async fn process_risk_job(
    state: &AppState,
    sink: &dyn EventSink,
    order_id: Uuid,
) -> Result<(), AppError> {
    let Some(order) = state.orders.get(order_id) else {
        // Unknown order: nothing to recompute, never invent placeholder state.
        return Ok(());
    };

    let scope = order.id.to_string();
    let traffic =
        integrations::get_traffic(state, &order.restaurant_zone, &order.customer_zone, &scope)
            .await;
    integrations::get_weather(state, order.address_lat, order.address_lon, &scope).await;

    let current_eta = traffic
        .signal
        .eta_with_traffic_min
        .unwrap_or(order.current_eta);
    let risk = compute_risk(order.promised_eta, current_eta);

    let Some(updated) = state.orders.update(order_id, |o| {
        o.current_eta = current_eta;
        o.eta_delta_minutes = risk.delta;
        o.risk_score = risk.risk_score;
        o.risk_reasons = risk.reasons.clone();
    }) else {
        return Ok(());
    };

    if should_alert(risk.delta, risk.ratio) {
        let now = Utc::now();
        let last_logged = state
            .notifications
            .last_logged_at(order_id, AlertType::DelayRisk);

        if !dedup::is_suppressed(last_logged, now) {
            let severity = alert_severity(risk.delta);
            let alert = Alert {
                id: Uuid::new_v4(),
                order_id,
                alert_type: AlertType::DelayRisk,
                severity,
                is_new: true,
                acknowledged_by: None,
                created_at: now,
            };
            state.alerts.insert(alert.clone());
            state.notifications.insert(NotificationLog {
                id: Uuid::new_v4(),
                user_id: order.customer_id,
                order_id,
                alert_type: Some(AlertType::DelayRisk),
                channel: NotificationChannel::Push,
                status: NotificationStatus::Queued,
                created_at: now,
            });
            state
                .metrics
                .alerts_created_total
                .with_label_values(&[severity.as_str()])
                .inc();

            let alert_payload = json!({
                "alert_id": alert.id,
                "order_id": order_id,
                "type": alert.alert_type,
                "severity": alert.severity,
            });
            sink.emit(
                customer_room(order.customer_id),
                "customer.alerts.new".to_string(),
                alert_payload.clone(),
            )
            .await?;
            sink.emit("ops".to_string(), "ops.alerts.new".to_string(), alert_payload)
                .await?;

            // Fires on every non-suppressed HIGH evaluation, not once per order.
            if severity == AlertSeverity::High {
                sink.emit(
                    "ops".to_string(),
                    "ops.alerts.escalated".to_string(),
                    json!({
                        "alert_id": alert.id,
                        "order_id": order_id,
                        "severity": alert.severity,
                        "sla_breach": true,
                    }),
                )
                .await?;
            }
        }
    }

    sink.emit(
        customer_room(order.customer_id),
        "customer.order.updated".to_string(),
        json!({
            "order_id": order_id,
            "status": updated.status,
            "current_eta": updated.current_eta,
            "eta_delta_minutes": updated.eta_delta_minutes,
        }),
    )
    .await?;
    sink.emit(
        "ops".to_string(),
        "ops.orders.updated".to_string(),
        json!({
            "order_id": order_id,
            "status": updated.status,
            "risk_score": updated.risk_score,
        }),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{Duration, Utc};
    use futures::future::BoxFuture;
    use serde_json::{json, Value};
    use uuid::Uuid;

    use super::process_risk_job;
    use crate::config::Config;
    use crate::error::AppError;
    use crate::models::alert::{
        AlertSeverity, AlertType, NotificationChannel, NotificationLog, NotificationStatus,
    };
    use crate::models::order::{Order, OrderStatus, PaymentStatus, RefundStatus};
    use crate::models::snapshot::SignalSnapshot;
    use crate::providers::{RouteSignal, TrafficLevel};
    use crate::realtime::relay::EventSink;
    use crate::state::AppState;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<(String, String, Value)>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<(String, String, Value)> {
            self.events.lock().unwrap().clone()
        }

        fn count(&self, event: &str) -> usize {
            self.events()
                .iter()
                .filter(|(_, name, _)| name == event)
                .count()
        }
    }

    impl EventSink for RecordingSink {
        fn emit(
            &self,
            room: String,
            event: String,
            payload: Value,
        ) -> BoxFuture<'static, Result<(), AppError>> {
            self.events.lock().unwrap().push((room, event, payload));
            Box::pin(async { Ok(()) })
        }
    }

    fn test_config() -> Config {
        Config {
            http_port: 0,
            log_level: "info".to_string(),
            risk_queue_size: 64,
            import_queue_size: 16,
            event_buffer_size: 64,
            jwt_secret: "test_secret".to_string(),
            internal_secret: "internal_secret".to_string(),
            relay_base_url: None,
            heartbeat_interval_secs: 10,
            heartbeat_ttl_secs: 20,
        }
    }

    fn seed_order(state: &AppState, promised_eta: i64) -> Order {
        let order = Order {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            status: OrderStatus::Preparing,
            promised_eta,
            current_eta: promised_eta,
            eta_delta_minutes: 0,
            risk_score: 0.0,
            risk_reasons: json!({}),
            payment_status: PaymentStatus::Paid,
            refund_status: RefundStatus::None,
            customer_zone: "zone-b".to_string(),
            restaurant_zone: "zone-a".to_string(),
            address_lat: 41.03,
            address_lon: 29.01,
            external_id: None,
            delay_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        state.orders.insert(order.clone());
        order
    }

    /// Pins the traffic signal the worker will consume for this order.
    fn pin_traffic_eta(state: &AppState, order_id: Uuid, eta_with_traffic_min: i64) {
        let signal = RouteSignal {
            eta_normal_min: 20,
            eta_with_traffic_min: Some(eta_with_traffic_min),
            level: TrafficLevel::Heavy,
            source: "mock-traffic".to_string(),
            expires_at: Utc::now() + Duration::minutes(5),
        };
        state.snapshots.put_traffic(SignalSnapshot {
            geo_scope: order_id.to_string(),
            payload: serde_json::to_value(&signal).unwrap(),
            source: signal.source.clone(),
            expires_at: signal.expires_at,
        });
    }

    #[tokio::test]
    async fn high_delta_creates_high_alert_and_one_escalation() {
        let (state, _risk_rx, _import_rx) = AppState::new(&test_config());
        let sink = RecordingSink::default();
        let order = seed_order(&state, 20);
        pin_traffic_eta(&state, order.id, 55);

        process_risk_job(&state, &sink, order.id).await.unwrap();

        let updated = state.orders.get(order.id).unwrap();
        assert_eq!(updated.current_eta, 55);
        assert_eq!(updated.eta_delta_minutes, 35);
        assert_eq!(updated.risk_score, 1.0);

        let alerts = state.alerts.list_for_order(order.id);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::High);
        assert!(alerts[0].is_new);

        assert_eq!(sink.count("customer.alerts.new"), 1);
        assert_eq!(sink.count("ops.alerts.new"), 1);
        assert_eq!(sink.count("ops.alerts.escalated"), 1);
        let escalations: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|(room, event, _)| event == "ops.alerts.escalated" && room == "ops")
            .collect();
        assert_eq!(escalations[0].2["sla_breach"], true);
    }

    #[tokio::test]
    async fn second_recompute_within_window_is_suppressed() {
        let (state, _risk_rx, _import_rx) = AppState::new(&test_config());
        let sink = RecordingSink::default();
        let order = seed_order(&state, 20);
        pin_traffic_eta(&state, order.id, 40);

        process_risk_job(&state, &sink, order.id).await.unwrap();
        process_risk_job(&state, &sink, order.id).await.unwrap();

        assert_eq!(state.alerts.list_for_order(order.id).len(), 1);
        assert_eq!(state.notifications.list_for_order(order.id).len(), 1);
        assert_eq!(sink.count("customer.alerts.new"), 1);
        // The order-update events still fire for every recompute.
        assert_eq!(sink.count("customer.order.updated"), 2);
    }

    #[tokio::test]
    async fn recompute_after_window_creates_a_second_alert() {
        let (state, _risk_rx, _import_rx) = AppState::new(&test_config());
        let sink = RecordingSink::default();
        let order = seed_order(&state, 20);
        pin_traffic_eta(&state, order.id, 40);

        // Simulate an alert logged just past the suppression window.
        state.notifications.insert(NotificationLog {
            id: Uuid::new_v4(),
            user_id: order.customer_id,
            order_id: order.id,
            alert_type: Some(AlertType::DelayRisk),
            channel: NotificationChannel::Push,
            status: NotificationStatus::Queued,
            created_at: Utc::now() - Duration::minutes(16),
        });

        process_risk_job(&state, &sink, order.id).await.unwrap();

        assert_eq!(state.alerts.list_for_order(order.id).len(), 1);
        assert_eq!(state.notifications.list_for_order(order.id).len(), 2);
    }

    #[tokio::test]
    async fn on_time_order_emits_updates_without_alerts() {
        let (state, _risk_rx, _import_rx) = AppState::new(&test_config());
        let sink = RecordingSink::default();
        let order = seed_order(&state, 25);
        pin_traffic_eta(&state, order.id, 25);

        process_risk_job(&state, &sink, order.id).await.unwrap();

        assert!(state.alerts.list_for_order(order.id).is_empty());
        assert_eq!(sink.count("customer.order.updated"), 1);
        assert_eq!(sink.count("ops.orders.updated"), 1);
        let updated = state.orders.get(order.id).unwrap();
        assert_eq!(updated.risk_score, 0.0);
    }

    #[tokio::test]
    async fn unknown_order_is_a_no_op() {
        let (state, _risk_rx, _import_rx) = AppState::new(&test_config());
        let sink = RecordingSink::default();

        process_risk_job(&state, &sink, Uuid::new_v4()).await.unwrap();

        assert!(sink.events().is_empty());
    }
}
