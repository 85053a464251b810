use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::alert::AlertSeverity;

/// Minutes of overrun at which the normalized risk score saturates at 1.0
/// and a delay alert escalates to HIGH severity (SLA breach).
pub const SLA_BREACH_DELTA_MIN: i64 = 30;

/// Alert-worthiness trigger thresholds, independent of severity.
pub const ALERT_DELTA_MIN: i64 = 10;
pub const ALERT_RATIO: f64 = 1.5;

#[derive(Debug, Clone)]
pub struct RiskAssessment {
    pub delta: i64,
    pub ratio: f64,
    pub risk_score: f64,
    pub reasons: Value,
}

/// Maps promised/current ETA into a delta, ratio and normalized risk score.
/// Pure: no persistence, no queue, no clock.
pub fn compute_risk(promised_eta_min: i64, current_eta_min: i64) -> RiskAssessment {
    let delta = current_eta_min - promised_eta_min;
    let ratio = if promised_eta_min > 0 {
        current_eta_min as f64 / promised_eta_min as f64
    } else {
        0.0
    };
    let risk_score = (delta as f64 / SLA_BREACH_DELTA_MIN as f64).clamp(0.0, 1.0);

    RiskAssessment {
        delta,
        ratio,
        risk_score,
        reasons: json!({
            "eta_delta_minutes": delta,
            "eta_ratio": ratio,
        }),
    }
}

pub fn should_alert(delta: i64, ratio: f64) -> bool {
    delta >= ALERT_DELTA_MIN || ratio >= ALERT_RATIO
}

/// Severity for an alert that already passed the trigger threshold.
pub fn alert_severity(delta: i64) -> AlertSeverity {
    if delta >= SLA_BREACH_DELTA_MIN {
        AlertSeverity::High
    } else {
        AlertSeverity::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DelayLevel {
    Green,
    Yellow,
    Red,
}

/// Dashboard delay bucket, derived purely from the ETA delta.
pub fn delay_level(eta_delta_minutes: i64) -> DelayLevel {
    if eta_delta_minutes >= 15 {
        DelayLevel::Red
    } else if eta_delta_minutes >= 6 {
        DelayLevel::Yellow
    } else {
        DelayLevel::Green
    }
}
