use chrono::{DateTime, Duration, Utc};

/// Sliding suppression window per (order, alert type). Each check measures
/// from "now" against the most recent notification-log entry, not from a
/// fixed anchor.
pub const DEDUP_WINDOW_MIN: i64 = 15;

pub fn is_suppressed(last_notified_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_notified_at {
        Some(logged_at) => logged_at >= now - Duration::minutes(DEDUP_WINDOW_MIN),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{is_suppressed, DEDUP_WINDOW_MIN};

    #[test]
    fn no_prior_notification_is_not_suppressed() {
        assert!(!is_suppressed(None, Utc::now()));
    }

    #[test]
    fn recent_notification_suppresses() {
        let now = Utc::now();
        assert!(is_suppressed(Some(now - Duration::minutes(1)), now));
        assert!(is_suppressed(
            Some(now - Duration::minutes(DEDUP_WINDOW_MIN)),
            now
        ));
    }

    #[test]
    fn window_slides_past_old_notifications() {
        let now = Utc::now();
        let stale = now - Duration::minutes(DEDUP_WINDOW_MIN) - Duration::seconds(1);
        assert!(!is_suppressed(Some(stale), now));
    }
}
