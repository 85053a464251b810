use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::models::snapshot::SignalSnapshot;

/// Expiring cache of provider responses keyed by geographic scope. Stale
/// entries are detected lazily on read and left in place.
#[derive(Default)]
pub struct SnapshotRepository {
    traffic: DashMap<String, SignalSnapshot>,
    weather: DashMap<String, SignalSnapshot>,
}

impl SnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_traffic(&self, snapshot: SignalSnapshot) {
        self.traffic.insert(snapshot.geo_scope.clone(), snapshot);
    }

    pub fn put_weather(&self, snapshot: SignalSnapshot) {
        self.weather.insert(snapshot.geo_scope.clone(), snapshot);
    }

    pub fn fresh_traffic(&self, geo_scope: &str, now: DateTime<Utc>) -> Option<SignalSnapshot> {
        self.traffic
            .get(geo_scope)
            .filter(|entry| entry.value().is_fresh(now))
            .map(|entry| entry.value().clone())
    }

    pub fn fresh_weather(&self, geo_scope: &str, now: DateTime<Utc>) -> Option<SignalSnapshot> {
        self.weather
            .get(geo_scope)
            .filter(|entry| entry.value().is_fresh(now))
            .map(|entry| entry.value().clone())
    }

    /// Fresh or stale; callers that need the unavailable/age semantics read
    /// the snapshot itself and compare expiry to now.
    pub fn latest_traffic(&self, geo_scope: &str) -> Option<SignalSnapshot> {
        self.traffic
            .get(geo_scope)
            .map(|entry| entry.value().clone())
    }

    pub fn latest_weather(&self, geo_scope: &str) -> Option<SignalSnapshot> {
        self.weather
            .get(geo_scope)
            .map(|entry| entry.value().clone())
    }

    /// The single most-recently-expiring traffic snapshot across all scopes;
    /// the dashboard derives its traffic freshness from this one entry.
    pub fn most_recently_expiring_traffic(&self) -> Option<SignalSnapshot> {
        self.traffic
            .iter()
            .max_by_key(|entry| entry.value().expires_at)
            .map(|entry| entry.value().clone())
    }
}
