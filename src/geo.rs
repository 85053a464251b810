use crate::models::courier::GeoPoint;

pub const FALLBACK_ZONE: &str = "zone-a";

/// Static zone→coordinate table used to place pickup markers on the ops map.
/// Coarse by design; zones are city districts, not exact storefronts.
pub fn zone_coordinates(zone: &str) -> GeoPoint {
    match zone {
        "zone-a" => GeoPoint {
            lat: 41.02,
            lon: 29.00,
        },
        "zone-b" => GeoPoint {
            lat: 41.06,
            lon: 28.99,
        },
        "zone-c" => GeoPoint {
            lat: 40.99,
            lon: 29.08,
        },
        _ => zone_coordinates(FALLBACK_ZONE),
    }
}
