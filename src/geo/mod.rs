//! Geometry helpers for proximity ranking: polygon centroids and
//! great-circle distances.
//!
//! The centroid is the arithmetic mean of the vertex coordinates, not a
//! geodesically correct center of mass. At neighborhood scale (a few km
//! across) the difference is far below the one-decimal rounding applied to
//! every reported distance, so the cheap version is the right one.

mod catalog;

pub use catalog::{CommunityCatalog, DEFAULT_NEARBY_LIMIT, REGIONAL_COUNTIES};

use crate::models::GeoPoint;

/// Mean Earth radius in kilometers for the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Arithmetic-mean centroid of a vertex ring.
///
/// Returns `None` for an empty ring. Callers are expected to feed polygons
/// with at least three vertices (the catalog loader enforces this); the
/// mean is still well-defined for fewer, it just is not a meaningful
/// center.
pub fn centroid(points: &[GeoPoint]) -> Option<GeoPoint> {
    if points.is_empty() {
        return None;
    }

    let count = points.len() as f64;
    let (lon_sum, lat_sum) = points.iter().fold((0.0, 0.0), |(lon, lat), p| {
        (lon + p.longitude, lat + p.latitude)
    });

    Some(GeoPoint {
        longitude: lon_sum / count,
        latitude: lat_sum / count,
    })
}

/// Great-circle distance between two points in kilometers.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Round a distance to one decimal place for display.
pub fn round_km(distance: f64) -> f64 {
    (distance * 10.0).round() / 10.0
}
