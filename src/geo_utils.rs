//! Geographic utilities: distance, centroid, and spread calculations.
//!
//! These pure functions are the metric primitives behind every spatial
//! comparison in the engine (cluster adjacency, centroid distance, duplicate
//! detection).

use crate::GeoPoint;

/// Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters (Haversine formula).
///
/// Symmetric, and zero for identical points.
pub fn haversine_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    if a.latitude == b.latitude && a.longitude == b.longitude {
        return 0.0;
    }

    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

/// Arithmetic centroid of a set of points.
///
/// Returns (0, 0) for an empty slice; callers treat that as degenerate.
/// Adequate at venue scale (hundreds of meters), where spherical effects are
/// negligible.
pub fn compute_centroid(points: &[GeoPoint]) -> GeoPoint {
    if points.is_empty() {
        return GeoPoint::new(0.0, 0.0);
    }

    let n = points.len() as f64;
    let lat: f64 = points.iter().map(|p| p.latitude).sum();
    let lng: f64 = points.iter().map(|p| p.longitude).sum();

    GeoPoint::new(lat / n, lng / n)
}

/// Mean, standard deviation, and maximum of member distances from a center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceStats {
    pub mean: f64,
    pub std_dev: f64,
    pub max: f64,
}

/// Distance statistics of `points` around `center`.
///
/// Returns all-zero stats for an empty slice.
pub fn distance_stats(points: &[GeoPoint], center: &GeoPoint) -> DistanceStats {
    if points.is_empty() {
        return DistanceStats {
            mean: 0.0,
            std_dev: 0.0,
            max: 0.0,
        };
    }

    let distances: Vec<f64> = points.iter().map(|p| haversine_distance(p, center)).collect();

    let n = distances.len() as f64;
    let mean = distances.iter().sum::<f64>() / n;
    let variance = distances.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
    let max = distances.iter().fold(0.0_f64, |acc, d| acc.max(*d));

    DistanceStats {
        mean,
        std_dev: variance.sqrt(),
        max,
    }
}

/// Spatial extent of a point set: the maximum pairwise distance (diameter),
/// in meters. Zero for fewer than two points.
///
/// This is the "location variance" the arbiter compares against
/// `max_location_variance_meters` for same-place decisions. Extent, not mean
/// radial spread: two tight groups d meters apart measure d.
pub fn spatial_extent(points: &[GeoPoint]) -> f64 {
    let mut max = 0.0_f64;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            max = max.max(haversine_distance(a, b));
        }
    }
    max
}

/// Mean and standard deviation of a plain value series (used for reported
/// accuracy statistics).
pub fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Approximate degree offsets covering a meter radius at a given latitude.
///
/// Used only to build coarse bounding boxes for spatial pre-filtering; never
/// a substitute for the exact Haversine test.
pub fn degree_padding(latitude: f64, radius_meters: f64) -> (f64, f64) {
    let lat_pad = radius_meters / 111_000.0;
    let lng_pad = radius_meters / (111_000.0 * latitude.to_radians().cos().abs().max(0.01));
    (lat_pad, lng_pad)
}
