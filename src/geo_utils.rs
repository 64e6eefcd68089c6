//! # Geographic Utilities
//!
//! Distance and projection primitives used by the track-position indexer and
//! the POI distribution steps.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`closest_point_on_segment`] | Planar projection of a point onto a segment |
//! | [`interpolate`] | Linear interpolation between two points |
//! | [`polyline_length`] | Total length of a track in meters |
//! | [`compute_bounds`] | Bounding box of a track |
//!
//! ## Example
//!
//! ```rust
//! use trail_annotator::{GpsPoint, geo_utils};
//!
//! let track = vec![
//!     GpsPoint::new(45.8326, 6.8652),
//!     GpsPoint::new(45.8340, 6.8670),
//!     GpsPoint::new(45.8360, 6.8690),
//! ];
//!
//! let length = geo_utils::polyline_length(&track);
//! assert!(length > 0.0);
//!
//! let bounds = geo_utils::compute_bounds(&track).unwrap();
//! assert_eq!(bounds.min_lat, 45.8326);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! Distances use the haversine formula on a sphere of radius
//! [`EARTH_RADIUS_METERS`] (6,371 km). The radius is fixed here rather than
//! taken from `geo::Haversine` (which uses 6,371,008.8 m) so stored track
//! positions stay stable across `geo` releases.
//!
//! ### Planar Projection
//!
//! [`closest_point_on_segment`] and [`interpolate`] treat latitude/longitude as
//! flat x/y coordinates. Track segments are well under a kilometer, so the
//! error against a geodesic projection is negligible, and the results feed
//! stored positions, so the approximation must not be swapped out.

use geo::{BoundingRect, Coord, LineString};

use crate::{Bounds, GpsPoint, EARTH_RADIUS_METERS};

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two GPS points in meters.
///
/// NaN inputs propagate to a NaN result.
///
/// # Example
///
/// ```rust
/// use trail_annotator::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let phi1 = p1.latitude.to_radians();
    let phi2 = p2.latitude.to_radians();
    let delta_phi = (p2.latitude - p1.latitude).to_radians();
    let delta_lambda = (p2.longitude - p1.longitude).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Calculate the total length of a polyline in meters.
///
/// Sums the haversine distance between consecutive points. Empty or
/// single-point tracks return 0.0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Projection Functions
// =============================================================================

/// Find the point on segment `[v, w]` closest to `p`.
///
/// Longitude is used as x and latitude as y. The projection parameter is
/// clamped to `[0, 1]`, so the result always lies on the segment. A
/// zero-length segment returns `v`.
///
/// # Example
///
/// ```rust
/// use trail_annotator::{GpsPoint, geo_utils};
///
/// let v = GpsPoint::new(0.0, 0.0);
/// let w = GpsPoint::new(0.0, 1.0);
///
/// let foot = geo_utils::closest_point_on_segment(&GpsPoint::new(0.2, 0.25), &v, &w);
/// assert_eq!(foot, GpsPoint::new(0.0, 0.25));
///
/// // Beyond the end of the segment the projection clamps to `w`
/// let clamped = geo_utils::closest_point_on_segment(&GpsPoint::new(0.0, 3.0), &v, &w);
/// assert_eq!(clamped, w);
/// ```
pub fn closest_point_on_segment(p: &GpsPoint, v: &GpsPoint, w: &GpsPoint) -> GpsPoint {
    let (vx, vy) = (v.longitude, v.latitude);
    let (wx, wy) = (w.longitude, w.latitude);
    let (px, py) = (p.longitude, p.latitude);

    let l2 = (wx - vx) * (wx - vx) + (wy - vy) * (wy - vy);
    if l2 == 0.0 {
        return *v;
    }

    let t = ((px - vx) * (wx - vx) + (py - vy) * (wy - vy)) / l2;
    let t = t.clamp(0.0, 1.0);

    GpsPoint::new(vy + t * (wy - vy), vx + t * (wx - vx))
}

/// Linearly interpolate between `p1` and `p2`; `ratio` 0.0 is `p1`, 1.0 is `p2`.
#[inline]
pub fn interpolate(p1: &GpsPoint, p2: &GpsPoint, ratio: f64) -> GpsPoint {
    GpsPoint::new(
        p1.latitude + ratio * (p2.latitude - p1.latitude),
        p1.longitude + ratio * (p2.longitude - p1.longitude),
    )
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a track.
///
/// Returns `None` for an empty track.
pub fn compute_bounds(points: &[GpsPoint]) -> Option<Bounds> {
    let line: LineString<f64> = points
        .iter()
        .map(|p| Coord { x: p.longitude, y: p.latitude })
        .collect();

    line.bounding_rect().map(|rect| Bounds {
        min_lat: rect.min().y,
        max_lat: rect.max().y,
        min_lng: rect.min().x,
        max_lng: rect.max().x,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    /// Meters per degree of arc on the crate's sphere.
    const METERS_PER_DEGREE: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

    #[test]
    fn test_haversine_distance_same_point() {
        let p = GpsPoint::new(45.8326, 6.8652);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_haversine_distance_one_degree_along_equator() {
        let a = GpsPoint::new(0.0, 0.0);
        let b = GpsPoint::new(0.0, 1.0);
        assert!(approx_eq(haversine_distance(&a, &b), METERS_PER_DEGREE, 1e-6));
    }

    #[test]
    fn test_haversine_distance_known_value() {
        // London to Paris is approximately 344 km
        let london = GpsPoint::new(51.5074, -0.1278);
        let paris = GpsPoint::new(48.8566, 2.3522);
        let dist = haversine_distance(&london, &paris);
        assert!(approx_eq(dist, 343_560.0, 5000.0));
    }

    #[test]
    fn test_haversine_distance_nan_propagates() {
        let a = GpsPoint::new(f64::NAN, 0.0);
        let b = GpsPoint::new(0.0, 0.0);
        assert!(haversine_distance(&a, &b).is_nan());
    }

    #[test]
    fn test_closest_point_on_segment_interior() {
        let v = GpsPoint::new(0.0, 0.0);
        let w = GpsPoint::new(0.0, 2.0);
        let foot = closest_point_on_segment(&GpsPoint::new(0.5, 1.5), &v, &w);
        assert_eq!(foot, GpsPoint::new(0.0, 1.5));
    }

    #[test]
    fn test_closest_point_on_segment_clamps_before_start() {
        let v = GpsPoint::new(0.0, 0.0);
        let w = GpsPoint::new(0.0, 2.0);
        let foot = closest_point_on_segment(&GpsPoint::new(0.1, -1.0), &v, &w);
        assert_eq!(foot, v);
    }

    #[test]
    fn test_closest_point_on_zero_length_segment() {
        let v = GpsPoint::new(10.0, 20.0);
        let foot = closest_point_on_segment(&GpsPoint::new(11.0, 21.0), &v, &v);
        assert_eq!(foot, v);
    }

    #[test]
    fn test_interpolate_midpoint() {
        let mid = interpolate(&GpsPoint::new(0.0, 0.0), &GpsPoint::new(2.0, 4.0), 0.5);
        assert_eq!(mid, GpsPoint::new(1.0, 2.0));
    }

    #[test]
    fn test_polyline_length_empty() {
        let empty: Vec<GpsPoint> = vec![];
        assert_eq!(polyline_length(&empty), 0.0);
    }

    #[test]
    fn test_polyline_length_single_point() {
        let single = vec![GpsPoint::new(45.8326, 6.8652)];
        assert_eq!(polyline_length(&single), 0.0);
    }

    #[test]
    fn test_polyline_length_sums_segments() {
        let track = vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.0, 1.0),
            GpsPoint::new(0.0, 2.0),
        ];
        assert!(approx_eq(polyline_length(&track), 2.0 * METERS_PER_DEGREE, 1e-6));
    }

    #[test]
    fn test_compute_bounds() {
        let track = vec![
            GpsPoint::new(51.50, -0.13),
            GpsPoint::new(51.51, -0.12),
            GpsPoint::new(51.505, -0.125),
        ];
        let bounds = compute_bounds(&track).unwrap();
        assert_eq!(bounds.min_lat, 51.50);
        assert_eq!(bounds.max_lat, 51.51);
        assert_eq!(bounds.min_lng, -0.13);
        assert_eq!(bounds.max_lng, -0.12);
    }

    #[test]
    fn test_compute_bounds_empty() {
        assert!(compute_bounds(&[]).is_none());
    }
}
