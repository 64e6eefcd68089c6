//! Projection of points onto a track.
//!
//! For a query point, [`find_closest_point_on_track`] scans every segment of
//! the track, keeps the closest projection and reports how far along the
//! track that projection lies. Tracks hold at most a few hundred points, so a
//! brute-force scan is used instead of a spatial index.

use serde::{Deserialize, Serialize};

use crate::geo_utils::{closest_point_on_segment, haversine_distance};
use crate::GpsPoint;

/// Closest point on a track to a query point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    /// Closest point on the track
    pub point: GpsPoint,
    /// Great-circle distance from the query point to `point`, in meters
    pub distance: f64,
    /// Distance from the start of the track to `point`, in meters
    pub along_track_distance: f64,
}

/// Find the point of `track` closest to `point`.
///
/// Returns `None` for an empty track. A single-point track projects onto that
/// point with an along-track distance of zero.
///
/// Segments are compared with a strict `<`, so when two segments are equally
/// close the earlier one wins. The along-track distance is the summed length of
/// all segments before the winning one plus the distance from the winning
/// segment's start to the projected point.
///
/// # Example
/// ```
/// use trail_annotator::{find_closest_point_on_track, GpsPoint};
///
/// let track = vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 1.0), GpsPoint::new(0.0, 2.0)];
/// let hit = find_closest_point_on_track(&GpsPoint::new(0.0005, 0.5), &track).unwrap();
///
/// assert_eq!(hit.point, GpsPoint::new(0.0, 0.5));
/// assert!(hit.distance > 55.0 && hit.distance < 56.0);
/// ```
pub fn find_closest_point_on_track(
    point: &GpsPoint,
    track: &[GpsPoint],
) -> Option<ProjectionResult> {
    let first = track.first()?;

    if track.len() == 1 {
        return Some(ProjectionResult {
            point: *first,
            distance: haversine_distance(point, first),
            along_track_distance: 0.0,
        });
    }

    let mut best = ProjectionResult {
        point: *first,
        distance: f64::MAX,
        along_track_distance: 0.0,
    };
    let mut consumed = 0.0;

    for segment in track.windows(2) {
        let (start, end) = (&segment[0], &segment[1]);
        let candidate = closest_point_on_segment(point, start, end);
        let distance = haversine_distance(point, &candidate);

        if distance < best.distance {
            best = ProjectionResult {
                point: candidate,
                distance,
                along_track_distance: consumed + haversine_distance(start, &candidate),
            };
        }

        consumed += haversine_distance(start, end);
    }

    Some(best)
}

/// Check whether `point` lies within `max_distance_meters` of `track`.
///
/// The threshold is inclusive. An empty track is never near anything.
pub fn is_point_near_track(point: &GpsPoint, track: &[GpsPoint], max_distance_meters: f64) -> bool {
    find_closest_point_on_track(point, track)
        .map_or(false, |hit| hit.distance <= max_distance_meters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EARTH_RADIUS_METERS;

    const METERS_PER_DEGREE: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn straight_track() -> Vec<GpsPoint> {
        vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.0, 1.0),
            GpsPoint::new(0.0, 2.0),
        ]
    }

    #[test]
    fn test_empty_track_has_no_projection() {
        assert!(find_closest_point_on_track(&GpsPoint::new(0.0, 0.0), &[]).is_none());
        assert!(!is_point_near_track(&GpsPoint::new(0.0, 0.0), &[], f64::MAX));
    }

    #[test]
    fn test_single_point_track_reports_real_distance() {
        let track = vec![GpsPoint::new(0.0, 0.0)];
        let hit = find_closest_point_on_track(&GpsPoint::new(0.0, 0.01), &track).unwrap();

        assert_eq!(hit.point, track[0]);
        assert_eq!(hit.along_track_distance, 0.0);
        assert!(approx_eq(hit.distance, 0.01 * METERS_PER_DEGREE, 1e-6));
    }

    #[test]
    fn test_perpendicular_to_first_segment() {
        let hit =
            find_closest_point_on_track(&GpsPoint::new(0.0005, 0.5), &straight_track()).unwrap();

        assert_eq!(hit.point, GpsPoint::new(0.0, 0.5));
        assert!(approx_eq(hit.distance, 0.0005 * METERS_PER_DEGREE, 1e-6));
        assert!(approx_eq(hit.along_track_distance, 0.5 * METERS_PER_DEGREE, 1e-6));
    }

    #[test]
    fn test_along_track_includes_prior_segments() {
        let hit =
            find_closest_point_on_track(&GpsPoint::new(-0.001, 1.25), &straight_track()).unwrap();

        assert_eq!(hit.point, GpsPoint::new(0.0, 1.25));
        assert!(approx_eq(hit.along_track_distance, 1.25 * METERS_PER_DEGREE, 1e-6));
    }

    #[test]
    fn test_tie_goes_to_first_segment() {
        // The shared vertex is the closest point on both segments
        let hit = find_closest_point_on_track(&GpsPoint::new(0.5, 1.0), &straight_track()).unwrap();

        assert_eq!(hit.point, GpsPoint::new(0.0, 1.0));
        // Reached at the end of segment one rather than the start of segment two
        assert!(approx_eq(hit.along_track_distance, METERS_PER_DEGREE, 1e-6));
    }

    #[test]
    fn test_beyond_track_end_clamps_to_last_point() {
        let hit = find_closest_point_on_track(&GpsPoint::new(0.0, 2.5), &straight_track()).unwrap();

        assert_eq!(hit.point, GpsPoint::new(0.0, 2.0));
        assert!(approx_eq(hit.along_track_distance, 2.0 * METERS_PER_DEGREE, 1e-6));
        assert!(approx_eq(hit.distance, 0.5 * METERS_PER_DEGREE, 1e-6));
    }

    #[test]
    fn test_proximity_threshold_is_inclusive() {
        let track = straight_track();
        let poi = GpsPoint::new(0.004, 0.3);
        let distance = find_closest_point_on_track(&poi, &track).unwrap().distance;

        assert!(is_point_near_track(&poi, &track, distance));
        assert!(!is_point_near_track(&poi, &track, distance - 0.1));
    }
}
