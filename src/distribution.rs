//! Spreading POIs along a track.
//!
//! Two complementary steps bring a track's POI set to the requested size:
//!
//! - [`select_evenly`] thins out an oversupply of real POIs by picking the ones
//!   closest to evenly spaced target positions.
//! - [`create_artificial_pois`] pads an undersupply by placing synthetic points
//!   at evenly spaced positions along the track, skipping any that would land
//!   next to a real POI.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::geo_utils::{haversine_distance, interpolate, polyline_length};
use crate::projection::ProjectionResult;
use crate::{GpsPoint, RawPoi, ARTIFICIAL_EXCLUSION_RADIUS_METERS, MAX_ARTIFICIAL_POIS};

/// A raw POI paired with its projection onto the track.
#[derive(Debug, Clone, Copy)]
pub struct PoiWithProjection<'a> {
    pub poi: &'a RawPoi,
    pub projection: ProjectionResult,
}

impl PoiWithProjection<'_> {
    /// Distance from the track start to the POI's projection, in meters.
    #[inline]
    pub fn track_position(&self) -> f64 {
        self.projection.along_track_distance
    }
}

/// A synthesized point and its distance along the track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArtificialPoint {
    pub point: GpsPoint,
    /// Distance from the track start, in meters
    pub position: f64,
}

/// Pick at most `max_pois` POIs spread evenly along the track.
///
/// `pois` must already be sorted by track position. When there are no more
/// than `max_pois` of them they are all returned. Otherwise the first and last
/// POIs are always kept, and each of the `max_pois - 2` targets in between
/// (multiples of `last_position / max_pois`) takes the POI whose position is
/// closest to it, earliest first on ties.
///
/// Every target searches the whole list, so one POI can win several targets
/// and appear more than once in the result. With `max_pois == 1` only the
/// first POI is kept.
///
/// # Example
/// ```
/// use trail_annotator::{
///     find_closest_point_on_track, select_evenly, GpsPoint, PoiWithProjection, RawPoi,
/// };
///
/// let track = vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 0.01)];
/// let raw: Vec<RawPoi> = (0..6)
///     .map(|i| RawPoi::new("t", &i.to_string(), 0.0001, i as f64 * 0.002, "natural:peak"))
///     .collect();
/// let projected: Vec<PoiWithProjection> = raw
///     .iter()
///     .map(|poi| PoiWithProjection {
///         poi,
///         projection: find_closest_point_on_track(&poi.point(), &track).unwrap(),
///     })
///     .collect();
///
/// let picked = select_evenly(&projected, 3);
/// assert_eq!(picked.len(), 3);
/// assert_eq!(picked[0].poi.external_id, "0");
/// assert_eq!(picked[2].poi.external_id, "5");
/// ```
pub fn select_evenly<'a>(
    pois: &[PoiWithProjection<'a>],
    max_pois: usize,
) -> Vec<PoiWithProjection<'a>> {
    let (first, last) = match (pois.first(), pois.last()) {
        (Some(first), Some(last)) if max_pois > 0 => (*first, *last),
        _ => return Vec::new(),
    };

    if pois.len() <= max_pois {
        return pois.to_vec();
    }
    if max_pois == 1 {
        return vec![first];
    }

    let track_length = last.track_position();
    let ideal_spacing = track_length / max_pois as f64;

    let mut selected = Vec::with_capacity(max_pois);
    selected.push(first);

    let mut target = ideal_spacing;
    for _ in 1..max_pois - 1 {
        if let Some(closest) = closest_to_position(pois, target) {
            selected.push(closest);
        }
        target += ideal_spacing;
    }

    selected.push(last);
    selected
}

/// POI whose track position is nearest `target`; the earliest wins ties.
fn closest_to_position<'a>(
    pois: &[PoiWithProjection<'a>],
    target: f64,
) -> Option<PoiWithProjection<'a>> {
    let mut best: Option<(f64, PoiWithProjection<'a>)> = None;

    for candidate in pois {
        let diff = (candidate.track_position() - target).abs();
        if best.map_or(true, |(best_diff, _)| diff < best_diff) {
            best = Some((diff, *candidate));
        }
    }

    best.map(|(_, poi)| poi)
}

/// Place up to `num_to_create` synthetic points evenly along `track`.
///
/// Targets sit at multiples of `track_length / (num_to_create + 1)`, so no
/// point lands on either end of the track. Each target is interpolated within
/// its segment; a candidate closer than
/// [`ARTIFICIAL_EXCLUSION_RADIUS_METERS`] to any of `existing` is dropped and
/// the walk moves on to the next target. Rejected targets are not retried, so
/// fewer than `num_to_create` points may come back.
///
/// Tracks with fewer than two points or no length produce nothing. Requests
/// above [`MAX_ARTIFICIAL_POIS`] are capped to it.
pub fn create_artificial_pois(
    track: &[GpsPoint],
    num_to_create: usize,
    existing: &[GpsPoint],
) -> Vec<ArtificialPoint> {
    if track.len() < 2 || num_to_create == 0 {
        return Vec::new();
    }

    let total_length = polyline_length(track);
    if !(total_length > 0.0) {
        return Vec::new();
    }

    let num_to_create = num_to_create.min(MAX_ARTIFICIAL_POIS);
    let ideal_spacing = total_length / (num_to_create as f64 + 1.0);

    let mut created = Vec::with_capacity(num_to_create);
    let mut target = ideal_spacing;
    let mut accumulated = 0.0;

    for segment in track.windows(2) {
        if created.len() >= num_to_create {
            break;
        }

        let (start, end) = (&segment[0], &segment[1]);
        let segment_length = haversine_distance(start, end);

        // Zero-length segments cannot hold a target
        if segment_length > 0.0 {
            while accumulated + segment_length >= target && created.len() < num_to_create {
                let ratio = (target - accumulated) / segment_length;
                let candidate = interpolate(start, end, ratio);

                let too_close = existing.iter().any(|poi| {
                    haversine_distance(&candidate, poi) < ARTIFICIAL_EXCLUSION_RADIUS_METERS
                });

                if too_close {
                    debug!(
                        "[Distribution] Skipping artificial POI at {:.0}m, too close to a real POI",
                        target
                    );
                } else {
                    created.push(ArtificialPoint { point: candidate, position: target });
                }

                target += ideal_spacing;
            }
        }

        accumulated += segment_length;
    }

    created
}
