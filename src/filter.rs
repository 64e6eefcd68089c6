//! POI filtering pipeline.
//!
//! For one track: project every raw POI onto the polyline, keep those within
//! [`PROXIMITY_THRESHOLD_METERS`], order them by track position, thin them
//! out to `max_pois` with [`select_evenly`] and pad the remainder with
//! [`create_artificial_pois`]. The store-facing functions regenerate a
//! track's filtered set from scratch on every run.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::distribution::{create_artificial_pois, select_evenly, PoiWithProjection};
use crate::error::{AnnotatorError, Result};
use crate::progress::ProgressReporter;
use crate::projection::find_closest_point_on_track;
use crate::store::TrackStore;
use crate::{FilterConfig, FilteredPoi, GpsPoint, RawPoi, PROXIMITY_THRESHOLD_METERS};

/// Filtered POI set computed for a single track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackFilterOutcome {
    /// Real and artificial POIs, ordered by track position
    pub pois: Vec<FilteredPoi>,
    pub real_count: usize,
    pub artificial_count: usize,
}

/// Totals for a filtering run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterResult {
    /// Real POIs kept
    pub filtered_pois: usize,
    /// Artificial POIs created
    pub artificial_pois: usize,
    pub tracks_processed: usize,
}

impl FilterResult {
    fn single(outcome: &TrackFilterOutcome) -> Self {
        Self {
            filtered_pois: outcome.real_count,
            artificial_pois: outcome.artificial_count,
            tracks_processed: 1,
        }
    }

    fn absorb(&mut self, other: FilterResult) {
        self.filtered_pois += other.filtered_pois;
        self.artificial_pois += other.artificial_pois;
        self.tracks_processed += other.tracks_processed;
    }
}

/// Compute the filtered POI set for one track.
///
/// An empty polyline or `max_pois == 0` yields an empty set. A track with no
/// POIs near it is filled entirely with artificial POIs. POIs whose
/// coordinates fail [`GpsPoint::is_valid`] are skipped.
pub fn filter_track(
    track_id: &str,
    track: &[GpsPoint],
    raw_pois: &[RawPoi],
    config: &FilterConfig,
) -> TrackFilterOutcome {
    if track.is_empty() || config.max_pois == 0 {
        return TrackFilterOutcome::default();
    }

    let mut nearby: Vec<PoiWithProjection> = raw_pois
        .iter()
        .filter(|poi| {
            let valid = poi.point().is_valid();
            if !valid {
                debug!(
                    "[Filter] Skipping POI {} on {} with invalid coordinates ({}, {})",
                    poi.external_id, track_id, poi.latitude, poi.longitude
                );
            }
            valid
        })
        .filter_map(|poi| {
            let projection = find_closest_point_on_track(&poi.point(), track)?;
            (projection.distance <= PROXIMITY_THRESHOLD_METERS)
                .then_some(PoiWithProjection { poi, projection })
        })
        .collect();
    nearby.sort_by(|a, b| a.track_position().total_cmp(&b.track_position()));

    let selected = select_evenly(&nearby, config.max_pois);
    let selected_points: Vec<GpsPoint> = selected.iter().map(|s| s.poi.point()).collect();

    let missing = config.max_pois.saturating_sub(selected.len());
    let artificial = create_artificial_pois(track, missing, &selected_points);

    debug!(
        "[Filter] {}: {} raw, {} near track, {} selected, {} artificial",
        track_id,
        raw_pois.len(),
        nearby.len(),
        selected.len(),
        artificial.len()
    );

    let mut pois: Vec<FilteredPoi> = selected
        .iter()
        .map(|s| FilteredPoi::from_raw(s.poi, s.track_position()))
        .chain(artificial.iter().map(|a| FilteredPoi::artificial(track_id, a)))
        .collect();
    pois.sort_by(|a, b| a.track_position.total_cmp(&b.track_position));

    TrackFilterOutcome {
        real_count: selected.len(),
        artificial_count: artificial.len(),
        pois,
    }
}

/// Regenerate the filtered POIs of one stored track.
///
/// Any previously stored filtered POIs for the track are replaced.
pub fn filter_pois_for_track(
    store: &mut dyn TrackStore,
    track_id: &str,
    config: &FilterConfig,
) -> Result<FilterResult> {
    let track = store
        .track(track_id)
        .ok_or_else(|| AnnotatorError::TrackNotFound(track_id.to_string()))?;

    let outcome = filter_track(track_id, &track.points(), &store.raw_pois(track_id), config);
    let result = FilterResult::single(&outcome);
    store.replace_filtered_pois(track_id, outcome.pois);

    Ok(result)
}

/// Regenerate the filtered POIs of every stored track, in insertion order.
pub fn filter_all_tracks(
    store: &mut dyn TrackStore,
    config: &FilterConfig,
    progress: &dyn ProgressReporter,
) -> FilterResult {
    let track_ids = store.track_ids();
    let total = track_ids.len() as u32;
    progress.on_start(total);

    let mut result = FilterResult::default();
    for (i, track_id) in track_ids.iter().enumerate() {
        // Ids come from the store itself, so the lookup cannot miss
        if let Ok(track_result) = filter_pois_for_track(store, track_id, config) {
            result.absorb(track_result);
        }
        progress.on_advance(i as u32 + 1, total);
    }

    progress.on_finish();
    info!(
        "[Filter] Filtered {} tracks: {} real POIs, {} artificial",
        result.tracks_processed, result.filtered_pois, result.artificial_pois
    );
    result
}

/// Parallel version of [`filter_all_tracks`].
///
/// Tracks are snapshotted up front, filtered on the rayon pool and written
/// back to the store sequentially in insertion order.
#[cfg(feature = "parallel")]
pub fn filter_all_tracks_parallel(
    store: &mut dyn TrackStore,
    config: &FilterConfig,
    progress: &dyn ProgressReporter,
) -> FilterResult {
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    let snapshots: Vec<(String, Vec<GpsPoint>, Vec<RawPoi>)> = store
        .track_ids()
        .into_iter()
        .filter_map(|id| {
            let track = store.track(&id)?;
            let raw = store.raw_pois(&id);
            Some((id, track.points(), raw))
        })
        .collect();

    let total = snapshots.len() as u32;
    progress.on_start(total);

    let completed = AtomicU32::new(0);
    let real = AtomicUsize::new(0);
    let artificial = AtomicUsize::new(0);

    let outcomes: Vec<TrackFilterOutcome> = snapshots
        .par_iter()
        .map(|(id, points, raw)| {
            let outcome = filter_track(id, points, raw, config);
            real.fetch_add(outcome.real_count, Ordering::Relaxed);
            artificial.fetch_add(outcome.artificial_count, Ordering::Relaxed);
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            progress.on_advance(done, total);
            outcome
        })
        .collect();

    for ((id, _, _), outcome) in snapshots.iter().zip(outcomes) {
        store.replace_filtered_pois(id, outcome.pois);
    }

    progress.on_finish();

    let result = FilterResult {
        filtered_pois: real.into_inner(),
        artificial_pois: artificial.into_inner(),
        tracks_processed: snapshots.len(),
    };
    info!(
        "[Filter] Filtered {} tracks in parallel: {} real POIs, {} artificial",
        result.tracks_processed, result.filtered_pois, result.artificial_pois
    );
    result
}
