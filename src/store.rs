//! Storage collaborator.
//!
//! Everything the pipeline persists is keyed by track id: the track itself,
//! the raw POIs found for it, the filtered POI set and the computed routes.
//! [`TrackStore`] is the seam a database-backed store plugs into;
//! [`MemoryStore`] keeps everything in memory and preserves the order in which
//! tracks were added.

use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::routing::Route;
use crate::track::Track;
use crate::{FilteredPoi, RawPoi};

/// Number of records of one kind held for a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoiCount {
    pub track_id: String,
    pub count: usize,
}

/// Filtered POI totals for a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredPoiCount {
    pub track_id: String,
    pub count: usize,
    pub artificial_count: usize,
}

/// Persistence for tracks and the records derived from them.
///
/// `replace_*` methods discard whatever was stored for the track and return
/// the number of records removed; passing an empty list purges the track's
/// records of that kind.
pub trait TrackStore {
    /// Track ids in insertion order.
    fn track_ids(&self) -> Vec<String>;
    fn track(&self, track_id: &str) -> Option<Track>;
    /// Store a new track. Returns `false` if the id is already taken.
    fn insert_track(&mut self, track: Track) -> bool;
    /// Remove every track and everything derived from them.
    fn purge_tracks(&mut self) -> usize;

    fn raw_pois(&self, track_id: &str) -> Vec<RawPoi>;
    fn replace_raw_pois(&mut self, track_id: &str, pois: Vec<RawPoi>) -> usize;
    fn purge_raw_pois(&mut self) -> usize;

    /// Filtered POIs for a track, ordered by track position.
    fn filtered_pois(&self, track_id: &str) -> Vec<FilteredPoi>;
    fn replace_filtered_pois(&mut self, track_id: &str, pois: Vec<FilteredPoi>) -> usize;
    fn purge_filtered_pois(&mut self) -> usize;

    fn routes(&self, track_id: &str) -> Vec<Route>;
    fn add_route(&mut self, route: Route);
    fn replace_routes(&mut self, track_id: &str, routes: Vec<Route>) -> usize;
    fn purge_routes(&mut self) -> usize;

    // ------------------------------------------------------------------------
    // Provided queries
    // ------------------------------------------------------------------------

    fn track_count(&self) -> usize {
        self.track_ids().len()
    }

    fn total_raw_pois(&self) -> usize {
        self.track_ids().iter().map(|id| self.raw_pois(id).len()).sum()
    }

    fn total_filtered_pois(&self) -> usize {
        self.track_ids().iter().map(|id| self.filtered_pois(id).len()).sum()
    }

    fn total_artificial_pois(&self) -> usize {
        self.track_ids()
            .iter()
            .map(|id| self.filtered_pois(id).iter().filter(|p| p.is_artificial).count())
            .sum()
    }

    fn total_routes(&self) -> usize {
        self.track_ids().iter().map(|id| self.routes(id).len()).sum()
    }

    /// Raw POI counts for tracks that have at least one raw POI.
    fn poi_counts_by_track(&self) -> Vec<PoiCount> {
        self.track_ids()
            .into_iter()
            .map(|track_id| {
                let count = self.raw_pois(&track_id).len();
                PoiCount { track_id, count }
            })
            .filter(|c| c.count > 0)
            .collect()
    }

    /// Filtered POI counts for every track, zero for tracks never filtered.
    fn filtered_poi_counts_by_track(&self) -> Vec<FilteredPoiCount> {
        self.track_ids()
            .into_iter()
            .map(|track_id| {
                let pois = self.filtered_pois(&track_id);
                FilteredPoiCount {
                    count: pois.len(),
                    artificial_count: pois.iter().filter(|p| p.is_artificial).count(),
                    track_id,
                }
            })
            .collect()
    }

    /// Route counts for tracks that have at least one route.
    fn route_counts_by_track(&self) -> Vec<PoiCount> {
        self.track_ids()
            .into_iter()
            .map(|track_id| {
                let count = self.routes(&track_id).len();
                PoiCount { track_id, count }
            })
            .filter(|c| c.count > 0)
            .collect()
    }

    /// Ids of tracks with no raw POIs, in insertion order.
    fn tracks_without_pois(&self) -> Vec<String> {
        self.track_ids()
            .into_iter()
            .filter(|id| self.raw_pois(id).is_empty())
            .collect()
    }

    /// Most recently created route for a track; the earlier-stored route wins
    /// identical timestamps.
    fn latest_route(&self, track_id: &str) -> Option<Route> {
        self.routes(track_id)
            .into_iter()
            .fold(None, |latest: Option<Route>, route| match latest {
                Some(current) if current.created_at >= route.created_at => Some(current),
                _ => Some(route),
            })
    }
}

/// In-memory [`TrackStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    order: Vec<String>,
    tracks: HashMap<String, Track>,
    raw_pois: HashMap<String, Vec<RawPoi>>,
    filtered_pois: HashMap<String, Vec<FilteredPoi>>,
    routes: HashMap<String, Vec<Route>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn knows(&self, track_id: &str) -> bool {
        if self.tracks.contains_key(track_id) {
            true
        } else {
            warn!("[Store] Ignoring records for unknown track {}", track_id);
            false
        }
    }
}

/// Swap in `records` for `track_id`, returning how many were replaced.
fn replace_records<T>(map: &mut HashMap<String, Vec<T>>, track_id: &str, records: Vec<T>) -> usize {
    let previous = if records.is_empty() {
        map.remove(track_id)
    } else {
        map.insert(track_id.to_string(), records)
    };
    previous.map_or(0, |old| old.len())
}

fn purge_records<T>(map: &mut HashMap<String, Vec<T>>) -> usize {
    map.drain().map(|(_, records)| records.len()).sum()
}

impl TrackStore for MemoryStore {
    fn track_ids(&self) -> Vec<String> {
        self.order.clone()
    }

    fn track(&self, track_id: &str) -> Option<Track> {
        self.tracks.get(track_id).cloned()
    }

    fn insert_track(&mut self, track: Track) -> bool {
        if self.tracks.contains_key(&track.id) {
            return false;
        }
        self.order.push(track.id.clone());
        self.tracks.insert(track.id.clone(), track);
        true
    }

    fn purge_tracks(&mut self) -> usize {
        let count = self.order.len();
        self.order.clear();
        self.tracks.clear();
        self.raw_pois.clear();
        self.filtered_pois.clear();
        self.routes.clear();
        count
    }

    fn raw_pois(&self, track_id: &str) -> Vec<RawPoi> {
        self.raw_pois.get(track_id).cloned().unwrap_or_default()
    }

    fn replace_raw_pois(&mut self, track_id: &str, pois: Vec<RawPoi>) -> usize {
        if !self.knows(track_id) {
            return 0;
        }
        replace_records(&mut self.raw_pois, track_id, pois)
    }

    fn purge_raw_pois(&mut self) -> usize {
        purge_records(&mut self.raw_pois)
    }

    fn filtered_pois(&self, track_id: &str) -> Vec<FilteredPoi> {
        let mut pois = self.filtered_pois.get(track_id).cloned().unwrap_or_default();
        pois.sort_by(|a, b| a.track_position.total_cmp(&b.track_position));
        pois
    }

    fn replace_filtered_pois(&mut self, track_id: &str, pois: Vec<FilteredPoi>) -> usize {
        if !self.knows(track_id) {
            return 0;
        }
        replace_records(&mut self.filtered_pois, track_id, pois)
    }

    fn purge_filtered_pois(&mut self) -> usize {
        purge_records(&mut self.filtered_pois)
    }

    fn routes(&self, track_id: &str) -> Vec<Route> {
        self.routes.get(track_id).cloned().unwrap_or_default()
    }

    fn add_route(&mut self, route: Route) {
        if self.knows(&route.track_id) {
            self.routes.entry(route.track_id.clone()).or_default().push(route);
        }
    }

    fn replace_routes(&mut self, track_id: &str, routes: Vec<Route>) -> usize {
        if !self.knows(track_id) {
            return 0;
        }
        replace_records(&mut self.routes, track_id, routes)
    }

    fn purge_routes(&mut self) -> usize {
        purge_records(&mut self.routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::ArtificialPoint;
    use crate::GpsPoint;
    use chrono::Duration;

    fn store_with_tracks(ids: &[&str]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for id in ids {
            assert!(store.insert_track(Track::new(id, "{}")));
        }
        store
    }

    #[test]
    fn test_insert_keeps_order_and_rejects_duplicates() {
        let mut store = store_with_tracks(&["b", "a", "c"]);
        assert!(!store.insert_track(Track::new("a", "[]")));

        assert_eq!(store.track_ids(), vec!["b", "a", "c"]);
        assert_eq!(store.track("a").unwrap().geojson, "{}");
        assert!(store.track("zzz").is_none());
    }

    #[test]
    fn test_replace_raw_pois() {
        let mut store = store_with_tracks(&["a", "b"]);
        let pois = vec![
            RawPoi::new("a", "1", 45.0, 6.0, "natural:peak"),
            RawPoi::new("a", "2", 45.1, 6.1, "natural:saddle"),
        ];

        assert_eq!(store.replace_raw_pois("a", pois), 0);
        assert_eq!(store.raw_pois("a").len(), 2);
        assert_eq!(store.total_raw_pois(), 2);
        assert_eq!(store.tracks_without_pois(), vec!["b"]);
        assert_eq!(store.poi_counts_by_track(), vec![PoiCount { track_id: "a".into(), count: 2 }]);

        // Empty replacement purges the track's POIs
        assert_eq!(store.replace_raw_pois("a", Vec::new()), 2);
        assert!(store.raw_pois("a").is_empty());
    }

    #[test]
    fn test_unknown_track_records_are_ignored() {
        let mut store = store_with_tracks(&["a"]);
        let poi = RawPoi::new("ghost", "1", 0.0, 0.0, "unknown");

        assert_eq!(store.replace_raw_pois("ghost", vec![poi]), 0);
        assert_eq!(store.total_raw_pois(), 0);
    }

    #[test]
    fn test_filtered_pois_come_back_in_track_order() {
        let mut store = store_with_tracks(&["a", "b"]);
        let far = ArtificialPoint { point: GpsPoint::new(0.0, 0.02), position: 2000.0 };
        let near =
            FilteredPoi::from_raw(&RawPoi::new("a", "1", 0.0, 0.001, "historic:ruins"), 100.0);

        store.replace_filtered_pois("a", vec![FilteredPoi::artificial("a", &far), near]);

        let positions: Vec<f64> =
            store.filtered_pois("a").iter().map(|p| p.track_position).collect();
        assert_eq!(positions, vec![100.0, 2000.0]);
        assert_eq!(store.total_artificial_pois(), 1);
        assert_eq!(
            store.filtered_poi_counts_by_track(),
            vec![
                FilteredPoiCount { track_id: "a".into(), count: 2, artificial_count: 1 },
                FilteredPoiCount { track_id: "b".into(), count: 0, artificial_count: 0 },
            ]
        );
    }

    #[test]
    fn test_latest_route() {
        let mut store = store_with_tracks(&["a"]);
        let older = Route::from_response("a", r#"{"paths":[{"distance":1.0}]}"#);
        let mut newer = Route::from_response("a", r#"{"paths":[{"distance":2.0}]}"#);
        newer.created_at = older.created_at + Duration::seconds(5);

        store.add_route(newer.clone());
        store.add_route(older);

        assert_eq!(store.latest_route("a").unwrap().id, newer.id);
        assert_eq!(store.total_routes(), 2);
        assert_eq!(
            store.route_counts_by_track(),
            vec![PoiCount { track_id: "a".into(), count: 2 }]
        );
        assert!(store.latest_route("missing").is_none());
    }

    #[test]
    fn test_purges() {
        let mut store = store_with_tracks(&["a", "b"]);
        store.replace_raw_pois("a", vec![RawPoi::new("a", "1", 0.0, 0.0, "unknown")]);
        store.replace_raw_pois("b", vec![RawPoi::new("b", "2", 0.0, 0.0, "unknown")]);
        store.add_route(Route::from_response("b", "{}"));

        assert_eq!(store.purge_raw_pois(), 2);
        assert_eq!(store.purge_routes(), 1);
        assert_eq!(store.purge_filtered_pois(), 0);
        assert_eq!(store.purge_tracks(), 2);
        assert_eq!(store.track_count(), 0);
    }
}
