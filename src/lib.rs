//! # Trail Annotator
//!
//! Point-of-interest selection and routing along hiking tracks.
//!
//! This library provides:
//! - GeoJSON track parsing and CSV track import
//! - Projection of points onto a track (closest point and along-track distance)
//! - Filtering of POIs near a track, evenly spread and capped at a maximum count
//! - Synthesis of artificial POIs where a track has too few real ones
//! - Overpass POI queries, GraphHopper-style routing payloads and GeoJSON export
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel per-track filtering with rayon
//! - **`http`** - Enable HTTP clients for the POI source and routing service
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use trail_annotator::{filter_track, extract_coordinates, FilterConfig, RawPoi};
//!
//! let geojson = r#"{"type":"LineString","coordinates":[[6.86,45.83],[6.87,45.83],[6.88,45.83]]}"#;
//! let track = extract_coordinates(geojson);
//!
//! let summit = RawPoi::new("hike-1", "node-42", 45.8302, 6.8710, "natural:peak");
//!
//! let outcome = filter_track("hike-1", &track, &[summit], &FilterConfig { max_pois: 3 });
//! assert_eq!(outcome.real_count, 1);
//! assert_eq!(outcome.pois.len(), 3);
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Unified error handling
pub mod error;
pub use error::{AnnotatorError, Result};

// Distance and projection primitives
pub mod geo_utils;

// GeoJSON coordinate extraction
pub mod track;
pub use track::{extract_coordinates, extract_coordinates_from_value, Track};

// Closest-point projection and proximity test
pub mod projection;
pub use projection::{find_closest_point_on_track, is_point_near_track, ProjectionResult};

// Even selection and artificial POI synthesis
pub mod distribution;
pub use distribution::{create_artificial_pois, select_evenly, ArtificialPoint, PoiWithProjection};

// Progress reporting
pub mod progress;
pub use progress::{AtomicProgress, NoopProgress, ProgressReporter, ProgressStatus};

// Storage collaborator
pub mod store;
pub use store::{FilteredPoiCount, MemoryStore, PoiCount, TrackStore};

// Filtering pipeline
pub mod filter;
#[cfg(feature = "parallel")]
pub use filter::filter_all_tracks_parallel;
pub use filter::{
    filter_all_tracks, filter_pois_for_track, filter_track, FilterResult, TrackFilterOutcome,
};

// CSV track import
pub mod import;
pub use import::{import_tracks_csv, import_tracks_csv_path};

// Overpass POI source payloads
pub mod overpass;
pub use overpass::{build_overpass_query, parse_overpass_response, track_bounds, PoiSearchResult};

// Routing service payloads
pub mod routing;
pub use routing::{
    build_route_request, decode_route_points, parse_route_summary, route_waypoints, Route,
    RouteGenerationResult, RouteSummary,
};

// GeoJSON route export
pub mod export;
pub use export::{export_routes, route_to_geojson};

// HTTP clients for the POI source and routing service
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::{
    generate_route_for_track, generate_routes_for_all_tracks, search_pois_for_all_tracks,
    search_pois_for_missing_tracks, search_pois_for_track, OverpassClient, RoutingClient,
    ServiceConfig,
};

// ============================================================================
// Domain Constants
// ============================================================================

/// Earth radius used by every distance computation, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// POIs farther than this from their projection onto the track are dropped.
pub const PROXIMITY_THRESHOLD_METERS: f64 = 500.0;

/// Artificial POIs closer than this to a selected real POI are discarded.
pub const ARTIFICIAL_EXCLUSION_RADIUS_METERS: f64 = 100.0;

/// Default cap on POIs kept per track.
pub const DEFAULT_MAX_POIS: usize = 10;

/// Upper bound on artificial POIs synthesized for one track.
pub const MAX_ARTIFICIAL_POIS: usize = 1_000;

/// `poi_type` given to synthesized POIs.
pub const ARTIFICIAL_POI_TYPE: &str = "artificial:poi";

/// `name` given to synthesized POIs.
pub const ARTIFICIAL_POI_NAME: &str = "Artificial POI";

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude in degrees.
///
/// # Example
/// ```
/// use trail_annotator::GpsPoint;
/// let point = GpsPoint::new(45.8326, 6.8652); // Chamonix
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        geo_utils::compute_bounds(points)
    }
}

/// Configuration for POI filtering.
///
/// The proximity threshold and the artificial exclusion radius are fixed
/// domain constants ([`PROXIMITY_THRESHOLD_METERS`],
/// [`ARTIFICIAL_EXCLUSION_RADIUS_METERS`]) and are not configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Maximum number of POIs kept per track, real and artificial together.
    /// Zero disables filtering output entirely. At most
    /// [`MAX_ARTIFICIAL_POIS`] of them are artificial.
    /// Default: 10
    pub max_pois: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { max_pois: DEFAULT_MAX_POIS }
    }
}

/// A POI returned by the external POI source for one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoi {
    pub id: Uuid,
    pub track_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// `"key:value"` classification, e.g. `"natural:peak"`
    pub poi_type: String,
    pub name: Option<String>,
    /// Identifier in the external source (OSM node id)
    pub external_id: String,
    /// Source tags as JSON text
    pub properties: String,
}

impl RawPoi {
    /// Create a POI with a fresh id, no name and empty properties.
    pub fn new(
        track_id: &str,
        external_id: &str,
        latitude: f64,
        longitude: f64,
        poi_type: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            track_id: track_id.to_string(),
            latitude,
            longitude,
            poi_type: poi_type.to_string(),
            name: None,
            external_id: external_id.to_string(),
            properties: "{}".to_string(),
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// A POI kept for a track after filtering, either selected from the raw POIs
/// or synthesized along the track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredPoi {
    pub track_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub poi_type: String,
    pub name: Option<String>,
    /// `None` for artificial POIs
    pub external_id: Option<String>,
    pub properties: String,
    pub is_artificial: bool,
    /// Distance along the track from its start, in meters
    pub track_position: f64,
}

impl FilteredPoi {
    /// Keep a raw POI at the given along-track position.
    pub fn from_raw(raw: &RawPoi, track_position: f64) -> Self {
        Self {
            track_id: raw.track_id.clone(),
            latitude: raw.latitude,
            longitude: raw.longitude,
            poi_type: raw.poi_type.clone(),
            name: raw.name.clone(),
            external_id: Some(raw.external_id.clone()),
            properties: raw.properties.clone(),
            is_artificial: false,
            track_position,
        }
    }

    /// Build an artificial POI from a synthesized point.
    pub fn artificial(track_id: &str, artificial: &ArtificialPoint) -> Self {
        Self {
            track_id: track_id.to_string(),
            latitude: artificial.point.latitude,
            longitude: artificial.point.longitude,
            poi_type: ARTIFICIAL_POI_TYPE.to_string(),
            name: Some(ARTIFICIAL_POI_NAME.to_string()),
            external_id: None,
            properties: "{}".to_string(),
            is_artificial: true,
            track_position: artificial.position,
        }
    }

    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

// ============================================================================
// Tests
// ============================================================================
