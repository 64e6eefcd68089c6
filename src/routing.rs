//! Routing service payloads.
//!
//! A route for a track runs from the track's first point through every
//! filtered POI, in track order, to the track's last point. The routing
//! service speaks a GraphHopper-style JSON dialect: a request with
//! `[lon, lat]` points and a response whose `paths[0]` carries the distance,
//! the travel time in milliseconds and an optionally encoded geometry.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{FilteredPoi, GpsPoint};

/// Precision of encoded route geometry (5 decimal places).
const POLYLINE_PRECISION: u32 = 5;

/// A computed route stored for a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub track_id: String,
    /// Routing response with its geometry decoded to a GeoJSON LineString
    pub route_json: String,
    pub created_at: DateTime<Utc>,
    /// Route length in meters
    pub distance: f64,
    /// Travel time in seconds
    pub duration: f64,
}

impl Route {
    /// Build a route from a raw routing service response.
    pub fn from_response(track_id: &str, response_json: &str) -> Self {
        let summary = parse_route_summary(response_json);

        Self {
            id: Uuid::new_v4(),
            track_id: track_id.to_string(),
            route_json: decode_route_points(response_json),
            created_at: Utc::now(),
            distance: summary.distance,
            duration: summary.duration,
        }
    }
}

/// Distance and duration of the first path in a routing response.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteSummary {
    /// Meters
    pub distance: f64,
    /// Seconds
    pub duration: f64,
}

/// Totals for a route generation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteGenerationResult {
    pub routes_generated: usize,
    pub tracks_processed: usize,
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    #[serde(default)]
    paths: Vec<RoutePath>,
}

#[derive(Debug, Deserialize)]
struct RoutePath {
    distance: Option<f64>,
    /// Milliseconds
    time: Option<f64>,
}

/// Waypoints for routing a track: its first point, the filtered POIs sorted by
/// track position, then its last point.
///
/// Returns `None` when the track or the POI list is empty.
pub fn route_waypoints(track: &[GpsPoint], filtered: &[FilteredPoi]) -> Option<Vec<GpsPoint>> {
    let (first, last) = (track.first()?, track.last()?);
    if filtered.is_empty() {
        return None;
    }

    let mut ordered: Vec<&FilteredPoi> = filtered.iter().collect();
    ordered.sort_by(|a, b| a.track_position.total_cmp(&b.track_position));

    let mut waypoints = Vec::with_capacity(ordered.len() + 2);
    waypoints.push(*first);
    waypoints.extend(ordered.iter().map(|poi| poi.point()));
    waypoints.push(*last);
    Some(waypoints)
}

/// Request body for a hiking route through `waypoints`.
pub fn build_route_request(waypoints: &[GpsPoint]) -> Value {
    let points: Vec<[f64; 2]> = waypoints.iter().map(|p| [p.longitude, p.latitude]).collect();

    json!({
        "profile": "hike",
        "points": points,
        "snap_preventions": ["motorway", "ferry", "tunnel"],
        "details": [],
    })
}

/// Read distance and duration from a routing response.
///
/// Missing fields and unparseable responses yield zeros.
pub fn parse_route_summary(response_json: &str) -> RouteSummary {
    match serde_json::from_str::<RouteResponse>(response_json) {
        Ok(response) => response
            .paths
            .first()
            .map(|path| RouteSummary {
                distance: path.distance.unwrap_or(0.0),
                duration: path.time.unwrap_or(0.0) / 1000.0,
            })
            .unwrap_or_default(),
        Err(e) => {
            warn!("[Routing] Could not read route summary: {}", e);
            RouteSummary::default()
        }
    }
}

/// Replace an encoded `paths[0].points` polyline with a GeoJSON LineString.
///
/// Responses whose points are not encoded are returned unchanged, as are
/// responses that cannot be decoded.
pub fn decode_route_points(response_json: &str) -> String {
    let mut response: Value = match serde_json::from_str(response_json) {
        Ok(value) => value,
        Err(e) => {
            warn!("[Routing] Route response is not JSON: {}", e);
            return response_json.to_string();
        }
    };

    let Some(path) = response.pointer_mut("/paths/0").and_then(Value::as_object_mut) else {
        return response_json.to_string();
    };

    let encoded = path.get("points_encoded").and_then(Value::as_bool).unwrap_or(false);
    let Some(points) = path.get("points").and_then(Value::as_str).map(str::to_owned) else {
        return response_json.to_string();
    };
    if !encoded {
        return response_json.to_string();
    }

    let line = match polyline::decode_polyline(&points, POLYLINE_PRECISION) {
        Ok(line) => line,
        Err(e) => {
            warn!("[Routing] Error decoding polyline: {:?}", e);
            return response_json.to_string();
        }
    };

    // geo coordinates are (x = lon, y = lat), the GeoJSON order
    let coordinates: Vec<[f64; 2]> = line.coords().map(|c| [c.x, c.y]).collect();
    path.insert(
        "points".to_string(),
        json!({ "type": "LineString", "coordinates": coordinates }),
    );
    path.insert("points_encoded".to_string(), Value::Bool(false));

    response.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawPoi;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn filtered_at(position: f64, lat: f64, lon: f64) -> FilteredPoi {
        FilteredPoi::from_raw(&RawPoi::new("t", "1", lat, lon, "natural:peak"), position)
    }

    #[test]
    fn test_waypoints_sorted_between_endpoints() {
        let track = vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 0.5), GpsPoint::new(0.0, 1.0)];
        let filtered = vec![filtered_at(900.0, 0.1, 0.9), filtered_at(100.0, 0.1, 0.1)];

        let waypoints = route_waypoints(&track, &filtered).unwrap();
        assert_eq!(
            waypoints,
            vec![
                GpsPoint::new(0.0, 0.0),
                GpsPoint::new(0.1, 0.1),
                GpsPoint::new(0.1, 0.9),
                GpsPoint::new(0.0, 1.0),
            ]
        );
    }

    #[test]
    fn test_waypoints_need_track_and_pois() {
        let track = vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 1.0)];
        assert!(route_waypoints(&track, &[]).is_none());
        assert!(route_waypoints(&[], &[filtered_at(1.0, 0.0, 0.0)]).is_none());
    }

    #[test]
    fn test_request_uses_lon_lat_order() {
        let body = build_route_request(&[GpsPoint::new(45.0, 6.0), GpsPoint::new(45.1, 6.1)]);

        assert_eq!(body["profile"], "hike");
        assert_eq!(body["points"], json!([[6.0, 45.0], [6.1, 45.1]]));
        assert_eq!(body["snap_preventions"], json!(["motorway", "ferry", "tunnel"]));
        assert_eq!(body["details"], json!([]));
    }

    #[test]
    fn test_summary_converts_milliseconds() {
        let summary = parse_route_summary(r#"{"paths":[{"distance":12345.6,"time":3600000}]}"#);
        assert!(approx_eq(summary.distance, 12345.6, 1e-9));
        assert!(approx_eq(summary.duration, 3600.0, 1e-9));
    }

    #[test]
    fn test_summary_defaults_to_zero() {
        assert_eq!(parse_route_summary(r#"{"paths":[]}"#), RouteSummary::default());
        assert_eq!(parse_route_summary(r#"{"message":"no route"}"#), RouteSummary::default());
        assert_eq!(parse_route_summary("<html>"), RouteSummary::default());
    }

    #[test]
    fn test_decode_encoded_points() {
        // Reference polyline from the encoding format documentation
        let response = r#"{"paths":[{"distance":1.0,"points":"_p~iF~ps|U_ulLnnqC_mqNvxq`@","points_encoded":true}]}"#;
        let decoded: Value = serde_json::from_str(&decode_route_points(response)).unwrap();

        let points = &decoded["paths"][0]["points"];
        assert_eq!(points["type"], "LineString");
        assert_eq!(decoded["paths"][0]["points_encoded"], false);

        let coords = points["coordinates"].as_array().unwrap();
        assert_eq!(coords.len(), 3);
        assert!(approx_eq(coords[0][0].as_f64().unwrap(), -120.2, 1e-9));
        assert!(approx_eq(coords[0][1].as_f64().unwrap(), 38.5, 1e-9));
        assert!(approx_eq(coords[2][0].as_f64().unwrap(), -126.453, 1e-9));
        assert!(approx_eq(coords[2][1].as_f64().unwrap(), 43.252, 1e-9));
    }

    #[test]
    fn test_decode_leaves_plain_points_alone() {
        let response = r#"{"paths":[{"points":{"type":"LineString","coordinates":[]},"points_encoded":false}]}"#;
        assert_eq!(decode_route_points(response), response);
        assert_eq!(decode_route_points("not json"), "not json");
    }

    #[test]
    fn test_route_from_response() {
        let response = r#"{"paths":[{"distance":500.0,"time":120000,"points":"_p~iF~ps|U","points_encoded":true}]}"#;
        let route = Route::from_response("hike-1", response);

        assert_eq!(route.track_id, "hike-1");
        assert!(approx_eq(route.distance, 500.0, 1e-9));
        assert!(approx_eq(route.duration, 120.0, 1e-9));
        assert!(route.route_json.contains("LineString"));
    }
}
