//! GeoJSON track parsing.
//!
//! Tracks arrive as GeoJSON text of any shape (bare geometry, `Feature`,
//! `FeatureCollection`, multi-geometries). Coordinates are collected by walking
//! the parsed JSON tree in document order, so the resulting polyline follows
//! the order the track was written in.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::GpsPoint;

/// A hiking track as stored: an identifier and its raw GeoJSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Hike identifier, unique within a store
    pub id: String,
    pub geojson: String,
}

impl Track {
    pub fn new(id: &str, geojson: &str) -> Self {
        Self {
            id: id.to_string(),
            geojson: geojson.to_string(),
        }
    }

    /// Parse the track's polyline. Unparseable GeoJSON yields an empty polyline.
    pub fn points(&self) -> Vec<GpsPoint> {
        extract_coordinates(&self.geojson)
    }
}

/// Extract the ordered polyline from GeoJSON text.
///
/// Malformed JSON is not an error: it produces an empty polyline, which every
/// downstream step treats as "nothing to do".
///
/// # Example
/// ```
/// use trail_annotator::{extract_coordinates, GpsPoint};
///
/// let points = extract_coordinates(r#"{"type":"LineString","coordinates":[[6.86,45.83,1035.0],[6.87,45.84]]}"#);
/// assert_eq!(points, vec![GpsPoint::new(45.83, 6.86), GpsPoint::new(45.84, 6.87)]);
///
/// assert!(extract_coordinates("not json").is_empty());
/// ```
pub fn extract_coordinates(geojson: &str) -> Vec<GpsPoint> {
    match serde_json::from_str::<Value>(geojson) {
        Ok(value) => extract_coordinates_from_value(&value),
        Err(e) => {
            log::debug!("[Track] Unparseable GeoJSON ({}), using empty polyline", e);
            Vec::new()
        }
    }
}

/// Extract the ordered polyline from an already parsed JSON value.
pub fn extract_coordinates_from_value(value: &Value) -> Vec<GpsPoint> {
    let mut points = Vec::new();
    collect_coordinates(value, &mut points);
    points
}

fn collect_coordinates(value: &Value, points: &mut Vec<GpsPoint>) {
    match value {
        Value::Array(items) => match as_position(items) {
            Some(point) => points.push(point),
            None => items.iter().for_each(|item| collect_coordinates(item, points)),
        },
        Value::Object(map) => map.values().for_each(|item| collect_coordinates(item, points)),
        _ => {}
    }
}

/// A GeoJSON position: `[lon, lat]` or `[lon, lat, elevation]`.
fn as_position(items: &[Value]) -> Option<GpsPoint> {
    if items.len() != 2 && items.len() != 3 {
        return None;
    }
    let lon = items[0].as_f64()?;
    let lat = items[1].as_f64()?;
    Some(GpsPoint::new(lat, lon))
}
