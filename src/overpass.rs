//! Overpass API payloads for the POI source.
//!
//! POIs are fetched per track with a bounding-box query over natural
//! features, geological and historic sites, artworks and viewpoints. Only
//! nodes are kept; ways and relations in a response are ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::{Bounds, GpsPoint, RawPoi};

/// Tag keys that classify a POI, highest priority first.
const TYPE_TAG_PRIORITY: [&str; 4] = ["natural", "tourism", "geological", "historic"];

/// Totals for a POI search run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoiSearchResult {
    pub pois_found: usize,
    pub tracks_processed: usize,
}

/// Bounding box of a track's polyline, `None` when the polyline is empty.
pub fn track_bounds(track: &[GpsPoint]) -> Option<Bounds> {
    Bounds::from_points(track)
}

/// Overpass QL query for POIs inside `bounds`.
pub fn build_overpass_query(bounds: &Bounds) -> String {
    let bbox = format!(
        "{},{},{},{}",
        bounds.min_lat, bounds.min_lng, bounds.max_lat, bounds.max_lng
    );

    format!(
        "[out:json];\n\
         (\n\
         \x20 node[natural][natural != tree][natural != shrub]({bbox});\n\
         \x20 node[geological]({bbox});\n\
         \x20 node[historic]({bbox});\n\
         \x20 node[tourism = artwork]({bbox});\n\
         \x20 node[tourism = viewpoint]({bbox});\n\
         );\n\
         out body;"
    )
}

/// Map an Overpass JSON response to raw POIs for `track_id`.
///
/// Elements that are not nodes, or lack an id or coordinates, are skipped.
/// A response without an `elements` array yields no POIs; text that is not
/// JSON is an error.
pub fn parse_overpass_response(response_json: &str, track_id: &str) -> Result<Vec<RawPoi>> {
    let response: Value = serde_json::from_str(response_json)?;

    let Some(elements) = response.get("elements").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    Ok(elements
        .iter()
        .filter(|element| element["type"] == "node")
        .filter_map(|element| node_to_poi(element, track_id))
        .collect())
}

fn node_to_poi(element: &Value, track_id: &str) -> Option<RawPoi> {
    let external_id = match element.get("id")? {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return None,
    };
    let latitude = element.get("lat")?.as_f64()?;
    let longitude = element.get("lon")?.as_f64()?;
    let tags = element.get("tags").and_then(Value::as_object);

    let mut poi = RawPoi::new(
        track_id,
        &external_id,
        latitude,
        longitude,
        &tags.map_or_else(|| "unknown".to_string(), classify),
    );
    if let Some(tags) = tags {
        poi.name = tags.get("name").map(tag_text);
        poi.properties = Value::Object(tags.clone()).to_string();
    }
    Some(poi)
}

/// `"key:value"` for the highest-priority classifying tag.
fn classify(tags: &Map<String, Value>) -> String {
    TYPE_TAG_PRIORITY
        .iter()
        .find_map(|key| tags.get(*key).map(|value| format!("{}:{}", key, tag_text(value))))
        .unwrap_or_else(|| "unknown".to_string())
}

fn tag_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "version": 0.6,
        "elements": [
            {"type": "node", "id": 101, "lat": 45.83, "lon": 6.86,
             "tags": {"natural": "peak", "name": "Aiguille du Midi", "ele": "3842"}},
            {"type": "node", "id": 102, "lat": 45.84, "lon": 6.87,
             "tags": {"historic": "ruins", "tourism": "viewpoint"}},
            {"type": "node", "id": 103, "lat": 45.85, "lon": 6.88},
            {"type": "node", "id": 104, "lat": 45.86, "lon": 6.89,
             "tags": {"geological": "outcrop", "historic": "memorial"}},
            {"type": "way", "id": 200, "nodes": [1, 2]},
            {"type": "node", "id": 105, "lon": 6.9}
        ]
    }"#;

    #[test]
    fn test_query_shape() {
        let bounds = Bounds { min_lat: 45.8, max_lat: 45.9, min_lng: 6.8, max_lng: 6.95 };
        let query = build_overpass_query(&bounds);

        assert!(query.starts_with("[out:json];"));
        assert!(query.ends_with("out body;"));
        assert!(query
            .contains("node[natural][natural != tree][natural != shrub](45.8,6.8,45.9,6.95);"));
        assert!(query.contains("node[geological](45.8,6.8,45.9,6.95);"));
        assert!(query.contains("node[historic](45.8,6.8,45.9,6.95);"));
        assert!(query.contains("node[tourism = artwork](45.8,6.8,45.9,6.95);"));
        assert!(query.contains("node[tourism = viewpoint](45.8,6.8,45.9,6.95);"));
    }

    #[test]
    fn test_track_bounds() {
        assert!(track_bounds(&[]).is_none());

        let bounds = track_bounds(&[GpsPoint::new(45.9, 6.8), GpsPoint::new(45.8, 6.95)]).unwrap();
        assert_eq!(bounds, Bounds { min_lat: 45.8, max_lat: 45.9, min_lng: 6.8, max_lng: 6.95 });
    }

    #[test]
    fn test_parse_nodes() {
        let pois = parse_overpass_response(RESPONSE, "hike-1").unwrap();
        assert_eq!(pois.len(), 4);

        let peak = &pois[0];
        assert_eq!(peak.track_id, "hike-1");
        assert_eq!(peak.external_id, "101");
        assert_eq!(peak.poi_type, "natural:peak");
        assert_eq!(peak.name.as_deref(), Some("Aiguille du Midi"));
        assert_eq!(peak.point(), GpsPoint::new(45.83, 6.86));
        let props: Value = serde_json::from_str(&peak.properties).unwrap();
        assert_eq!(props["ele"], "3842");
    }

    #[test]
    fn test_type_priority() {
        let pois = parse_overpass_response(RESPONSE, "hike-1").unwrap();

        // tourism outranks historic, geological outranks historic
        assert_eq!(pois[1].poi_type, "tourism:viewpoint");
        assert_eq!(pois[1].name, None);
        assert_eq!(pois[3].poi_type, "geological:outcrop");

        // No tags at all
        assert_eq!(pois[2].poi_type, "unknown");
        assert_eq!(pois[2].properties, "{}");
    }

    #[test]
    fn test_parse_without_elements() {
        assert!(parse_overpass_response(r#"{"remark":"timeout"}"#, "t").unwrap().is_empty());
        assert!(parse_overpass_response("<html>busy</html>", "t").is_err());
    }
}
