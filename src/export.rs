//! GeoJSON route export.

use std::fs;
use std::ffi::OsStr;
use std::path::Path;

use log::{info, warn};
use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::progress::ProgressReporter;
use crate::store::TrackStore;

/// Directory routes are written to when no other is given.
pub const DEFAULT_EXPORT_DIR: &str = "output";

/// Path properties carried over to the exported feature.
const EXPORTED_PROPERTIES: [&str; 4] = ["distance", "time", "ascend", "descend"];

/// Convert a stored route response into a GeoJSON `Feature`.
///
/// Needs `paths[0].points` to be a decoded `LineString`; anything else is
/// returned unchanged.
pub fn route_to_geojson(route_json: &str) -> String {
    let response: Value = match serde_json::from_str(route_json) {
        Ok(value) => value,
        Err(e) => {
            warn!("[Export] Error converting to GeoJSON: {}", e);
            return route_json.to_string();
        }
    };

    let Some(path) = response.pointer("/paths/0") else {
        return route_json.to_string();
    };
    let points = &path["points"];
    if points["type"] != "LineString" {
        return route_json.to_string();
    }
    let Some(coordinates) = points.get("coordinates").filter(|c| c.is_array()) else {
        return route_json.to_string();
    };

    let properties: Map<String, Value> = EXPORTED_PROPERTIES
        .iter()
        .filter_map(|key| path.get(*key).map(|v| (key.to_string(), v.clone())))
        .collect();

    json!({
        "type": "Feature",
        "geometry": {
            "type": "LineString",
            "coordinates": coordinates,
        },
        "properties": properties,
    })
    .to_string()
}

/// Whether a track id can be used as a file name inside the export directory.
fn is_plain_file_stem(track_id: &str) -> bool {
    Path::new(track_id).file_name() == Some(OsStr::new(track_id))
}

/// Write the most recent route of every track to `<dir>/<track_id>.json`.
///
/// Tracks without routes are skipped, as are tracks whose id is not a plain
/// file name (separators, `..`, absolute paths). Returns the number of files
/// written.
pub fn export_routes(
    store: &dyn TrackStore,
    dir: impl AsRef<Path>,
    progress: &dyn ProgressReporter,
) -> Result<usize> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let latest: Vec<_> = store
        .track_ids()
        .iter()
        .filter_map(|id| store.latest_route(id))
        .filter(|route| {
            let plain = is_plain_file_stem(&route.track_id);
            if !plain {
                warn!("[Export] Skipping track {:?}: id is not a plain file name", route.track_id);
            }
            plain
        })
        .collect();

    let total = latest.len() as u32;
    progress.on_start(total);

    let written = (|| -> Result<usize> {
        for (i, route) in latest.iter().enumerate() {
            let file = dir.join(format!("{}.json", route.track_id));
            fs::write(&file, route_to_geojson(&route.route_json))?;
            progress.on_advance(i as u32 + 1, total);
        }
        Ok(latest.len())
    })();

    progress.on_finish();
    let written = written?;
    info!("[Export] Wrote {} routes to {}", written, dir.display());
    Ok(written)
}
