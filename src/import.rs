//! CSV track import.
//!
//! The input is a headerless CSV with one track per row: the hike id followed
//! by the track's GeoJSON (quoted, since GeoJSON contains commas).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{debug, info};

use crate::error::{AnnotatorError, Result};
use crate::store::TrackStore;
use crate::track::Track;

/// Where the track CSV is expected when no path is given.
pub const DEFAULT_IMPORT_PATH: &str = "input/flat/id_geojson.csv";

/// Import `hike_id,geojson` rows into `store`.
///
/// Rows with fewer than two fields are skipped, as are ids the store already
/// holds. Returns the number of tracks added.
pub fn import_tracks_csv<R: Read>(store: &mut dyn TrackStore, reader: R) -> Result<usize> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut imported = 0;
    for record in rdr.records() {
        let record = record?;
        let (Some(hike_id), Some(geojson)) = (record.get(0), record.get(1)) else {
            debug!("[Import] Skipping row with {} field(s)", record.len());
            continue;
        };

        if store.insert_track(Track::new(hike_id, geojson)) {
            imported += 1;
        } else {
            debug!("[Import] Track {} already present, skipping", hike_id);
        }
    }

    info!("[Import] Imported {} tracks", imported);
    Ok(imported)
}

/// Import tracks from a CSV file.
pub fn import_tracks_csv_path(store: &mut dyn TrackStore, path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AnnotatorError::MissingInput(path.display().to_string()));
    }

    let file = File::open(path)?;
    import_tracks_csv(store, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::io::Write;

    const CSV: &str = "hike-1,\"{\"\"type\"\":\"\"LineString\"\",\"\"coordinates\"\":[[6.86,45.83],[6.87,45.84]]}\"\n\
                       lonely-field\n\
                       hike-2,\"[[7.0,46.0],[7.1,46.1]]\"\n";

    #[test]
    fn test_import_rows() {
        let mut store = MemoryStore::new();
        let count = import_tracks_csv(&mut store, CSV.as_bytes()).unwrap();

        assert_eq!(count, 2);
        assert_eq!(store.track_ids(), vec!["hike-1", "hike-2"]);
        assert_eq!(store.track("hike-1").unwrap().points().len(), 2);
    }

    #[test]
    fn test_import_skips_existing_ids() {
        let mut store = MemoryStore::new();
        store.insert_track(Track::new("hike-2", "{}"));

        let count = import_tracks_csv(&mut store, CSV.as_bytes()).unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.track("hike-2").unwrap().geojson, "{}");

        // Importing again adds nothing
        assert_eq!(import_tracks_csv(&mut store, CSV.as_bytes()).unwrap(), 0);
    }

    #[test]
    fn test_import_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CSV.as_bytes()).unwrap();

        let mut store = MemoryStore::new();
        assert_eq!(import_tracks_csv_path(&mut store, file.path()).unwrap(), 2);
    }

    #[test]
    fn test_missing_file() {
        let mut store = MemoryStore::new();
        let err = import_tracks_csv_path(&mut store, "does/not/exist.csv").unwrap_err();
        assert!(matches!(err, AnnotatorError::MissingInput(_)));
    }
}
