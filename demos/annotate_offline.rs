//! Filter POIs for a couple of tracks without touching the network.
//!
//! Run with: RUST_LOG=debug cargo run --example annotate_offline

use trail_annotator::{
    filter_all_tracks, import_tracks_csv, route_waypoints, AtomicProgress, FilterConfig,
    MemoryStore, RawPoi, TrackStore,
};

const TRACKS_CSV: &str = r#"mont-blanc,"{""type"":""LineString"",""coordinates"":[[6.8652,45.8326],[6.8700,45.8360],[6.8760,45.8400],[6.8830,45.8450]]}"
lac-blanc,"{""type"":""Feature"",""geometry"":{""type"":""LineString"",""coordinates"":[[6.8900,45.9600],[6.8950,45.9650],[6.9000,45.9700]]}}"
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut store = MemoryStore::new();
    let imported = import_tracks_csv(&mut store, TRACKS_CSV.as_bytes())?;
    println!("Imported {} tracks\n", imported);

    // Stand-ins for what the POI source would return
    store.replace_raw_pois(
        "mont-blanc",
        vec![
            RawPoi::new("mont-blanc", "1001", 45.8340, 6.8680, "natural:peak")
                .with_name("Pointe Nord"),
            RawPoi::new("mont-blanc", "1002", 45.8395, 6.8755, "tourism:viewpoint"),
            RawPoi::new("mont-blanc", "1003", 45.8600, 6.9500, "historic:ruins"), // far away
        ],
    );

    let config = FilterConfig { max_pois: 5 };
    let progress = AtomicProgress::new();
    let result = filter_all_tracks(&mut store, &config, &progress);

    println!(
        "Filtered {} tracks: {} real POIs, {} artificial\n",
        result.tracks_processed, result.filtered_pois, result.artificial_pois
    );

    for track_id in store.track_ids() {
        println!("{}:", track_id);
        let filtered = store.filtered_pois(&track_id);
        for poi in &filtered {
            println!(
                "   {:>7.1}m  {:<20} {}",
                poi.track_position,
                poi.poi_type,
                poi.name.as_deref().unwrap_or("-")
            );
        }

        if let Some(track) = store.track(&track_id) {
            if let Some(waypoints) = route_waypoints(&track.points(), &filtered) {
                println!("   {} routing waypoints\n", waypoints.len());
            }
        }
    }

    Ok(())
}
