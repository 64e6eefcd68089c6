//! Full pipeline against the live services: import, POI search, filtering,
//! routing and GeoJSON export.
//!
//! Run with: ROUTING_API_KEY=... cargo run --example annotate_online --features http [tracks.csv]

use trail_annotator::export::DEFAULT_EXPORT_DIR;
use trail_annotator::import::DEFAULT_IMPORT_PATH;
use trail_annotator::{
    export_routes, filter_all_tracks, generate_routes_for_all_tracks, import_tracks_csv_path,
    search_pois_for_missing_tracks, AtomicProgress, FilterConfig, MemoryStore, OverpassClient,
    RoutingClient, ServiceConfig, TrackStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let csv_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_IMPORT_PATH.to_string());
    let config = ServiceConfig {
        routing_api_key: std::env::var("ROUTING_API_KEY").ok(),
        ..ServiceConfig::default()
    };

    let mut store = MemoryStore::new();
    let imported = import_tracks_csv_path(&mut store, &csv_path)?;
    println!("Imported {} tracks from {}", imported, csv_path);

    let progress = AtomicProgress::new();

    let overpass = OverpassClient::new(&config)?;
    let search = search_pois_for_missing_tracks(&overpass, &mut store, &progress).await;
    println!("Found {} POIs for {} tracks", search.pois_found, search.tracks_processed);

    let filtered = filter_all_tracks(&mut store, &FilterConfig::default(), &progress);
    println!(
        "Kept {} real and {} artificial POIs",
        filtered.filtered_pois, filtered.artificial_pois
    );

    let routing = RoutingClient::new(&config)?;
    let routes = generate_routes_for_all_tracks(&routing, &mut store, &progress).await;
    println!("Generated {} routes for {} tracks", routes.routes_generated, routes.tracks_processed);

    let written = export_routes(&store, DEFAULT_EXPORT_DIR, &progress)?;
    println!("Exported {} routes to {}/", written, DEFAULT_EXPORT_DIR);
    println!("Total route length: {:.1} km", total_route_km(&store));

    Ok(())
}

fn total_route_km(store: &MemoryStore) -> f64 {
    store
        .track_ids()
        .iter()
        .filter_map(|id| store.latest_route(id))
        .map(|route| route.distance / 1000.0)
        .sum()
}
