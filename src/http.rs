//! HTTP clients for the POI source and the routing service.
//!
//! Both services are called once per track, sequentially. Requests that hit a
//! rate limit (429) or a busy gateway (503/504) are retried with exponential
//! backoff; connection errors are retried with a shorter backoff.

use std::time::Duration;

use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{AnnotatorError, Result};
use crate::overpass::{build_overpass_query, parse_overpass_response, track_bounds, PoiSearchResult};
use crate::progress::ProgressReporter;
use crate::routing::{build_route_request, route_waypoints, Route, RouteGenerationResult};
use crate::store::TrackStore;
use crate::{Bounds, GpsPoint, RawPoi};

/// Endpoints and request policy for the external services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Overpass interpreter endpoint.
    /// Default: "https://overpass-api.de/api/interpreter"
    pub overpass_url: String,
    /// GraphHopper-compatible route endpoint.
    /// Default: "https://graphhopper.com/api/1/route"
    pub routing_url: String,
    /// Sent as the `key` query parameter when set.
    /// Default: None
    pub routing_api_key: Option<String>,
    /// Per-request timeout.
    /// Default: 60
    pub timeout_secs: u64,
    /// Retries after the first attempt.
    /// Default: 3
    pub max_retries: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            routing_url: "https://graphhopper.com/api/1/route".to_string(),
            routing_api_key: None,
            timeout_secs: 60,
            max_retries: 3,
        }
    }
}

fn build_client(config: &ServiceConfig) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .pool_idle_timeout(Duration::from_secs(60))
        .tcp_keepalive(Duration::from_secs(30))
        .build()?)
}

/// Wait before retrying a throttled request: 500ms, 1s, 2s, then 4s max.
fn throttle_backoff(attempt: u32) -> Duration {
    Duration::from_millis(500 * (1 << attempt.min(3)))
}

/// Wait before retrying after a connection error: 400ms, 800ms, 1.6s, ...
fn error_backoff(attempt: u32) -> Duration {
    Duration::from_millis(200 * (1 << attempt.min(5)))
}

fn is_throttled(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::SERVICE_UNAVAILABLE
        || status == StatusCode::GATEWAY_TIMEOUT
}

/// Send the request built by `make_request`, retrying as needed, and return
/// the response body.
async fn send_with_retry<F>(
    service: &'static str,
    max_retries: u32,
    make_request: F,
) -> Result<String>
where
    F: Fn() -> RequestBuilder,
{
    let mut retries = 0;

    loop {
        match make_request().send().await {
            Ok(resp) => {
                let status = resp.status();

                if is_throttled(status) {
                    retries += 1;
                    if retries > max_retries {
                        return Err(AnnotatorError::RetriesExhausted { service });
                    }
                    let wait = throttle_backoff(retries);
                    warn!(
                        "[{}] HTTP {}, retry {} after {:?}",
                        service,
                        status.as_u16(),
                        retries,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }

                if !status.is_success() {
                    return Err(AnnotatorError::Service { service, status: status.as_u16() });
                }

                return Ok(resp.text().await?);
            }
            Err(e) => {
                retries += 1;
                if retries > max_retries {
                    return Err(e.into());
                }
                let wait = error_backoff(retries);
                warn!("[{}] Request error: {}, retry {} after {:?}", service, e, retries, wait);
                tokio::time::sleep(wait).await;
            }
        }
    }
}

// ============================================================================
// Overpass
// ============================================================================

/// Client for the Overpass POI source.
pub struct OverpassClient {
    client: Client,
    url: String,
    max_retries: u32,
}

impl OverpassClient {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            url: config.overpass_url.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Run the POI query for `bounds` and return the raw JSON response.
    pub async fn query_bounds(&self, bounds: &Bounds) -> Result<String> {
        let query = build_overpass_query(bounds);
        debug!("[Overpass] Querying {:?}", bounds);

        send_with_retry("Overpass", self.max_retries, || {
            self.client.post(&self.url).form(&[("data", query.as_str())])
        })
        .await
    }

    /// Fetch the POIs inside `bounds` for `track_id`.
    pub async fn fetch_pois(&self, track_id: &str, bounds: &Bounds) -> Result<Vec<RawPoi>> {
        let response = self.query_bounds(bounds).await?;
        parse_overpass_response(&response, track_id)
    }
}

/// Replace the raw POIs of one track with a fresh Overpass search.
///
/// A track whose GeoJSON holds no coordinates ends up with no POIs.
pub async fn search_pois_for_track(
    client: &OverpassClient,
    store: &mut dyn TrackStore,
    track_id: &str,
) -> Result<PoiSearchResult> {
    let track = store
        .track(track_id)
        .ok_or_else(|| AnnotatorError::TrackNotFound(track_id.to_string()))?;

    let pois = match track_bounds(&track.points()) {
        Some(bounds) => client.fetch_pois(track_id, &bounds).await?,
        None => {
            debug!("[Overpass] Track {} has no coordinates, skipping query", track_id);
            Vec::new()
        }
    };

    let pois_found = pois.len();
    store.replace_raw_pois(track_id, pois);
    debug!("[Overpass] {} POIs for track {}", pois_found, track_id);

    Ok(PoiSearchResult { pois_found, tracks_processed: 1 })
}

/// Search POIs for every stored track.
///
/// Failures are logged and the run moves on to the next track.
pub async fn search_pois_for_all_tracks(
    client: &OverpassClient,
    store: &mut dyn TrackStore,
    progress: &dyn ProgressReporter,
) -> PoiSearchResult {
    let track_ids = store.track_ids();
    search_tracks(client, store, &track_ids, progress).await
}

/// Search POIs only for tracks that have none yet.
pub async fn search_pois_for_missing_tracks(
    client: &OverpassClient,
    store: &mut dyn TrackStore,
    progress: &dyn ProgressReporter,
) -> PoiSearchResult {
    let track_ids = store.tracks_without_pois();
    search_tracks(client, store, &track_ids, progress).await
}

async fn search_tracks(
    client: &OverpassClient,
    store: &mut dyn TrackStore,
    track_ids: &[String],
    progress: &dyn ProgressReporter,
) -> PoiSearchResult {
    let total = track_ids.len() as u32;
    progress.on_start(total);

    let mut result = PoiSearchResult::default();
    for (i, track_id) in track_ids.iter().enumerate() {
        match search_pois_for_track(client, store, track_id).await {
            Ok(found) => result.pois_found += found.pois_found,
            Err(e) => warn!("[Overpass] POI search failed for track {}: {}", track_id, e),
        }
        result.tracks_processed += 1;
        progress.on_advance(i as u32 + 1, total);
    }

    progress.on_finish();
    info!(
        "[Overpass] Found {} POIs across {} tracks",
        result.pois_found, result.tracks_processed
    );
    result
}

// ============================================================================
// Routing
// ============================================================================

/// Client for the routing service.
pub struct RoutingClient {
    client: Client,
    url: String,
    api_key: Option<String>,
    max_retries: u32,
}

impl RoutingClient {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            url: config.routing_url.clone(),
            api_key: config.routing_api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Request a hiking route through `waypoints` and return the raw response.
    pub async fn route(&self, waypoints: &[GpsPoint]) -> Result<String> {
        let body = build_route_request(waypoints);
        debug!("[Routing] Requesting route through {} waypoints", waypoints.len());

        send_with_retry("Routing", self.max_retries, || {
            let request = self.client.post(&self.url).json(&body);
            match &self.api_key {
                Some(key) => request.query(&[("key", key.as_str())]),
                None => request,
            }
        })
        .await
    }
}

/// Compute and store the route of one track through its filtered POIs.
///
/// Returns `Ok(false)` without calling the service when the track has no
/// coordinates or no filtered POIs; its stored routes are cleared. On success
/// the new route replaces any stored ones.
pub async fn generate_route_for_track(
    client: &RoutingClient,
    store: &mut dyn TrackStore,
    track_id: &str,
) -> Result<bool> {
    let track = store
        .track(track_id)
        .ok_or_else(|| AnnotatorError::TrackNotFound(track_id.to_string()))?;

    let Some(waypoints) = route_waypoints(&track.points(), &store.filtered_pois(track_id)) else {
        debug!("[Routing] Track {} has nothing to route", track_id);
        store.replace_routes(track_id, Vec::new());
        return Ok(false);
    };

    let response = client.route(&waypoints).await?;
    let route = Route::from_response(track_id, &response);
    debug!(
        "[Routing] Track {}: {:.0}m, {:.0}s",
        track_id, route.distance, route.duration
    );
    store.replace_routes(track_id, vec![route]);

    Ok(true)
}

/// Route every track that has filtered POIs.
pub async fn generate_routes_for_all_tracks(
    client: &RoutingClient,
    store: &mut dyn TrackStore,
    progress: &dyn ProgressReporter,
) -> RouteGenerationResult {
    let track_ids: Vec<String> = store
        .filtered_poi_counts_by_track()
        .into_iter()
        .filter(|c| c.count > 0)
        .map(|c| c.track_id)
        .collect();

    let total = track_ids.len() as u32;
    progress.on_start(total);

    let mut result = RouteGenerationResult::default();
    for (i, track_id) in track_ids.iter().enumerate() {
        match generate_route_for_track(client, store, track_id).await {
            Ok(true) => result.routes_generated += 1,
            Ok(false) => {}
            Err(e) => warn!("[Routing] Route generation failed for track {}: {}", track_id, e),
        }
        result.tracks_processed += 1;
        progress.on_advance(i as u32 + 1, total);
    }

    progress.on_finish();
    info!(
        "[Routing] Generated {} routes for {} tracks",
        result.routes_generated, result.tracks_processed
    );
    result
}
