use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response, Sse},
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, error, info, warn};

use crate::air_quality::{AirQualitySample, MapBounds};
use crate::backend::{BackendError, HeatmapReading, TransformRequest};
use crate::constants::AIR_QUALITY_GRID_SIZE;
use crate::geo::{Candidate, GeoPoint, ProjectedMarker, Viewpoint};
use crate::layers::{layer_info, summarize_hotspots, DataLayer, Hotspot, HotspotSummary, LayerData, LayerInfo};
use crate::panorama::ViewKey;
use crate::settings::Settings;
use crate::vision::VisionKey;

use super::events::{VisionData, VisionEvent};
use super::state::AppState;

/// Error body the dashboard shows as a toast.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

impl From<BackendError> for ApiError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Status { status, detail } if status.is_client_error() => {
                ApiError::new(StatusCode::BAD_REQUEST, detail)
            }
            other => ApiError::new(StatusCode::BAD_GATEWAY, other.to_string()),
        }
    }
}

// Trees

#[derive(Debug, Deserialize)]
pub struct PlantRequest {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub species: String,
}

pub async fn list_trees(State(state): State<AppState>) -> Json<Vec<Candidate>> {
    Json(state.store.all())
}

pub async fn plant_tree(
    State(state): State<AppState>,
    Json(request): Json<PlantRequest>,
) -> Result<(StatusCode, Json<Candidate>), ApiError> {
    let position = GeoPoint::new(request.lat, request.lng)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;
    let candidate = state
        .store
        .insert(position, &request.species)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;
    info!(id = candidate.id, species = %candidate.species, "planted tree");
    Ok((StatusCode::CREATED, Json(candidate)))
}

pub async fn remove_tree(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<u64>,
) -> StatusCode {
    match state.store.remove(id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

// Panorama view

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub key: Option<ViewKey>,
    /// Bumped on every viewpoint update; lets the dashboard drop old replies.
    pub revision: u64,
    pub nearby: usize,
    pub visible: usize,
    pub markers: Vec<ProjectedMarker>,
}

fn view_response(state: &AppState) -> ViewResponse {
    let fov = state.settings().fov();
    let session = state.session();
    let markers = session.markers(&state.store, fov);
    ViewResponse {
        key: session.current_key(),
        revision: session.revision(),
        nearby: markers.len(),
        visible: markers.iter().filter(|m| m.in_view).count(),
        markers,
    }
}

pub async fn update_viewpoint(
    State(state): State<AppState>,
    Json(viewpoint): Json<Viewpoint>,
) -> Result<Json<ViewResponse>, ApiError> {
    viewpoint
        .position
        .validate()
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    let viewpoint = Viewpoint::new(viewpoint.position, viewpoint.heading, viewpoint.pitch);
    state.session().update(viewpoint);
    Ok(Json(view_response(&state)))
}

pub async fn get_markers(State(state): State<AppState>) -> Json<ViewResponse> {
    Json(view_response(&state))
}

pub async fn close_view(State(state): State<AppState>) -> StatusCode {
    state.session().close();
    StatusCode::NO_CONTENT
}

// Backend proxies

pub async fn get_temperature(
    State(state): State<AppState>,
    AxumPath((lat, lon)): AxumPath<(f64, f64)>,
) -> Result<Json<HeatmapReading>, ApiError> {
    GeoPoint::new(lat, lon).map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;
    let reading = state.backend.temperature(lat, lon).await.map_err(|e| {
        error!(lat, lon, error = %e, "temperature lookup failed");
        ApiError::from(e)
    })?;
    Ok(Json(reading))
}

#[derive(Debug, Serialize)]
pub struct VisualizeResponse {
    pub key: VisionKey,
    /// The user left this view while the request was running.
    pub stale: bool,
    pub shared: bool,
    pub trees_added: u32,
    pub original_image: String,
    pub transformed_image: String,
}

/// Requests a cooling visualization for the trees visible in the current view.
pub async fn visualize(State(state): State<AppState>) -> Result<Json<VisualizeResponse>, ApiError> {
    let settings = state.settings();
    let (viewpoint, markers) = {
        let session = state.session();
        let viewpoint = *session
            .viewpoint()
            .ok_or_else(|| ApiError::new(StatusCode::CONFLICT, "No panorama is open"))?;
        (viewpoint, session.markers(&state.store, settings.fov()))
    };

    let key = VisionKey::new(ViewKey::of(&viewpoint), &markers);
    for marker in markers.iter().filter(|m| m.in_view) {
        debug!(
            id = marker.candidate_id,
            species = %marker.species,
            distance_m = marker.distance_meters,
            placement = marker.placement.describe(),
            "tree in frame"
        );
    }
    let request = TransformRequest::from_markers(&viewpoint, settings.street_view_fov, &markers);
    let _ = state.event_sender.send(VisionEvent::new(
        "requested",
        VisionData {
            lat: Some(viewpoint.position.latitude),
            lng: Some(viewpoint.position.longitude),
            heading: Some(viewpoint.heading),
            trees: Some(request.trees.len()),
            ..Default::default()
        },
    ));

    let backend = state.backend.clone();
    let outcome = state
        .vision
        .get_or_fetch(key, || async move { backend.transform_street_view(&request).await })
        .await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "street view transform failed");
            let _ = state.event_sender.send(VisionEvent::new(
                "failed",
                VisionData {
                    message: Some(e.to_string()),
                    ..Default::default()
                },
            ));
            return Err(e.into());
        }
    };

    let (stale, moved) = {
        let session = state.session();
        (
            !session.is_current(&outcome.key.view),
            session.moved_since(&outcome.key.view),
        )
    };
    if stale {
        warn!(key = ?outcome.key.view, moved, "visualization finished after the view changed");
    }
    let _ = state.event_sender.send(VisionEvent::new(
        "completed",
        VisionData {
            trees_added: Some(outcome.response.trees_added),
            shared: Some(outcome.shared),
            stale: Some(stale),
            ..Default::default()
        },
    ));

    Ok(Json(VisualizeResponse {
        stale,
        shared: outcome.shared,
        trees_added: outcome.response.trees_added,
        original_image: outcome.response.original_image.clone(),
        transformed_image: outcome.response.transformed_image.clone(),
        key: outcome.key,
    }))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct VisionImage {
    pub image_base64: String,
}

/// Proxies a raw image to the generative backend. The reply carries a
/// data URL, empty when nothing was generated.
pub async fn generate_vision(
    State(state): State<AppState>,
    Json(request): Json<VisionImage>,
) -> Result<Json<VisionImage>, ApiError> {
    let image = BASE64
        .decode(request.image_base64.as_bytes())
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("invalid image data: {e}")))?;
    let generated = state.backend.generate_vision(&image).await?;
    let image_base64 = if generated.is_empty() {
        String::new()
    } else {
        format!("data:image/png;base64,{}", BASE64.encode(generated))
    };
    Ok(Json(VisionImage { image_base64 }))
}

#[derive(Debug, Deserialize)]
pub struct AirQualityRequest {
    #[serde(flatten)]
    pub bounds: MapBounds,
    pub grid_size: Option<usize>,
}

pub async fn air_quality(
    State(state): State<AppState>,
    Json(request): Json<AirQualityRequest>,
) -> Result<Json<Vec<AirQualitySample>>, ApiError> {
    let client = state.air_quality.as_ref().ok_or_else(|| {
        ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "Google Maps API key not configured")
    })?;
    let grid = request.grid_size.unwrap_or(AIR_QUALITY_GRID_SIZE).clamp(1, 8);
    Ok(Json(client.sample_grid(&request.bounds, grid).await))
}

// Data layers

#[derive(Debug, Deserialize)]
pub struct LayerInfoRequest {
    #[serde(flatten)]
    pub location: GeoPoint,
    pub layer: DataLayer,
    #[serde(default)]
    pub data: LayerData,
}

pub async fn get_layer_info(Json(request): Json<LayerInfoRequest>) -> Json<Option<LayerInfo>> {
    Json(layer_info(request.location, request.layer, &request.data))
}

pub async fn hotspot_summary(Json(hotspots): Json<Vec<Hotspot>>) -> Json<HotspotSummary> {
    Json(summarize_hotspots(&hotspots))
}

pub async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(state.settings())
}

// Event stream

pub async fn vision_events_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (tx, rx) = tokio::sync::mpsc::channel(100);
    let mut event_receiver = state.event_sender.subscribe();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = event_receiver.recv() => {
                    match event {
                        Ok(vision_event) => {
                            let sse_event = SseEvent::default()
                                .json_data(&vision_event)
                                .unwrap_or_else(|_| SseEvent::default().data("Error serializing event"));
                            if tx.send(Ok(sse_event)).await.is_err() {
                                break; // Client disconnected
                            }
                        }
                        // Slow client: skip what it missed
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
                _ = tokio::time::sleep(Duration::from_secs(30)) => {
                    let sse_event = SseEvent::default()
                        .json_data(VisionEvent::heartbeat())
                        .unwrap_or_else(|_| SseEvent::default().data("Error serializing heartbeat"));
                    if tx.send(Ok(sse_event)).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive-message"),
    )
}

use axum::response::sse::Event as SseEvent;
