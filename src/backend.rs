//! Client for the heat-map and image-transform backend.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::constants::BACKEND_TIMEOUT_SECS;
use crate::geo::{ProjectedMarker, Viewpoint};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {detail}")]
    Status { status: StatusCode, detail: String },
    #[error("backend sent invalid image data: {0}")]
    InvalidImage(#[from] base64::DecodeError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapReading {
    pub lat: f64,
    pub lon: f64,
    pub temperature_c: f64,
    pub source: String,
}

/// One planted tree as the transform service expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreePosition {
    pub species: String,
    pub bearing: f64,
    pub distance: f64,
    pub lat: f64,
    pub lng: f64,
}

impl From<&ProjectedMarker> for TreePosition {
    fn from(marker: &ProjectedMarker) -> Self {
        Self {
            species: marker.species.clone(),
            bearing: marker.bearing_degrees,
            distance: marker.distance_meters,
            lat: marker.position.latitude,
            lng: marker.position.longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRequest {
    pub lat: f64,
    pub lng: f64,
    pub heading: f64,
    pub pitch: f64,
    pub fov: f64,
    pub trees: Vec<TreePosition>,
}

impl TransformRequest {
    /// Builds the request from the in-view markers only.
    pub fn from_markers(viewpoint: &Viewpoint, fov: f64, markers: &[ProjectedMarker]) -> Self {
        Self {
            lat: viewpoint.position.latitude,
            lng: viewpoint.position.longitude,
            heading: viewpoint.heading,
            pitch: viewpoint.pitch,
            fov,
            trees: markers
                .iter()
                .filter(|m| m.in_view)
                .map(TreePosition::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformResponse {
    /// Base64 JPEG
    pub original_image: String,
    /// Base64 JPEG
    pub transformed_image: String,
    #[serde(default)]
    pub trees_added: u32,
}

#[derive(Serialize)]
struct VisionRequest<'a> {
    image_base64: &'a str,
}

#[derive(Deserialize)]
struct VisionResponse {
    #[serde(default)]
    image_base64: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(BACKEND_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[instrument(skip(self))]
    pub async fn temperature(&self, lat: f64, lon: f64) -> Result<HeatmapReading, BackendError> {
        let url = format!("{}/heatmap/{}/{}", self.base_url, lat, lon);
        let response = self.http.get(url).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Sends an image and returns the generated image bytes. An empty
    /// result means the backend produced nothing.
    pub async fn generate_vision(&self, image: &[u8]) -> Result<Vec<u8>, BackendError> {
        let encoded = BASE64.encode(image);
        let url = format!("{}/generate-vision", self.base_url);
        let response = self
            .http
            .post(url)
            .json(&VisionRequest {
                image_base64: &encoded,
            })
            .send()
            .await?;
        let body: VisionResponse = check_status(response).await?.json().await?;

        match body.image_base64 {
            Some(b64) if !b64.is_empty() => Ok(BASE64.decode(b64.as_bytes())?),
            _ => Ok(Vec::new()),
        }
    }

    #[instrument(skip(self, request), fields(trees = request.trees.len()))]
    pub async fn transform_street_view(
        &self,
        request: &TransformRequest,
    ) -> Result<TransformResponse, BackendError> {
        let url = format!("{}/streetview-ai/transform", self.base_url);
        let response = self.http.post(url).json(request).send().await?;
        let body: TransformResponse = check_status(response).await?.json().await?;
        debug!(trees_added = body.trees_added, "street view transformed");
        Ok(body)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.detail)
        .unwrap_or_else(|| {
            if text.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                text
            }
        });
    Err(BackendError::Status { status, detail })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{project_markers, Candidate, FovParams, GeoPoint};
    use axum::extract::Path;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn temperature_hits_heatmap_route() {
        let app = Router::new().route(
            "/heatmap/:lat/:lon",
            get(|Path((lat, lon)): Path<(f64, f64)>| async move {
                Json(json!({"lat": lat, "lon": lon, "temperature_c": 31.2, "source": "landsat"}))
            }),
        );
        let client = BackendClient::new(spawn(app).await).unwrap();
        let reading = client.temperature(49.28, -123.12).await.unwrap();
        assert_eq!(reading.lat, 49.28);
        assert_eq!(reading.lon, -123.12);
        assert_eq!(reading.temperature_c, 31.2);
        assert_eq!(reading.source, "landsat");
    }

    #[tokio::test]
    async fn error_detail_is_surfaced() {
        let app = Router::new().route(
            "/generate-vision",
            post(|| async {
                (
                    AxumStatus::BAD_REQUEST,
                    Json(json!({"detail": "Gemini API key not configured"})),
                )
            }),
        );
        let client = BackendClient::new(spawn(app).await).unwrap();
        match client.generate_vision(b"jpeg").await {
            Err(BackendError::Status { status, detail }) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(detail, "Gemini API key not configured");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn generate_vision_round_trips_base64() {
        let app = Router::new().route(
            "/generate-vision",
            post(|Json(body): Json<Value>| async move {
                let sent = body["image_base64"].as_str().unwrap().to_string();
                let bytes = BASE64.decode(sent).unwrap();
                let mut reply = bytes.clone();
                reply.reverse();
                Json(json!({"image_base64": BASE64.encode(reply)}))
            }),
        );
        let client = BackendClient::new(spawn(app).await).unwrap();
        let out = client.generate_vision(&[1, 2, 3]).await.unwrap();
        assert_eq!(out, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn generate_vision_without_image_is_empty() {
        let app = Router::new().route("/generate-vision", post(|| async { Json(json!({})) }));
        let client = BackendClient::new(spawn(app).await).unwrap();
        assert!(client.generate_vision(&[9]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn transform_posts_visible_trees() {
        let app = Router::new().route(
            "/streetview-ai/transform",
            post(|Json(body): Json<Value>| async move {
                let count = body["trees"].as_array().map(|t| t.len()).unwrap_or(0);
                Json(json!({
                    "original_image": "b3JpZw==",
                    "transformed_image": "bmV3",
                    "location": {"lat": body["lat"], "lng": body["lng"]},
                    "trees_added": count,
                }))
            }),
        );
        let client = BackendClient::new(format!("{}/", spawn(app).await)).unwrap();

        let viewpoint = Viewpoint::looking_north(GeoPoint::new_unchecked(49.2827, -123.1207));
        let trees = vec![
            Candidate::new(1, GeoPoint::new_unchecked(49.2830, -123.1207), "oak"),
            Candidate::new(2, GeoPoint::new_unchecked(49.2824, -123.1207), "elm"),
        ];
        let markers = project_markers(&viewpoint, &trees, FovParams::default());
        let request = TransformRequest::from_markers(&viewpoint, 90.0, &markers);
        assert_eq!(request.trees.len(), 1);
        assert_eq!(request.trees[0].species, "oak");

        let response = client.transform_street_view(&request).await.unwrap();
        assert_eq!(response.trees_added, 1);
        assert_eq!(response.transformed_image, "bmV3");
    }

    #[test]
    fn base_url_drops_trailing_slashes() {
        let client = BackendClient::with_client(reqwest::Client::new(), "http://backend:8000//");
        assert_eq!(client.base_url(), "http://backend:8000");
    }

    #[test]
    fn tree_position_wire_shape() {
        let viewpoint = Viewpoint::looking_north(GeoPoint::new_unchecked(49.2827, -123.1207));
        let trees = vec![Candidate::new(1, GeoPoint::new_unchecked(49.2830, -123.1207), "oak")];
        let markers = project_markers(&viewpoint, &trees, FovParams::default());
        let value = serde_json::to_value(TreePosition::from(&markers[0])).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["bearing", "distance", "lat", "lng", "species"]);
    }
}
