use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::BackendError;
use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

/// Evenly spaced sample points covering `bounds`, corners included.
/// Yields `(grid_size + 1)^2` points, row by row from the south-west corner.
pub fn grid_points(bounds: &MapBounds, grid_size: usize) -> Vec<GeoPoint> {
    let grid_size = grid_size.max(1);
    let sw = bounds.south_west;
    let ne = bounds.north_east;
    let lat_step = (ne.latitude - sw.latitude) / grid_size as f64;
    let lng_step = (ne.longitude - sw.longitude) / grid_size as f64;

    let mut points = Vec::with_capacity((grid_size + 1) * (grid_size + 1));
    for i in 0..=grid_size {
        for j in 0..=grid_size {
            points.push(GeoPoint::new_unchecked(
                sw.latitude + lat_step * i as f64,
                sw.longitude + lng_step * j as f64,
            ));
        }
    }
    points
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthyForSensitive,
    Unhealthy,
    VeryUnhealthy,
}

impl AqiCategory {
    pub fn from_aqi(aqi: u32) -> Self {
        match aqi {
            a if a > 200 => AqiCategory::VeryUnhealthy,
            a if a > 150 => AqiCategory::Unhealthy,
            a if a > 100 => AqiCategory::UnhealthyForSensitive,
            a if a > 50 => AqiCategory::Moderate,
            _ => AqiCategory::Good,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirQualitySample {
    pub position: GeoPoint,
    pub aqi: u32,
    pub category: AqiCategory,
}

#[derive(Serialize)]
struct LookupRequest {
    location: LookupLocation,
}

#[derive(Serialize)]
struct LookupLocation {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    indexes: Vec<AqiIndex>,
}

#[derive(Deserialize)]
struct AqiIndex {
    aqi: Option<u32>,
}

#[derive(Clone)]
pub struct AirQualityClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl AirQualityClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Current AQI at a point. `Ok(None)` when the service has no index for it.
    pub async fn lookup(&self, point: GeoPoint) -> Result<Option<u32>, BackendError> {
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&LookupRequest {
                location: LookupLocation {
                    latitude: point.latitude,
                    longitude: point.longitude,
                },
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status,
                detail: response.text().await.unwrap_or_default(),
            });
        }

        let body: LookupResponse = response.json().await?;
        Ok(body.indexes.first().and_then(|i| i.aqi))
    }

    /// Looks up every grid point concurrently. Points that fail or have no
    /// index are left out.
    pub async fn sample_grid(&self, bounds: &MapBounds, grid_size: usize) -> Vec<AirQualitySample> {
        let points = grid_points(bounds, grid_size);
        let lookups = points.iter().map(|p| self.lookup(*p));
        let results = join_all(lookups).await;

        let samples: Vec<AirQualitySample> = points
            .into_iter()
            .zip(results)
            .filter_map(|(position, result)| match result {
                Ok(Some(aqi)) => Some(AirQualitySample {
                    position,
                    aqi,
                    category: AqiCategory::from_aqi(aqi),
                }),
                Ok(None) => None,
                Err(e) => {
                    warn!(lat = position.latitude, lng = position.longitude, error = %e, "air quality lookup failed");
                    None
                }
            })
            .collect();

        debug!(samples = samples.len(), "air quality grid sampled");
        samples
    }
}
