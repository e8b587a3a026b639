use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_SPECIES;
use crate::error::GeoError;

use super::bearing::normalize_degrees;

/// WGS-84 latitude/longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "lat", alias = "latitude")]
    pub latitude: f64,
    #[serde(rename = "lng", alias = "longitude", alias = "lon")]
    pub longitude: f64,
}

impl GeoPoint {
    /// Builds a point, rejecting coordinates outside the valid ranges.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::InvalidLatitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::InvalidLongitude(longitude));
        }
        Ok(Self { latitude, longitude })
    }

    /// Builds a point without range checks. Out-of-range input yields
    /// well-defined but meaningless projections.
    pub const fn new_unchecked(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn validate(&self) -> Result<(), GeoError> {
        Self::new(self.latitude, self.longitude).map(|_| ())
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude.to_radians()
    }
}

/// Anything that sits at a single geographic position.
pub trait Located {
    fn location(&self) -> GeoPoint;
}

impl Located for GeoPoint {
    fn location(&self) -> GeoPoint {
        *self
    }
}

/// Camera position and look direction inside a panorama.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewpoint {
    #[serde(flatten)]
    pub position: GeoPoint,
    #[serde(default)]
    pub heading: f64,
    #[serde(default)]
    pub pitch: f64,
}

impl Viewpoint {
    pub fn new(position: GeoPoint, heading: f64, pitch: f64) -> Self {
        Self {
            position,
            heading: normalize_degrees(heading),
            pitch,
        }
    }

    pub fn looking_north(position: GeoPoint) -> Self {
        Self::new(position, 0.0, 0.0)
    }
}

/// A planted (or planned) tree evaluated against the current view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: u64,
    #[serde(flatten)]
    pub position: GeoPoint,
    pub species: String,
    pub created_at: DateTime<Utc>,
}

impl Candidate {
    pub fn new(id: u64, position: GeoPoint, species: impl Into<String>) -> Self {
        let species = species.into();
        let species = if species.trim().is_empty() {
            DEFAULT_SPECIES.to_string()
        } else {
            species.trim().to_string()
        };
        Self {
            id,
            position,
            species,
            created_at: Utc::now(),
        }
    }
}

impl Located for Candidate {
    fn location(&self) -> GeoPoint {
        self.position
    }
}
