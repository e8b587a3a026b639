use thiserror::Error;

/// Failures that can be detected at the boundary of the projection engine.
///
/// The engine functions themselves never return these; they are raised by
/// the validating constructors and the `checked_*` variants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),
    #[error("bearing is undefined between identical points")]
    DegenerateBearing,
}

impl GeoError {
    /// Both latitude and longitude errors are the `InvalidCoordinate` class.
    pub fn is_invalid_coordinate(&self) -> bool {
        matches!(self, GeoError::InvalidLatitude(_) | GeoError::InvalidLongitude(_))
    }
}
