use crate::constants::EARTH_RADIUS_M;
use crate::error::GeoError;

use super::point::GeoPoint;

/// Great-circle distance in meters (haversine, spherical Earth).
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat_rad();
    let phi2 = b.lat_rad();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial compass bearing from `from` to `to`, in `[0, 360)`.
///
/// Identical points have no defined bearing; `0.0` is returned for them.
/// Use [`checked_bearing_degrees`] to tell that case apart.
pub fn bearing_degrees(from: GeoPoint, to: GeoPoint) -> f64 {
    if from == to {
        return 0.0;
    }

    let phi1 = from.lat_rad();
    let phi2 = to.lat_rad();
    let d_lambda = to.lon_rad() - from.lon_rad();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
    let theta = y.atan2(x);

    normalize_degrees(theta.to_degrees())
}

pub fn checked_bearing_degrees(from: GeoPoint, to: GeoPoint) -> Result<f64, GeoError> {
    if from == to {
        return Err(GeoError::DegenerateBearing);
    }
    Ok(bearing_degrees(from, to))
}

/// Wraps any angle into `[0, 360)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Bearing relative to the camera heading, in `(-180, 180]`.
/// Negative is left of the heading, positive is right.
pub fn relative_bearing(bearing: f64, heading: f64) -> f64 {
    let rel = normalize_degrees(bearing - heading);
    if rel > 180.0 {
        rel - 360.0
    } else {
        rel
    }
}
