use crate::constants::EARTH_RADIUS_M;

use super::bearing::distance_meters;
use super::point::{GeoPoint, Located};

/// Planar distance in raw degrees. Only meaningful for ranking points a few
/// hundred meters apart away from the poles. The longitude difference is
/// taken the short way round, so points either side of the antimeridian
/// stay close.
pub fn degree_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = b.latitude - a.latitude;
    let mut d_lon = b.longitude - a.longitude;
    if d_lon > 180.0 {
        d_lon -= 360.0;
    } else if d_lon < -180.0 {
        d_lon += 360.0;
    }
    (d_lat * d_lat + d_lon * d_lon).sqrt()
}

/// Cheap pre-filter: keeps items strictly closer than `radius_deg` degrees.
///
/// A degree of longitude shrinks with latitude, so a fixed degree radius
/// drops points east or west of `center` that are within the intended meter
/// range. Size the radius with [`covering_radius_deg`] when the result feeds
/// [`proximity_filter`].
pub fn coarse_filter<'a, T: Located>(
    items: &'a [T],
    center: GeoPoint,
    radius_deg: f64,
) -> Vec<&'a T> {
    items
        .iter()
        .filter(|item| degree_distance(center, item.location()) < radius_deg)
        .collect()
}

/// Smallest degree radius whose coarse circle contains every point within
/// `radius_m` meters of `center`.
pub fn covering_radius_deg(center: GeoPoint, radius_m: f64) -> f64 {
    let meters_per_deg = EARTH_RADIUS_M.to_radians();
    let lon_scale = center.lat_rad().cos().abs().max(1e-6);
    // Small margin for the chord vs. arc difference
    radius_m / (meters_per_deg * lon_scale) * 1.01
}

/// Keeps items within `radius_m` meters (haversine, inclusive).
pub fn proximity_filter<'a, T: Located>(
    items: &'a [T],
    center: GeoPoint,
    radius_m: f64,
) -> Vec<&'a T> {
    items
        .iter()
        .filter(|item| distance_meters(item.location(), center) <= radius_m)
        .collect()
}

/// First item strictly inside `radius_deg` degrees, in input order.
pub fn find_nearby<T: Located>(items: &[T], center: GeoPoint, radius_deg: f64) -> Option<&T> {
    items
        .iter()
        .find(|item| degree_distance(center, item.location()) < radius_deg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const CENTER: GeoPoint = GeoPoint::new_unchecked(49.2827, -123.1207);

    fn scatter(seed: u64, count: usize, spread_deg: f64) -> Vec<GeoPoint> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                GeoPoint::new_unchecked(
                    CENTER.latitude + rng.gen_range(-spread_deg..spread_deg),
                    CENTER.longitude + rng.gen_range(-spread_deg..spread_deg),
                )
            })
            .collect()
    }

    #[test]
    fn proximity_filter_matches_brute_force() {
        let points = scatter(7, 500, 0.002);
        for radius in [10.0, 50.0, 120.0, 400.0] {
            let filtered: Vec<GeoPoint> = proximity_filter(&points, CENTER, radius)
                .into_iter()
                .copied()
                .collect();

            let mut expected = Vec::new();
            for p in &points {
                if distance_meters(*p, CENTER) <= radius {
                    expected.push(*p);
                }
            }
            assert_eq!(filtered, expected, "radius {radius}");
        }
    }

    #[test]
    fn proximity_filter_is_inclusive_at_the_edge() {
        let north = GeoPoint::new_unchecked(49.2830, -123.1207);
        let exact = distance_meters(north, CENTER);
        assert_eq!(proximity_filter(&[north], CENTER, exact).len(), 1);
        assert!(proximity_filter(&[north], CENTER, exact - 1e-6).is_empty());
    }

    #[test]
    fn proximity_filter_on_empty_input() {
        let none: Vec<GeoPoint> = Vec::new();
        assert!(proximity_filter(&none, CENTER, 50.0).is_empty());
    }

    #[test]
    fn covering_radius_keeps_every_precise_match() {
        let points = scatter(11, 400, 0.001);
        let radius = covering_radius_deg(CENTER, 50.0);
        let coarse = coarse_filter(&points, CENTER, radius);
        for p in proximity_filter(&points, CENTER, 50.0) {
            assert!(coarse.contains(&p), "{p:?} missing from coarse set");
        }
    }

    #[test]
    fn fixed_degree_radius_misses_points_due_east() {
        // 45m east at this latitude is ~0.00062 degrees of longitude
        let east = GeoPoint::new_unchecked(CENTER.latitude, CENTER.longitude + 0.00062);
        assert!(distance_meters(CENTER, east) < 50.0);
        assert!(coarse_filter(&[east], CENTER, 0.0005).is_empty());
        assert_eq!(coarse_filter(&[east], CENTER, covering_radius_deg(CENTER, 50.0)).len(), 1);
    }

    #[test]
    fn degree_distance_wraps_across_antimeridian() {
        let west = GeoPoint::new_unchecked(0.0, 179.9999);
        let east = GeoPoint::new_unchecked(0.0001, -179.9999);
        let d = degree_distance(west, east);
        assert!(d < 0.001, "got {d}");
        assert!((degree_distance(east, west) - d).abs() < 1e-12);

        assert!(distance_meters(west, east) < 50.0);
        let radius = covering_radius_deg(west, 50.0);
        assert_eq!(coarse_filter(&[east], west, radius).len(), 1);
        assert_eq!(find_nearby(&[east], west, 0.001), Some(&east));
    }

    #[test]
    fn coarse_filter_is_strict() {
        let origin = GeoPoint::new_unchecked(0.0, 0.0);
        let edge = GeoPoint::new_unchecked(0.5, 0.0);
        assert!(coarse_filter(&[edge], origin, 0.5).is_empty());
        assert_eq!(coarse_filter(&[edge], origin, 0.5001).len(), 1);
    }

    #[test]
    fn find_nearby_returns_first_match() {
        let points = [
            GeoPoint::new_unchecked(10.0, 10.0),
            GeoPoint::new_unchecked(CENTER.latitude + 0.0002, CENTER.longitude),
            GeoPoint::new_unchecked(CENTER.latitude, CENTER.longitude + 0.0001),
        ];
        assert_eq!(find_nearby(&points, CENTER, 0.001), Some(&points[1]));
        assert_eq!(find_nearby(&points[..1], CENTER, 0.001), None);
    }
}
