//! Great-circle geometry on WGS84 lat/lng pairs
//!
//! All functions here are pure and never return NaN for finite inputs.
//! Distances are in meters, angles in degrees.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A position in degrees, as delivered by the platform location API.
///
/// No range validation is performed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        GeoPoint { lat, lng }
    }
}

/// Great-circle distance between two points (haversine).
///
/// Symmetric, and exactly 0 for identical points.
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for near-antipodal points
    2.0 * EARTH_RADIUS_M * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Initial compass bearing from `a` to `b`, in `[0, 360)`.
///
/// 0 is north, 90 is east. For `a == b` the result is 0.
pub fn bearing(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    normalize_degrees(y.atan2(x).to_degrees())
}

/// Signed shortest angle from `heading` to `bearing`, in `(-180, 180]`.
///
/// Positive means the target is to the right of where the device points.
pub fn relative_angle(bearing: f64, heading: f64) -> f64 {
    let d = (bearing - heading).rem_euclid(360.0);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Clockwise angle from `heading` to `bearing`, in `[0, 360)`.
pub fn relative_bearing(bearing: f64, heading: f64) -> f64 {
    normalize_degrees(bearing - heading)
}

/// Point reached by travelling `meters` from `origin` along `bearing_deg`.
pub fn destination(origin: GeoPoint, bearing_deg: f64, meters: f64) -> GeoPoint {
    let delta = meters / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let phi1 = origin.lat.to_radians();
    let lambda1 = origin.lng.to_radians();

    let sin_phi2 = phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos();
    let phi2 = sin_phi2.clamp(-1.0, 1.0).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * sin_phi2);

    // Keep longitude in [-180, 180)
    let lng = (lambda2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
    GeoPoint::new(phi2.to_degrees(), lng)
}

/// Wrap any angle into `[0, 360)`.
pub fn normalize_degrees(deg: f64) -> f64 {
    let d = deg.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: GeoPoint = GeoPoint::new(0.0, 0.0);
    const EAST: GeoPoint = GeoPoint::new(0.0, 0.001);

    #[test]
    fn test_distance_zero_for_same_point() {
        for p in [
            ORIGIN,
            GeoPoint::new(-34.6037, -58.3816),
            GeoPoint::new(89.9, 179.9),
        ] {
            assert_eq!(distance(p, p), 0.0);
        }
    }

    #[test]
    fn test_distance_symmetric() {
        let a = GeoPoint::new(-34.6037, -58.3816);
        let b = GeoPoint::new(-40.158595, -71.352592);
        assert_eq!(distance(a, b), distance(b, a));
    }

    #[test]
    fn test_distance_small_offset() {
        // 0.001 degree of longitude on the equator is ~111.2m
        let d = distance(ORIGIN, EAST);
        assert!((d - 111.19).abs() < 0.1, "distance was {}", d);
    }

    #[test]
    fn test_distance_antipodal_is_finite() {
        let d = distance(ORIGIN, GeoPoint::new(0.0, 180.0));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1.0);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        assert!((bearing(ORIGIN, EAST) - 90.0).abs() < 1e-6);
        assert!(bearing(ORIGIN, GeoPoint::new(0.001, 0.0)).abs() < 1e-6);
        assert!((bearing(ORIGIN, GeoPoint::new(-0.001, 0.0)) - 180.0).abs() < 1e-6);
        assert!((bearing(ORIGIN, GeoPoint::new(0.0, -0.001)) - 270.0).abs() < 1e-6);
    }

    #[test]
    fn test_bearing_in_range() {
        let points = [
            GeoPoint::new(51.5, -0.1),
            GeoPoint::new(-33.9, 151.2),
            GeoPoint::new(40.7, -74.0),
            GeoPoint::new(35.7, 139.7),
        ];
        for a in points {
            for b in points {
                let brg = bearing(a, b);
                assert!((0.0..360.0).contains(&brg), "bearing {} out of range", brg);
            }
        }
    }

    #[test]
    fn test_bearing_same_point_is_not_nan() {
        let p = GeoPoint::new(12.5, 45.0);
        let brg = bearing(p, p);
        assert!(!brg.is_nan());
        assert!((0.0..360.0).contains(&brg));
    }

    #[test]
    fn test_relative_angle_wraps() {
        assert_eq!(relative_angle(190.0, 0.0), -170.0);
        assert_eq!(relative_angle(0.0, 190.0), 170.0);
        assert_eq!(relative_angle(90.0, 90.0), 0.0);
        assert_eq!(relative_angle(10.0, 350.0), 20.0);
        assert_eq!(relative_angle(350.0, 10.0), -20.0);
    }

    #[test]
    fn test_relative_angle_half_open_range() {
        // Exactly opposite is +180, never -180
        assert_eq!(relative_angle(270.0, 90.0), 180.0);
        assert_eq!(relative_angle(90.0, 270.0), 180.0);

        let mut b = -720.0;
        while b <= 720.0 {
            let mut h = 0.0;
            while h < 360.0 {
                let r = relative_angle(b, h);
                assert!(r > -180.0 && r <= 180.0, "relative_angle({}, {}) = {}", b, h, r);
                h += 7.5;
            }
            b += 13.0;
        }
    }

    #[test]
    fn test_relative_angle_rotation_invariant() {
        for (b, h) in [(10.0, 20.0), (200.0, 15.0), (359.0, 1.0), (45.0, 300.0)] {
            assert_eq!(relative_angle(b + 360.0, h), relative_angle(b, h));
        }
    }

    #[test]
    fn test_relative_bearing() {
        assert_eq!(relative_bearing(10.0, 350.0), 20.0);
        assert_eq!(relative_bearing(350.0, 10.0), 340.0);
        assert_eq!(relative_bearing(90.0, 90.0), 0.0);
    }

    #[test]
    fn test_destination_matches_distance_and_bearing() {
        let origin = GeoPoint::new(-34.6037, -58.3816);
        let dest = destination(origin, 180.0, 10.0);

        assert!((distance(origin, dest) - 10.0).abs() < 1e-3);
        assert!((bearing(origin, dest) - 180.0).abs() < 1e-3);
    }

    #[test]
    fn test_destination_wraps_longitude() {
        let dest = destination(GeoPoint::new(0.0, 179.9999), 90.0, 100.0);
        assert!(dest.lng < -179.0);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(725.0), 5.0);
        assert!(normalize_degrees(-1e-20) < 360.0);
    }
}
