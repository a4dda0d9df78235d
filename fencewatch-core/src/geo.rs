//! Great-circle Geometry
//!
//! Distance calculations between WGS84 coordinates. All angles are in
//! degrees, all distances in meters.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }

    /// Build a coordinate from optional components.
    ///
    /// Returns `None` unless both latitude and longitude are present.
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        Some(LatLng::new(lat?, lng?))
    }

    /// Great-circle distance to another coordinate in meters
    pub fn distance_to(&self, other: &LatLng) -> f64 {
        haversine_distance(*self, *other)
    }
}

/// Haversine distance in meters between two coordinates.
///
/// NaN components propagate to a NaN result.
pub fn haversine_distance(a: LatLng, b: LatLng) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    EARTH_RADIUS_M * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        let p = LatLng::new(24.7, 46.67);
        assert_eq!(haversine_distance(p, p), 0.0);
    }

    #[test]
    fn test_one_tenth_degree_latitude() {
        // 0.1 degree of latitude is about 11.1 km anywhere on the globe
        let a = LatLng::new(24.7, 46.67);
        let b = LatLng::new(24.8, 46.67);
        let d = haversine_distance(a, b);
        assert!((d - 11_119.5).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn test_symmetric() {
        let a = LatLng::new(51.5074, -0.1278);
        let b = LatLng::new(48.8566, 2.3522);
        let ab = a.distance_to(&b);
        let ba = b.distance_to(&a);
        assert!((ab - ba).abs() < 1e-6);
        // London to Paris is roughly 343.5 km
        assert!((ab - 343_500.0).abs() < 1_000.0, "got {}", ab);
    }

    #[test]
    fn test_longitude_shrinks_with_latitude() {
        let equator = haversine_distance(LatLng::new(0.0, 0.0), LatLng::new(0.0, 1.0));
        let north = haversine_distance(LatLng::new(60.0, 0.0), LatLng::new(60.0, 1.0));
        assert!((north / equator - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_nan_propagates() {
        let a = LatLng::new(f64::NAN, 0.0);
        let b = LatLng::new(0.0, 0.0);
        assert!(haversine_distance(a, b).is_nan());
    }

    #[test]
    fn test_from_parts() {
        assert_eq!(
            LatLng::from_parts(Some(1.0), Some(2.0)),
            Some(LatLng::new(1.0, 2.0))
        );
        assert_eq!(LatLng::from_parts(None, Some(2.0)), None);
        assert_eq!(LatLng::from_parts(Some(1.0), None), None);
    }
}
