//! Great-circle distance between coordinates.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Mean Earth radius in kilometres, used by every distance in the service.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 position. Ranges are not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Haversine distance in kilometres. NaN in, NaN out.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    // Clamp guards against h drifting just past 1.0 for antipodal points.
    2.0 * EARTH_RADIUS_KM * h.sqrt().clamp(0.0, 1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        for c in [
            Coordinate::new(41.504, -71.326),
            Coordinate::new(-33.86, 151.21),
            Coordinate::new(0.0, 0.0),
            Coordinate::new(89.9, 179.9),
        ] {
            assert_eq!(distance_km(c, c), 0.0);
        }
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Coordinate::new(41.504, -71.326);
        let b = Coordinate::new(37.806, -122.465);
        assert_eq!(distance_km(a, b), distance_km(b, a));
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // 2πR / 360 ≈ 111.19 km
        let d = distance_km(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0));
        assert!((d - 111.195).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn test_newport_to_san_francisco() {
        let d = distance_km(
            Coordinate::new(41.504, -71.326),
            Coordinate::new(37.806, -122.465),
        );
        // Roughly 4,280 km coast to coast
        assert!(d > 4200.0 && d < 4350.0, "got {}", d);
    }

    #[test]
    fn test_antipodal_points() {
        let d = distance_km(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_nan_propagates() {
        let d = distance_km(Coordinate::new(f64::NAN, 0.0), Coordinate::new(0.0, 0.0));
        assert!(d.is_nan());
    }
}
