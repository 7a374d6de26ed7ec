//! Geographic positions and the local tangent-plane projection
//!
//! All plume geometry is computed in meters on a local east/north plane
//! anchored at a source, then projected back to latitude/longitude with an
//! equirectangular approximation. At the few-kilometre scales a plume covers,
//! the error against a geodesic solution is well under one grid step.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Meters per degree of latitude (mean value at mid latitudes)
pub const METERS_PER_DEGREE_LAT: f64 = 111_132.954;

/// A WGS84 position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (north positive)
    pub lat: f64,
    /// Longitude in degrees (east positive)
    pub lng: f64,
}

impl GeoPoint {
    /// Create a new position
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Meters per degree of longitude at this latitude
    #[inline]
    #[must_use]
    pub fn meters_per_degree_lng(&self) -> f64 {
        METERS_PER_DEGREE_LAT * self.lat.to_radians().cos()
    }

    /// Position displaced by a local (east, north) offset in meters
    #[must_use]
    pub fn offset_by(&self, offset: Vector2<f64>) -> Self {
        Self {
            lat: self.lat + offset.y / METERS_PER_DEGREE_LAT,
            lng: self.lng + offset.x / self.meters_per_degree_lng(),
        }
    }

    /// Local (east, north) offset of `self` relative to `origin`, in meters
    #[must_use]
    pub fn local_offset_from(&self, origin: &GeoPoint) -> Vector2<f64> {
        Vector2::new(
            (self.lng - origin.lng) * origin.meters_per_degree_lng(),
            (self.lat - origin.lat) * METERS_PER_DEGREE_LAT,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_offset_round_trips_through_local_frame() {
        let origin = GeoPoint::new(55.7558, 37.6173);
        let moved = origin.offset_by(Vector2::new(350.0, -140.0));
        let back = moved.local_offset_from(&origin);
        assert_relative_eq!(back.x, 350.0, epsilon = 1e-6);
        assert_relative_eq!(back.y, -140.0, epsilon = 1e-6);
    }

    #[test]
    fn test_longitude_degrees_shrink_with_latitude() {
        let equator = GeoPoint::new(0.0, 0.0);
        let north = GeoPoint::new(60.0, 0.0);
        assert_relative_eq!(
            north.meters_per_degree_lng(),
            equator.meters_per_degree_lng() * 0.5,
            epsilon = 1e-6
        );
    }
}
