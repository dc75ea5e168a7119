use crate::core::constants::{EARTH_RADIUS_METERS, METERS_PER_DEGREE};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validates that the coordinates are finite and within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Returns the coordinate if it is valid, an `InvalidCoordinates` error otherwise
    pub fn validate(self) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(Error::InvalidCoordinates(format!(
                "({}, {}) is outside lat [-90, 90] / lng [-180, 180]",
                self.lat, self.lng
            )))
        }
    }

    /// Great-circle distance to another coordinate in meters
    pub fn distance_to(&self, other: &LatLng) -> f64 {
        distance_meters(self, other)
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl From<(f64, f64)> for LatLng {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}

/// Computes the great-circle distance between two coordinates with the
/// haversine formula on a spherical Earth of radius 6 371 000 m.
///
/// The result is non-negative, symmetric and zero for identical inputs.
/// Ranges are not checked here.
pub fn distance_meters(a: &LatLng, b: &LatLng) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for near-antipodal points.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Approximates a square of `side_meters` centered on `center`.
///
/// Uses a flat-Earth per-degree conversion; the longitude delta is scaled by
/// `cos(lat)` and diverges towards the poles.
pub fn square_bounds(center: &LatLng, side_meters: f64) -> LatLngBounds {
    let half_side = side_meters / 2.0;
    let lat_delta = half_side / METERS_PER_DEGREE;
    let lng_delta = half_side / (METERS_PER_DEGREE * center.lat.to_radians().cos());

    LatLngBounds::from_coords(
        center.lat - lat_delta,
        center.lng - lng_delta,
        center.lat + lat_delta,
        center.lng + lng_delta,
    )
}

/// Represents a bounding box of geographical coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self::new(LatLng::new(south, west), LatLng::new(north, east))
    }

    pub fn north(&self) -> f64 {
        self.north_east.lat
    }

    pub fn south(&self) -> f64 {
        self.south_west.lat
    }

    pub fn east(&self) -> f64 {
        self.north_east.lng
    }

    pub fn west(&self) -> f64 {
        self.south_west.lng
    }

    /// Checks if the bounds contain a point
    pub fn contains(&self, point: &LatLng) -> bool {
        point.lat >= self.south()
            && point.lat <= self.north()
            && point.lng >= self.west()
            && point.lng <= self.east()
    }

    /// Clamps a point into the bounds
    pub fn clamp(&self, point: &LatLng) -> LatLng {
        LatLng::new(
            point.lat.clamp(self.south(), self.north()),
            point.lng.clamp(self.west(), self.east()),
        )
    }

    /// Gets the center point of the bounds
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south() + self.north()) / 2.0,
            (self.west() + self.east()) / 2.0,
        )
    }

    /// Gets the span of the bounds in degrees
    pub fn span(&self) -> LatLng {
        LatLng::new(self.north() - self.south(), self.east() - self.west())
    }
}
