//! WGS84 coordinates and great-circle distance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Mean Earth radius used by the haversine formula, in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A latitude/longitude pair in decimal degrees.
///
/// Serialized with the backend's field names (`latitude`, `longitude`) so it
/// can be flattened into wire records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Create validated coordinates.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if either value is not finite or is
    /// outside [-90, 90] / [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DomainError> {
        let coordinates = Self {
            latitude,
            longitude,
        };
        if !coordinates.is_valid() {
            return Err(DomainError::validation(format!(
                "coordinates out of range: ({}, {})",
                latitude, longitude
            )));
        }
        Ok(coordinates)
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance to `other` in metres (haversine).
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }
}

/// One reading from the device location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub coordinates: Coordinates,
    /// Horizontal accuracy radius in metres, when the provider reports one.
    pub accuracy_m: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl PositionSample {
    pub fn new(coordinates: Coordinates, accuracy_m: Option<f64>, captured_at: DateTime<Utc>) -> Self {
        Self {
            coordinates,
            accuracy_m,
            captured_at,
        }
    }
}
