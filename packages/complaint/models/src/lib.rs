#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Noise complaint record and bounding box types.
//!
//! [`NoiseComplaint`] is the validated shape shared by the ingestion client,
//! the complaint store, and the scoring pipeline. Field names on the wire
//! follow the 311 dataset columns (`unique_key`, `complaint_type`) so the
//! same type round-trips through the store and the HTTP API unchanged.

use serde::{Deserialize, Serialize};

/// Approximate miles per degree of latitude.
pub const MILES_PER_DEGREE_LAT: f64 = 69.0;

/// Approximate miles per degree of longitude at New York City's latitude
/// (~40.7°N). Not valid far from that latitude.
pub const MILES_PER_DEGREE_LNG: f64 = 53.0;

/// Meters per statute mile.
pub const METERS_PER_MILE: f64 = 1609.34;

/// A single 311 noise complaint.
///
/// Identity is [`Self::id`]; everything else is optional because the
/// upstream dataset omits coordinates for a sizeable share of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseComplaint {
    /// Upstream unique key.
    #[serde(rename = "unique_key")]
    pub id: String,
    /// Latitude (WGS84).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude (WGS84).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Complaint type (e.g. `"Noise - Residential"`).
    #[serde(
        rename = "complaint_type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,
}

impl NoiseComplaint {
    /// Returns `(latitude, longitude)` when both are present.
    #[must_use]
    pub const fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    /// Whether this complaint carries both coordinates.
    #[must_use]
    pub const fn has_location(&self) -> bool {
        self.coordinates().is_some()
    }
}

/// A latitude/longitude rectangle, inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern latitude boundary.
    pub min_lat: f64,
    /// Northern latitude boundary.
    pub max_lat: f64,
    /// Western longitude boundary.
    pub min_lng: f64,
    /// Eastern longitude boundary.
    pub max_lng: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given edges.
    #[must_use]
    pub const fn new(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    /// Builds the box spanning `radius_miles` in every direction from a
    /// point, using the fixed [`MILES_PER_DEGREE_LAT`] and
    /// [`MILES_PER_DEGREE_LNG`] approximations.
    #[must_use]
    pub fn around(latitude: f64, longitude: f64, radius_miles: f64) -> Self {
        let lat_delta = radius_miles / MILES_PER_DEGREE_LAT;
        let lng_delta = radius_miles / MILES_PER_DEGREE_LNG;
        Self::new(
            latitude - lat_delta,
            latitude + lat_delta,
            longitude - lng_delta,
            longitude + lng_delta,
        )
    }

    /// Whether the point lies inside the box (edges included).
    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&latitude)
            && (self.min_lng..=self.max_lng).contains(&longitude)
    }
}

/// Converts miles to whole meters, truncating toward zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn miles_to_meters(miles: f64) -> u32 {
    (miles * METERS_PER_MILE).max(0.0) as u32
}
