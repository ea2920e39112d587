#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Places search gateway.
//!
//! Defines the [`PlacesGateway`] trait used by the recommendation pipeline
//! and the HTTP handlers, and a Google Places implementation in
//! [`google`]. A nearby search that fails for any reason degrades to an
//! empty result list, so one failing category never aborts a fan-out.

pub mod google;

use std::collections::HashSet;

use async_trait::async_trait;
use quiet_spaces_places_models::{Place, PlaceDetails, RawPlaceRecord};

pub use google::GooglePlacesClient;

/// Largest radius the vendor accepts for a nearby search.
pub const MAX_RADIUS_METERS: u32 = 50_000;

/// Categories searched by the plain quiet-places listing.
pub const QUIET_PLACE_CATEGORIES: &[&str] = &["library", "park"];

/// Errors that can occur talking to the places API.
#[derive(Debug, thiserror::Error)]
pub enum PlacesError {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered with a status other than `OK`/`ZERO_RESULTS`.
    #[error("Places API error: {status} - {message}")]
    Vendor {
        /// Vendor status string.
        status: String,
        /// Vendor error message, possibly empty.
        message: String,
    },

    /// The requested place does not exist or could not be returned.
    #[error("Place not found: {status}")]
    NotFound {
        /// Requested place ID.
        place_id: String,
        /// Vendor status string.
        status: String,
    },

    /// The gateway is missing required configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What is missing.
        message: String,
    },
}

/// Parameters of a single nearby search.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbySearch {
    /// Center latitude.
    pub latitude: f64,
    /// Center longitude.
    pub longitude: f64,
    /// Search radius, already clamped with [`clamp_radius`].
    pub radius_meters: u32,
    /// Vendor category (`type`) to search.
    pub category: String,
    /// Optional disambiguating keyword.
    pub keyword: Option<String>,
}

impl NearbySearch {
    /// A search for `category` with no keyword.
    #[must_use]
    pub fn new(
        latitude: f64,
        longitude: f64,
        radius_meters: u32,
        category: impl Into<String>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            radius_meters: clamp_radius(radius_meters),
            category: category.into(),
            keyword: None,
        }
    }

    /// Adds a keyword to the search.
    #[must_use]
    pub fn with_keyword(mut self, keyword: Option<String>) -> Self {
        self.keyword = keyword;
        self
    }
}

/// Access to a places search API.
#[async_trait]
pub trait PlacesGateway: Send + Sync {
    /// Runs one nearby search.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError`] on transport failure or a non-success vendor
    /// status.
    async fn try_search_nearby(
        &self,
        search: &NearbySearch,
    ) -> Result<Vec<RawPlaceRecord>, PlacesError>;

    /// Fetches extended information for one place.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::NotFound`] when the vendor does not answer
    /// `OK`, or another [`PlacesError`] on transport failure.
    async fn place_details(&self, place_id: &str) -> Result<PlaceDetails, PlacesError>;

    /// URL of a place photo scaled to `max_width`.
    fn photo_url(&self, photo_reference: &str, max_width: u32) -> String;

    /// URL of a Street View image of a location.
    fn streetview_url(&self, latitude: f64, longitude: f64, width: u32, height: u32) -> String;

    /// Runs one nearby search, logging any failure and returning no results
    /// instead.
    async fn search_nearby(&self, search: &NearbySearch) -> Vec<RawPlaceRecord> {
        match self.try_search_nearby(search).await {
            Ok(results) => {
                log::debug!(
                    "Nearby search for '{}' returned {} results",
                    search.category,
                    results.len()
                );
                results
            }
            Err(e) => {
                log::error!("Error searching for {}: {e}", search.category);
                Vec::new()
            }
        }
    }
}

/// Clamps a search radius to [`MAX_RADIUS_METERS`].
#[must_use]
pub fn clamp_radius(radius_meters: u32) -> u32 {
    radius_meters.min(MAX_RADIUS_METERS)
}

/// Lists well-rated libraries and parks near a point.
///
/// Searches every category in [`QUIET_PLACE_CATEGORIES`] concurrently,
/// drops places with no rating or a rating below `min_rating`, keeps the
/// first occurrence of each place ID, and sorts by rating, highest first.
pub async fn search_rated_places(
    gateway: &dyn PlacesGateway,
    latitude: f64,
    longitude: f64,
    radius_meters: u32,
    min_rating: f64,
) -> Vec<Place> {
    let searches: Vec<NearbySearch> = QUIET_PLACE_CATEGORIES
        .iter()
        .map(|category| NearbySearch::new(latitude, longitude, radius_meters, *category))
        .collect();

    let results =
        futures::future::join_all(searches.iter().map(|s| gateway.search_nearby(s))).await;

    let mut seen = HashSet::new();
    let mut places: Vec<Place> = results
        .iter()
        .flatten()
        .map(Place::from)
        .filter(|place| place.rating.is_some_and(|r| r >= min_rating))
        .filter(|place| seen.insert(place.place_id.clone()))
        .collect();

    places.sort_by(|a, b| {
        b.rating
            .unwrap_or_default()
            .total_cmp(&a.rating.unwrap_or_default())
    });
    places
}
