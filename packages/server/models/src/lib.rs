#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the quiet spaces server.
//!
//! These types are serialized to JSON for the REST API. Field names are
//! `snake_case` to match the web client. They are separate from the
//! pipeline types to allow independent evolution of the API contract.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use quiet_spaces_places_models::{Place, ScoredRecommendation};
use serde::{Deserialize, Serialize};

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "nyc-quiet-spaces-api";

const fn default_complaint_limit() -> u32 {
    1000
}

const fn default_true() -> bool {
    true
}

const fn default_grid_size() -> f64 {
    0.005
}

const fn default_density_limit() -> u32 {
    10_000
}

const fn default_radius_meters() -> u32 {
    2000
}

const fn default_min_rating() -> f64 {
    4.0
}

const fn default_photo_width() -> u32 {
    400
}

const fn default_streetview_width() -> u32 {
    400
}

const fn default_streetview_height() -> u32 {
    200
}

const fn default_radius_miles() -> f64 {
    2.0
}

// ── Complaints ───────────────────────────────────────────────────────────

/// Query parameters for `GET /complaints`.
#[derive(Debug, Clone, Deserialize)]
pub struct ComplaintsQuery {
    /// Maximum complaints to return.
    #[serde(default = "default_complaint_limit")]
    pub limit: u32,
    /// Only return complaints with coordinates.
    #[serde(default = "default_true")]
    pub has_location: bool,
}

/// Response for `POST /complaints/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// Always `"success"`; failures are reported as errors.
    pub status: String,
    /// Complaints fetched from NYC Open Data.
    pub fetched: usize,
    /// Rows written to the store.
    pub inserted: usize,
}

/// Query parameters for `GET /complaints/density`.
#[derive(Debug, Clone, Deserialize)]
pub struct DensityQuery {
    /// Cell size in degrees.
    #[serde(default = "default_grid_size")]
    pub grid_size: f64,
    /// Maximum complaints to bucket.
    #[serde(default = "default_density_limit")]
    pub limit: u32,
}

/// One heatmap point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityPoint {
    pub lat: f64,
    pub lng: f64,
    /// Complaints in the cell.
    pub weight: u32,
}

/// Response for `GET /complaints/density`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityResponse {
    /// Populated cells, heaviest first.
    pub points: Vec<DensityPoint>,
    /// Complaints that were bucketed.
    pub total_complaints: usize,
    /// Largest cell weight.
    pub max_density: u32,
}

// ── Places ───────────────────────────────────────────────────────────────

/// Query parameters for `GET /places`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacesQuery {
    pub lat: f64,
    pub lng: f64,
    /// Search radius in meters, clamped to 50,000.
    #[serde(default = "default_radius_meters")]
    pub radius: u32,
    /// Minimum rating (1-5).
    #[serde(default = "default_min_rating")]
    pub min_rating: f64,
}

/// Response for `GET /places`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesResponse {
    pub places: Vec<Place>,
    pub total: usize,
}

impl From<Vec<Place>> for PlacesResponse {
    fn from(places: Vec<Place>) -> Self {
        Self {
            total: places.len(),
            places,
        }
    }
}

/// Query parameters for `GET /places/photo`.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoQuery {
    pub photo_reference: String,
    #[serde(default = "default_photo_width")]
    pub max_width: u32,
}

/// Response for `GET /places/photo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoResponse {
    pub photo_url: String,
}

/// Query parameters for `GET /places/streetview`.
#[derive(Debug, Clone, Deserialize)]
pub struct StreetViewQuery {
    pub lat: f64,
    pub lng: f64,
    #[serde(default = "default_streetview_width")]
    pub width: u32,
    #[serde(default = "default_streetview_height")]
    pub height: u32,
}

// ── Recommendations ──────────────────────────────────────────────────────

/// Body of `POST /recommendations`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Preference names such as `cafe`, `library`, or `pops`.
    pub preferences: Vec<String>,
    #[serde(default = "default_radius_miles")]
    pub radius_miles: f64,
}

/// One recommended place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecommendation {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub place_id: String,
    /// Nearby complaint count. Lower is quieter.
    pub noise_score: u32,
    /// Display category.
    #[serde(rename = "type")]
    pub category: String,
}

impl From<ScoredRecommendation> for PlaceRecommendation {
    fn from(scored: ScoredRecommendation) -> Self {
        Self {
            name: scored.place.name,
            address: scored
                .place
                .address
                .unwrap_or_else(|| "Unknown".to_string()),
            latitude: scored.place.latitude,
            longitude: scored.place.longitude,
            place_id: scored.place.id,
            noise_score: scored.noise_score,
            category: scored.display_category,
        }
    }
}

/// Response for `POST /recommendations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<PlaceRecommendation>,
}

// ── Chat ─────────────────────────────────────────────────────────────────

/// A place the user can see, sent along with a chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPlace {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, rename = "type")]
    pub category: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub places: Option<Vec<ChatPlace>>,
}

/// Response for `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

// ── Health ───────────────────────────────────────────────────────────────

/// Response for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub service: String,
}

/// Response for `GET /health/ready`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// `"ready"` or `"not_ready"`.
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Named dependency checks.
    pub checks: BTreeMap<String, bool>,
}

/// Error body for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
