#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Places API wire records and place candidate types.
//!
//! The `Raw*` types mirror the vendor's JSON with every field optional, so
//! a sparse or partially malformed result never fails the whole response.
//! [`PlaceCandidate`] is the validated, per-request shape the scoring
//! pipeline works on; [`Place`] and [`PlaceDetails`] are what the HTTP API
//! returns.

use serde::{Deserialize, Serialize};

/// Maximum reviews kept from a details response.
pub const MAX_DETAIL_REVIEWS: usize = 5;

/// Maximum photos kept from a details response.
pub const MAX_DETAIL_PHOTOS: usize = 5;

// ── Vendor wire records ──────────────────────────────────────────────────

/// Envelope of a nearby-search response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NearbySearchResponse {
    /// Vendor status (`"OK"`, `"ZERO_RESULTS"`, `"REQUEST_DENIED"`, ...).
    #[serde(default)]
    pub status: String,
    /// Vendor error detail, when present.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Result records.
    #[serde(default)]
    pub results: Vec<RawPlaceRecord>,
}

/// Envelope of a place-details response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceDetailsResponse {
    /// Vendor status.
    #[serde(default)]
    pub status: String,
    /// Vendor error detail, when present.
    #[serde(default)]
    pub error_message: Option<String>,
    /// The place, when found.
    #[serde(default)]
    pub result: Option<RawPlaceDetails>,
}

/// One nearby-search result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPlaceRecord {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Short address.
    #[serde(default)]
    pub vicinity: Option<String>,
    #[serde(default)]
    pub geometry: Option<RawGeometry>,
    /// Vendor category tags, most specific first.
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub user_ratings_total: Option<u32>,
    #[serde(default)]
    pub photos: Vec<RawPhoto>,
    #[serde(default)]
    pub opening_hours: Option<RawOpeningHours>,
}

impl RawPlaceRecord {
    /// Returns `(latitude, longitude)` when both are present.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.geometry.as_ref()?.coordinates()
    }
}

/// Full place-details record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPlaceDetails {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub formatted_phone_number: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    /// Vendor map URL.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub user_ratings_total: Option<u32>,
    #[serde(default)]
    pub geometry: Option<RawGeometry>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub opening_hours: Option<RawOpeningHours>,
    #[serde(default)]
    pub reviews: Vec<RawReview>,
    #[serde(default)]
    pub photos: Vec<RawPhoto>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGeometry {
    #[serde(default)]
    pub location: Option<RawLatLng>,
}

impl RawGeometry {
    /// Returns `(latitude, longitude)` when both are present.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let location = self.location.as_ref()?;
        Some((location.lat?, location.lng?))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLatLng {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPhoto {
    #[serde(default)]
    pub photo_reference: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOpeningHours {
    #[serde(default)]
    pub open_now: Option<bool>,
    #[serde(default)]
    pub weekday_text: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReview {
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub text: Option<String>,
    /// Unix timestamp.
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub relative_time_description: Option<String>,
}

// ── Scoring pipeline types ───────────────────────────────────────────────

/// A place under consideration for a recommendation.
///
/// Built per request from a [`RawPlaceRecord`]; a candidate always has an
/// ID and both coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    /// Vendor place ID.
    pub id: String,
    /// Display name (`"Unknown"` when the vendor sent none).
    pub name: String,
    /// Short address.
    pub address: Option<String>,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Vendor category tags, in vendor order, without duplicates.
    pub categories: Vec<String>,
    /// Average rating.
    pub rating: Option<f64>,
}

impl PlaceCandidate {
    /// Validates a raw record. Returns `None` when the ID or either
    /// coordinate is missing.
    #[must_use]
    pub fn from_raw(raw: &RawPlaceRecord) -> Option<Self> {
        let id = raw.place_id.as_deref().filter(|id| !id.is_empty())?;
        let (latitude, longitude) = raw.coordinates()?;

        let mut categories: Vec<String> = Vec::with_capacity(raw.types.len());
        for category in &raw.types {
            if !categories.contains(category) {
                categories.push(category.clone());
            }
        }

        Some(Self {
            id: id.to_string(),
            name: raw.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            address: raw.vicinity.clone(),
            latitude,
            longitude,
            categories,
            rating: raw.rating,
        })
    }

    /// Whether the candidate is tagged with `category`.
    #[must_use]
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

/// A candidate with its noise score, as returned by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecommendation {
    /// The place.
    pub place: PlaceCandidate,
    /// Complaints within the proximity radius. Lower is quieter.
    pub noise_score: u32,
    /// Category label to show for this place.
    pub display_category: String,
}

// ── API shapes ───────────────────────────────────────────────────────────

/// Coordinates of a place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceLocation {
    pub lat: f64,
    pub lng: f64,
}

impl From<Option<&RawGeometry>> for PlaceLocation {
    fn from(geometry: Option<&RawGeometry>) -> Self {
        let location = geometry.and_then(|g| g.location).unwrap_or_default();
        Self {
            lat: location.lat.unwrap_or_default(),
            lng: location.lng.unwrap_or_default(),
        }
    }
}

/// A photo reference for a place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacePhoto {
    pub photo_reference: String,
    pub height: u32,
    pub width: u32,
}

impl From<&RawPhoto> for PlacePhoto {
    fn from(raw: &RawPhoto) -> Self {
        Self {
            photo_reference: raw.photo_reference.clone().unwrap_or_default(),
            height: raw.height.unwrap_or_default(),
            width: raw.width.unwrap_or_default(),
        }
    }
}

/// A quiet place (library, park, plaza) as listed by `GET /places`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub place_id: String,
    pub name: String,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u32>,
    pub address: Option<String>,
    pub location: PlaceLocation,
    pub types: Vec<String>,
    /// First photo, if any.
    pub photo: Option<PlacePhoto>,
    pub is_open: Option<bool>,
}

impl From<&RawPlaceRecord> for Place {
    fn from(raw: &RawPlaceRecord) -> Self {
        Self {
            place_id: raw.place_id.clone().unwrap_or_default(),
            name: raw.name.clone().unwrap_or_default(),
            rating: raw.rating,
            user_ratings_total: raw.user_ratings_total,
            address: raw.vicinity.clone(),
            location: PlaceLocation::from(raw.geometry.as_ref()),
            types: raw.types.clone(),
            photo: raw.photos.first().map(PlacePhoto::from),
            is_open: raw.opening_hours.as_ref().and_then(|h| h.open_now),
        }
    }
}

/// A user review of a place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceReview {
    pub author_name: String,
    pub rating: u8,
    pub text: String,
    /// Unix timestamp.
    pub time: i64,
    pub relative_time_description: String,
}

impl From<&RawReview> for PlaceReview {
    fn from(raw: &RawReview) -> Self {
        Self {
            author_name: raw
                .author_name
                .clone()
                .unwrap_or_else(|| "Anonymous".to_string()),
            rating: raw.rating.unwrap_or_default(),
            text: raw.text.clone().unwrap_or_default(),
            time: raw.time.unwrap_or_default(),
            relative_time_description: raw.relative_time_description.clone().unwrap_or_default(),
        }
    }
}

/// Extended information about a single place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetails {
    pub place_id: String,
    pub name: String,
    pub formatted_address: Option<String>,
    pub formatted_phone_number: Option<String>,
    pub website: Option<String>,
    /// Vendor map URL.
    pub url: Option<String>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u32>,
    pub location: PlaceLocation,
    pub types: Vec<String>,
    /// Formatted weekday opening hours.
    pub opening_hours: Option<Vec<String>>,
    pub is_open: Option<bool>,
    pub reviews: Vec<PlaceReview>,
    pub photos: Vec<PlacePhoto>,
}

impl PlaceDetails {
    /// Shapes a raw details record, falling back to `requested_id` when the
    /// vendor omits the ID. Keeps at most [`MAX_DETAIL_REVIEWS`] reviews and
    /// [`MAX_DETAIL_PHOTOS`] photos.
    #[must_use]
    pub fn from_raw(raw: &RawPlaceDetails, requested_id: &str) -> Self {
        Self {
            place_id: raw
                .place_id
                .clone()
                .unwrap_or_else(|| requested_id.to_string()),
            name: raw.name.clone().unwrap_or_default(),
            formatted_address: raw.formatted_address.clone(),
            formatted_phone_number: raw.formatted_phone_number.clone(),
            website: raw.website.clone(),
            url: raw.url.clone(),
            rating: raw.rating,
            user_ratings_total: raw.user_ratings_total,
            location: PlaceLocation::from(raw.geometry.as_ref()),
            types: raw.types.clone(),
            opening_hours: raw.opening_hours.as_ref().map(|h| h.weekday_text.clone()),
            is_open: raw.opening_hours.as_ref().and_then(|h| h.open_now),
            reviews: raw
                .reviews
                .iter()
                .take(MAX_DETAIL_REVIEWS)
                .map(PlaceReview::from)
                .collect(),
            photos: raw
                .photos
                .iter()
                .take(MAX_DETAIL_PHOTOS)
                .map(PlacePhoto::from)
                .collect(),
        }
    }
}
