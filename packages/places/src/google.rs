//! Google Places web service client.

use std::time::Duration;

use async_trait::async_trait;
use quiet_spaces_places_models::{
    NearbySearchResponse, PlaceDetails, PlaceDetailsResponse, RawPlaceRecord,
};

use crate::{NearbySearch, PlacesError, PlacesGateway};

const NEARBY_SEARCH_URL: &str = "https://maps.googleapis.com/maps/api/place/nearbysearch/json";
const DETAILS_URL: &str = "https://maps.googleapis.com/maps/api/place/details/json";
const PHOTO_URL: &str = "https://maps.googleapis.com/maps/api/place/photo";
const STREETVIEW_URL: &str = "https://maps.googleapis.com/maps/api/streetview";

/// Fields requested from the details endpoint.
const DETAIL_FIELDS: &[&str] = &[
    "place_id",
    "name",
    "formatted_address",
    "formatted_phone_number",
    "website",
    "url",
    "rating",
    "user_ratings_total",
    "geometry",
    "types",
    "opening_hours",
    "reviews",
    "photos",
];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Google Places nearby-search, details, photo, and Street
/// View endpoints.
pub struct GooglePlacesClient {
    api_key: String,
    client: reqwest::Client,
}

impl GooglePlacesClient {
    /// Creates a client using `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::Config`] if the key is blank, or
    /// [`PlacesError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self, PlacesError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(PlacesError::Config {
                message: "Places API key is empty".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { api_key, client })
    }

    /// Creates a client from `GOOGLE_PLACES_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::Config`] if the variable is not set.
    pub fn from_env() -> Result<Self, PlacesError> {
        let api_key = std::env::var("GOOGLE_PLACES_API_KEY").map_err(|_| PlacesError::Config {
            message: "GOOGLE_PLACES_API_KEY environment variable not set".to_string(),
        })?;
        Self::new(api_key)
    }
}

#[async_trait]
impl PlacesGateway for GooglePlacesClient {
    async fn try_search_nearby(
        &self,
        search: &NearbySearch,
    ) -> Result<Vec<RawPlaceRecord>, PlacesError> {
        let params = nearby_params(search, &self.api_key);
        let body = self
            .client
            .get(NEARBY_SEARCH_URL)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        interpret_nearby(serde_json::from_str(&body)?)
    }

    async fn place_details(&self, place_id: &str) -> Result<PlaceDetails, PlacesError> {
        let fields = DETAIL_FIELDS.join(",");
        let body = self
            .client
            .get(DETAILS_URL)
            .query(&[
                ("place_id", place_id),
                ("fields", fields.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        interpret_details(serde_json::from_str(&body)?, place_id)
    }

    fn photo_url(&self, photo_reference: &str, max_width: u32) -> String {
        format!(
            "{PHOTO_URL}?maxwidth={max_width}&photo_reference={photo_reference}&key={}",
            self.api_key
        )
    }

    fn streetview_url(&self, latitude: f64, longitude: f64, width: u32, height: u32) -> String {
        format!(
            "{STREETVIEW_URL}?size={width}x{height}&location={latitude},{longitude}&key={}",
            self.api_key
        )
    }
}

fn nearby_params(search: &NearbySearch, api_key: &str) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("location", format!("{},{}", search.latitude, search.longitude)),
        ("radius", search.radius_meters.to_string()),
        ("type", search.category.clone()),
        ("key", api_key.to_string()),
    ];
    if let Some(keyword) = &search.keyword {
        params.push(("keyword", keyword.clone()));
    }
    params
}

/// Accepts `OK` and `ZERO_RESULTS`; any other vendor status is an error.
fn interpret_nearby(response: NearbySearchResponse) -> Result<Vec<RawPlaceRecord>, PlacesError> {
    match response.status.as_str() {
        "OK" | "ZERO_RESULTS" => Ok(response.results),
        _ => Err(PlacesError::Vendor {
            status: response.status,
            message: response.error_message.unwrap_or_default(),
        }),
    }
}

fn interpret_details(
    response: PlaceDetailsResponse,
    place_id: &str,
) -> Result<PlaceDetails, PlacesError> {
    if response.status != "OK" {
        log::error!(
            "Places details API error: {} - {}",
            response.status,
            response.error_message.as_deref().unwrap_or_default()
        );
        return Err(PlacesError::NotFound {
            place_id: place_id.to_string(),
            status: response.status,
        });
    }

    let result = response.result.unwrap_or_default();
    Ok(PlaceDetails::from_raw(&result, place_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nearby(json: serde_json::Value) -> NearbySearchResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn zero_results_is_an_empty_success() {
        let results =
            interpret_nearby(nearby(serde_json::json!({"status": "ZERO_RESULTS"}))).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn denied_status_is_an_error() {
        let err = interpret_nearby(nearby(serde_json::json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        })))
        .unwrap_err();
        assert!(matches!(
            err,
            PlacesError::Vendor { ref status, .. } if status == "REQUEST_DENIED"
        ));
    }

    #[test]
    fn ok_status_returns_results() {
        let results = interpret_nearby(nearby(serde_json::json!({
            "status": "OK",
            "results": [{"place_id": "a"}, {"place_id": "b", "types": ["cafe"]}]
        })))
        .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].types, vec!["cafe"]);
    }

    #[test]
    fn non_ok_details_is_not_found() {
        let response: PlaceDetailsResponse =
            serde_json::from_value(serde_json::json!({"status": "INVALID_REQUEST"})).unwrap();
        let err = interpret_details(response, "missing").unwrap_err();
        assert!(matches!(err, PlacesError::NotFound { ref place_id, .. } if place_id == "missing"));
    }

    #[test]
    fn includes_keyword_only_when_present() {
        let search = NearbySearch::new(40.73, -73.99, 1_609, "cafe");
        let plain = nearby_params(&search, "k");
        assert!(!plain.iter().any(|(name, _)| *name == "keyword"));
        assert!(plain.contains(&("location", "40.73,-73.99".to_string())));

        let keyed = nearby_params(&search.with_keyword(Some("coffee shop".to_string())), "k");
        assert!(keyed.contains(&("keyword", "coffee shop".to_string())));
    }

    #[test]
    fn builds_media_urls() {
        let client = GooglePlacesClient::new("secret").unwrap();
        assert_eq!(
            client.photo_url("ref123", 400),
            "https://maps.googleapis.com/maps/api/place/photo?\
             maxwidth=400&photo_reference=ref123&key=secret"
        );
        assert_eq!(
            client.streetview_url(40.73, -73.99, 400, 200),
            "https://maps.googleapis.com/maps/api/streetview?\
             size=400x200&location=40.73,-73.99&key=secret"
        );
    }

    #[test]
    fn rejects_blank_key() {
        assert!(matches!(GooglePlacesClient::new("  "), Err(PlacesError::Config { .. })));
    }
}
