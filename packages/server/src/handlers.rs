//! HTTP request handlers for the API endpoints.

use std::collections::BTreeMap;

use actix_web::http::header;
use actix_web::{HttpResponse, web};
use chrono::Utc;
use quiet_spaces_ai::chat::PlaceContext;
use quiet_spaces_recommend::{Recommender, density};
use quiet_spaces_server_models::{
    ChatRequest, ChatResponse, ComplaintsQuery, DensityPoint, DensityQuery, DensityResponse,
    HealthResponse, PhotoQuery, PhotoResponse, PlaceRecommendation, PlacesQuery, PlacesResponse,
    ReadinessResponse, RecommendationRequest, RecommendationResponse, RefreshResponse,
    SERVICE_NAME, StreetViewQuery,
};

use crate::AppState;
use crate::error::ApiError;

/// Registers every API route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/health/ready", web::get().to(readiness))
        .route("/complaints", web::get().to(complaints))
        .route("/complaints/refresh", web::post().to(refresh_complaints))
        .route("/complaints/density", web::get().to(complaint_density))
        .route("/places", web::get().to(places))
        .route("/places/photo", web::get().to(place_photo))
        .route("/places/streetview", web::get().to(place_streetview))
        .route("/places/{place_id}/details", web::get().to(place_details))
        .route("/recommendations", web::post().to(recommendations))
        .route("/recommendations/", web::post().to(recommendations))
        .route("/chat", web::post().to(chat));
}

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        service: SERVICE_NAME.to_string(),
    })
}

/// `GET /health/ready`
///
/// Ready once a complaint store is configured. The other collaborators
/// are reported but do not gate readiness.
pub async fn readiness(state: web::Data<AppState>) -> HttpResponse {
    let checks = BTreeMap::from([
        ("complaint_store".to_string(), state.store.is_some()),
        ("complaint_source".to_string(), state.source.is_some()),
        ("places".to_string(), state.places.is_some()),
        ("chat".to_string(), state.chat.is_some()),
    ]);
    let ready = state.store.is_some();

    let body = ReadinessResponse {
        status: if ready { "ready" } else { "not_ready" }.to_string(),
        timestamp: Utc::now(),
        checks,
    };

    if ready {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

/// `GET /complaints`
pub async fn complaints(
    state: web::Data<AppState>,
    params: web::Query<ComplaintsQuery>,
) -> Result<HttpResponse, ApiError> {
    let store = state.store()?;
    let rows = store.fetch_all(params.limit, params.has_location).await?;
    log::debug!("Returning {} complaints", rows.len());
    Ok(HttpResponse::Ok().json(rows))
}

/// `POST /complaints/refresh`
///
/// Pulls the past week of complaints from NYC Open Data into the store.
pub async fn refresh_complaints(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let store = state.store()?;
    let source = state.source()?;

    let summary = quiet_spaces_ingest::refresh_complaints(source.as_ref(), store.as_ref()).await?;

    Ok(HttpResponse::Ok().json(RefreshResponse {
        status: "success".to_string(),
        fetched: summary.fetched,
        inserted: summary.inserted,
    }))
}

/// `GET /complaints/density`
///
/// Buckets located complaints into a heatmap grid.
pub async fn complaint_density(
    state: web::Data<AppState>,
    params: web::Query<DensityQuery>,
) -> Result<HttpResponse, ApiError> {
    let store = state.store()?;
    let rows = store.fetch_all(params.limit, true).await?;
    let grid = density::density_grid(&rows, params.grid_size)?;

    Ok(HttpResponse::Ok().json(DensityResponse {
        points: grid
            .cells
            .iter()
            .map(|cell| DensityPoint {
                lat: cell.lat,
                lng: cell.lng,
                weight: cell.weight,
            })
            .collect(),
        total_complaints: grid.total_complaints,
        max_density: grid.max_density,
    }))
}

/// `GET /places`
///
/// Lists well-rated libraries and parks near a point.
pub async fn places(
    state: web::Data<AppState>,
    params: web::Query<PlacesQuery>,
) -> Result<HttpResponse, ApiError> {
    let gateway = state.places()?;
    let places = quiet_spaces_places::search_rated_places(
        gateway.as_ref(),
        params.lat,
        params.lng,
        params.radius,
        params.min_rating,
    )
    .await;

    Ok(HttpResponse::Ok().json(PlacesResponse::from(places)))
}

/// `GET /places/photo`
pub async fn place_photo(
    state: web::Data<AppState>,
    params: web::Query<PhotoQuery>,
) -> Result<HttpResponse, ApiError> {
    let gateway = state.places()?;
    Ok(HttpResponse::Ok().json(PhotoResponse {
        photo_url: gateway.photo_url(&params.photo_reference, params.max_width),
    }))
}

/// `GET /places/streetview`
///
/// Redirects to the Street View image for a location.
pub async fn place_streetview(
    state: web::Data<AppState>,
    params: web::Query<StreetViewQuery>,
) -> Result<HttpResponse, ApiError> {
    let gateway = state.places()?;
    let url = gateway.streetview_url(params.lat, params.lng, params.width, params.height);
    Ok(HttpResponse::TemporaryRedirect()
        .insert_header((header::LOCATION, url))
        .finish())
}

/// `GET /places/{place_id}/details`
pub async fn place_details(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let gateway = state.places()?;
    let details = gateway.place_details(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(details))
}

/// `POST /recommendations`
///
/// Ranks nearby places for the requested preferences by how few noise
/// complaints surround them.
pub async fn recommendations(
    state: web::Data<AppState>,
    body: web::Json<RecommendationRequest>,
) -> Result<HttpResponse, ApiError> {
    let store = state.store()?;
    let places = state.places()?;

    let body = body.into_inner();
    let request = quiet_spaces_recommend::RecommendationRequest {
        latitude: body.latitude,
        longitude: body.longitude,
        preferences: body.preferences,
        radius_miles: body.radius_miles,
    };

    let recommender = Recommender::new(store.clone(), places.clone(), state.rules.clone())
        .with_deadline(state.recommendation_timeout);
    let ranked = recommender.recommend(&request).await?;

    Ok(HttpResponse::Ok().json(RecommendationResponse {
        recommendations: ranked.into_iter().map(PlaceRecommendation::from).collect(),
    }))
}

/// `POST /chat`
pub async fn chat(
    state: web::Data<AppState>,
    body: web::Json<ChatRequest>,
) -> Result<HttpResponse, ApiError> {
    let provider = state.chat()?;

    let body = body.into_inner();
    if body.message.trim().is_empty() {
        return Err(ApiError::InvalidRequest("message must not be empty".to_string()));
    }

    let context: Vec<PlaceContext> = body
        .places
        .unwrap_or_default()
        .into_iter()
        .map(|place| PlaceContext {
            name: place.name,
            address: place.address,
            category: place.category,
            rating: place.rating,
        })
        .collect();

    let response = quiet_spaces_ai::chat::answer(provider.as_ref(), &body.message, &context).await?;
    Ok(HttpResponse::Ok().json(ChatResponse { response }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::time::Duration;

    use actix_web::{App, test};
    use async_trait::async_trait;
    use quiet_spaces_ai::AiError;
    use quiet_spaces_ai::providers::LlmProvider;
    use quiet_spaces_complaint_models::NoiseComplaint;
    use quiet_spaces_places::{NearbySearch, PlacesError, PlacesGateway};
    use quiet_spaces_places_models::{
        PlaceDetails, RawGeometry, RawLatLng, RawPlaceDetails, RawPlaceRecord,
    };
    use quiet_spaces_recommend::Rules;
    use quiet_spaces_source::{ComplaintSource, SourceError};
    use quiet_spaces_store::ComplaintStore;
    use quiet_spaces_store::memory::MemoryStore;

    use super::*;

    /// Places double answering every search with the same records.
    struct FakePlaces {
        records: Vec<RawPlaceRecord>,
    }

    #[async_trait]
    impl PlacesGateway for FakePlaces {
        async fn try_search_nearby(
            &self,
            search: &NearbySearch,
        ) -> Result<Vec<RawPlaceRecord>, PlacesError> {
            Ok(self
                .records
                .iter()
                .filter(|r| r.types.contains(&search.category))
                .cloned()
                .collect())
        }

        async fn place_details(&self, place_id: &str) -> Result<PlaceDetails, PlacesError> {
            if place_id == "known" {
                let raw = RawPlaceDetails {
                    name: Some("Known Place".to_string()),
                    ..RawPlaceDetails::default()
                };
                Ok(PlaceDetails::from_raw(&raw, place_id))
            } else {
                Err(PlacesError::NotFound {
                    place_id: place_id.to_string(),
                    status: "NOT_FOUND".to_string(),
                })
            }
        }

        fn photo_url(&self, photo_reference: &str, max_width: u32) -> String {
            format!("https://photos.test/{photo_reference}?w={max_width}")
        }

        fn streetview_url(&self, latitude: f64, longitude: f64, width: u32, height: u32) -> String {
            format!("https://streetview.test/{latitude},{longitude}/{width}x{height}")
        }
    }

    struct FixedSource(Vec<NoiseComplaint>);

    #[async_trait]
    impl ComplaintSource for FixedSource {
        fn id(&self) -> &str {
            "fixed"
        }

        async fn fetch_recent(&self) -> Result<Vec<NoiseComplaint>, SourceError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct EchoProvider {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, system_prompt: &str, message: &str) -> Result<String, AiError> {
            self.prompts.lock().unwrap().push(system_prompt.to_string());
            Ok(format!("echo: {message}"))
        }
    }

    fn complaint(id: &str, lat: Option<f64>, lng: Option<f64>) -> NoiseComplaint {
        NoiseComplaint {
            id: id.to_string(),
            latitude: lat,
            longitude: lng,
            category: Some("Noise - Residential".to_string()),
        }
    }

    fn record(
        id: &str,
        name: &str,
        lat: f64,
        lng: f64,
        category: &str,
        rating: f64,
    ) -> RawPlaceRecord {
        RawPlaceRecord {
            place_id: Some(id.to_string()),
            name: Some(name.to_string()),
            vicinity: Some(format!("{name} Street")),
            geometry: Some(RawGeometry {
                location: Some(RawLatLng {
                    lat: Some(lat),
                    lng: Some(lng),
                }),
            }),
            types: vec![category.to_string()],
            rating: Some(rating),
            ..RawPlaceRecord::default()
        }
    }

    fn empty_state() -> AppState {
        AppState {
            store: None,
            source: None,
            places: None,
            chat: None,
            rules: Arc::new(Rules::embedded().clone()),
            recommendation_timeout: Duration::from_secs(5),
        }
    }

    fn state_with(store: MemoryStore, places: FakePlaces) -> AppState {
        AppState {
            store: Some(Arc::new(store)),
            places: Some(Arc::new(places)),
            ..empty_state()
        }
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn health_reports_service_name() {
        let app = app!(empty_state());
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], SERVICE_NAME);
        assert!(body["timestamp"].is_string());
    }

    #[actix_web::test]
    async fn readiness_depends_on_the_store() {
        let app = app!(empty_state());
        let req = test::TestRequest::get().uri("/health/ready").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 503);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "not_ready");
        assert_eq!(body["checks"]["complaint_store"], false);

        let app = app!(AppState {
            store: Some(Arc::new(MemoryStore::new())),
            ..empty_state()
        });
        let req = test::TestRequest::get().uri("/health/ready").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 200);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ready");
        assert_eq!(body["checks"]["places"], false);
    }

    #[actix_web::test]
    async fn unconfigured_collaborators_return_503() {
        let app = app!(empty_state());

        for uri in ["/complaints", "/complaints/density", "/places?lat=40.7&lng=-73.9"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status().as_u16(), 503, "{uri}");
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert!(body["detail"].is_string());
        }

        let req = test::TestRequest::post()
            .uri("/chat")
            .set_json(serde_json::json!({"message": "hi"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status().as_u16(), 503);
    }

    #[actix_web::test]
    async fn complaints_honour_location_filter() {
        let store = MemoryStore::with_complaints([
            complaint("1", Some(40.73), Some(-73.99)),
            complaint("2", None, None),
        ]);
        let app = app!(AppState {
            store: Some(Arc::new(store)),
            ..empty_state()
        });

        let req = test::TestRequest::get().uri("/complaints").to_request();
        let located: Vec<NoiseComplaint> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(located.len(), 1);
        assert_eq!(located[0].id, "1");

        let req = test::TestRequest::get()
            .uri("/complaints?has_location=false&limit=10")
            .to_request();
        let all: Vec<NoiseComplaint> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(all.len(), 2);
    }

    #[actix_web::test]
    async fn density_buckets_located_complaints() {
        let store = MemoryStore::with_complaints([
            complaint("1", Some(40.7501), Some(-73.9901)),
            complaint("2", Some(40.7502), Some(-73.9902)),
            complaint("3", Some(40.7601), Some(-73.9801)),
        ]);
        let app = app!(AppState {
            store: Some(Arc::new(store)),
            ..empty_state()
        });

        let req = test::TestRequest::get()
            .uri("/complaints/density?grid_size=0.01")
            .to_request();
        let body: DensityResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.total_complaints, 3);
        assert_eq!(body.max_density, 2);
        assert_eq!(body.points.len(), 2);
        assert_eq!(body.points[0].weight, 2);
    }

    #[actix_web::test]
    async fn density_rejects_non_positive_grid() {
        let app = app!(AppState {
            store: Some(Arc::new(MemoryStore::new())),
            ..empty_state()
        });
        let req = test::TestRequest::get()
            .uri("/complaints/density?grid_size=0")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status().as_u16(), 400);
    }

    #[actix_web::test]
    async fn refresh_upserts_into_store() {
        let store = Arc::new(MemoryStore::new());
        let app = app!(AppState {
            store: Some(store.clone()),
            source: Some(Arc::new(FixedSource(vec![
                complaint("1", Some(40.73), Some(-73.99)),
                complaint("2", None, None),
            ]))),
            ..empty_state()
        });

        let req = test::TestRequest::post().uri("/complaints/refresh").to_request();
        let body: RefreshResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.status, "success");
        assert_eq!(body.fetched, 2);
        assert_eq!(body.inserted, 2);
        assert!(store.fetch_by_id("2").await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn places_are_rated_and_sorted() {
        let places = FakePlaces {
            records: vec![
                record("lib", "Library", 40.73, -73.99, "library", 4.2),
                record("park", "Park", 40.74, -73.98, "park", 4.8),
                record("meh", "Meh Park", 40.75, -73.97, "park", 3.1),
            ],
        };
        let app = app!(state_with(MemoryStore::new(), places));

        let req = test::TestRequest::get()
            .uri("/places?lat=40.73&lng=-73.99")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["total"], 2);
        assert_eq!(body["places"][0]["place_id"], "park");
        assert_eq!(body["places"][1]["place_id"], "lib");
    }

    #[actix_web::test]
    async fn photo_and_streetview_urls() {
        let app = app!(state_with(MemoryStore::new(), FakePlaces { records: Vec::new() }));

        let req = test::TestRequest::get()
            .uri("/places/photo?photo_reference=ref1")
            .to_request();
        let body: PhotoResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.photo_url, "https://photos.test/ref1?w=400");

        let req = test::TestRequest::get()
            .uri("/places/streetview?lat=40.5&lng=-73.5")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 307);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "https://streetview.test/40.5,-73.5/400x200"
        );
    }

    #[actix_web::test]
    async fn details_found_and_missing() {
        let app = app!(state_with(MemoryStore::new(), FakePlaces { records: Vec::new() }));

        let req = test::TestRequest::get().uri("/places/known/details").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["name"], "Known Place");

        let req = test::TestRequest::get().uri("/places/gone/details").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 404);
    }

    #[actix_web::test]
    async fn recommendations_rank_quietest_first() {
        let store = MemoryStore::with_complaints([
            complaint("1", Some(40.7300), Some(-73.9900)),
            complaint("2", Some(40.7301), Some(-73.9901)),
            complaint("3", Some(40.7299), Some(-73.9899)),
        ]);
        let places = FakePlaces {
            records: vec![
                record("loud", "Loud Cafe", 40.7300, -73.9900, "cafe", 4.5),
                record("quiet", "Quiet Cafe", 40.7400, -73.9800, "cafe", 4.0),
            ],
        };
        let app = app!(state_with(store, places));

        let req = test::TestRequest::post()
            .uri("/recommendations")
            .set_json(serde_json::json!({
                "latitude": 40.73,
                "longitude": -73.99,
                "preferences": ["cafe"],
                "radius_miles": 2.0
            }))
            .to_request();
        let body: RecommendationResponse = test::call_and_read_body_json(&app, req).await;

        let ids: Vec<&str> = body.recommendations.iter().map(|r| r.place_id.as_str()).collect();
        assert_eq!(ids, ["quiet", "loud"]);
        assert_eq!(body.recommendations[0].noise_score, 0);
        assert_eq!(body.recommendations[1].noise_score, 3);
        assert_eq!(body.recommendations[0].category, "cafe");
    }

    #[actix_web::test]
    async fn recommendations_reject_malformed_body() {
        let app = app!(state_with(MemoryStore::new(), FakePlaces { records: Vec::new() }));
        let req = test::TestRequest::post()
            .uri("/recommendations")
            .set_json(serde_json::json!({"latitude": 40.73}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status().as_u16(), 400);
    }

    #[actix_web::test]
    async fn chat_passes_place_context() {
        let provider = Arc::new(EchoProvider::default());
        let app = app!(AppState {
            chat: Some(provider.clone()),
            ..empty_state()
        });

        let req = test::TestRequest::post()
            .uri("/chat")
            .set_json(serde_json::json!({
                "message": "Where can I study?",
                "places": [{"name": "Jefferson Market Library", "type": "library", "rating": 4.7}]
            }))
            .to_request();
        let body: ChatResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.response, "echo: Where can I study?");
        let prompts = provider.prompts.lock().unwrap();
        let context_line = "- Jefferson Market Library (library): address unknown, Rating: 4.7";
        assert!(prompts[0].contains(context_line));
    }

    #[actix_web::test]
    async fn chat_rejects_blank_message() {
        let app = app!(AppState {
            chat: Some(Arc::new(EchoProvider::default())),
            ..empty_state()
        });
        let req = test::TestRequest::post()
            .uri("/chat")
            .set_json(serde_json::json!({"message": "   "}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status().as_u16(), 400);
    }
}
