//! Recommendation aggregator.
//!
//! One request fans out into a complaint fetch for the surrounding bounding
//! box and one nearby search per preference, all concurrently. Results are
//! merged, deduplicated by place ID, filtered, scored, and ranked quietest
//! first.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use quiet_spaces_complaint_models::{BoundingBox, NoiseComplaint, miles_to_meters};
use quiet_spaces_places::{NearbySearch, PlacesGateway, clamp_radius};
use quiet_spaces_places_models::{PlaceCandidate, RawPlaceRecord, ScoredRecommendation};
use quiet_spaces_store::ComplaintStore;

use crate::RecommendError;
use crate::filter;
use crate::rules::{PreferenceRule, Rules};
use crate::scorer::{self, DEFAULT_RADIUS_DEGREES};

/// Maximum recommendations returned.
pub const MAX_RECOMMENDATIONS: usize = 10;

/// Default deadline for the whole fan-out.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Label used when a place has no categories at all.
const UNKNOWN_CATEGORY: &str = "unknown";

/// A recommendation query.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationRequest {
    /// Center latitude.
    pub latitude: f64,
    /// Center longitude.
    pub longitude: f64,
    /// Preference names, in priority order.
    pub preferences: Vec<String>,
    /// Search radius in miles.
    pub radius_miles: f64,
}

/// Ranks nearby places by how few noise complaints surround them.
pub struct Recommender {
    store: Arc<dyn ComplaintStore>,
    places: Arc<dyn PlacesGateway>,
    rules: Arc<Rules>,
    deadline: Duration,
}

impl Recommender {
    /// Creates a recommender with the [`DEFAULT_DEADLINE`].
    #[must_use]
    pub fn new(
        store: Arc<dyn ComplaintStore>,
        places: Arc<dyn PlacesGateway>,
        rules: Arc<Rules>,
    ) -> Self {
        Self {
            store,
            places,
            rules,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Overrides the fan-out deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Produces at most [`MAX_RECOMMENDATIONS`] places, quietest first.
    ///
    /// A failing places search contributes no results. A failing complaint
    /// fetch fails the request and drops the searches still in flight.
    ///
    /// # Errors
    ///
    /// * [`RecommendError::Store`] if the complaint fetch fails
    /// * [`RecommendError::DeadlineExceeded`] if the fan-out outlives the
    ///   deadline
    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Vec<ScoredRecommendation>, RecommendError> {
        let radius_meters = clamp_radius(miles_to_meters(request.radius_miles));
        let area = BoundingBox::around(request.latitude, request.longitude, request.radius_miles);

        let preferences: Vec<PreferenceRule> = request
            .preferences
            .iter()
            .map(|name| self.rules.preference(name))
            .collect();

        let searches: Vec<NearbySearch> = preferences
            .iter()
            .map(|pref| {
                NearbySearch::new(
                    request.latitude,
                    request.longitude,
                    radius_meters,
                    pref.category.clone(),
                )
                .with_keyword(pref.keyword.clone())
            })
            .collect();

        log::info!(
            "Recommending near ({}, {}) within {} mi for {:?}",
            request.latitude,
            request.longitude,
            request.radius_miles,
            request.preferences
        );

        let (complaints, search_results) =
            tokio::time::timeout(self.deadline, self.fan_out(&area, &searches))
                .await
                .map_err(|_| {
                    log::error!("Recommendation fan-out exceeded {:?}", self.deadline);
                    RecommendError::DeadlineExceeded(self.deadline)
                })??;

        log::debug!(
            "Fetched {} complaints and {} search result lists",
            complaints.len(),
            search_results.len()
        );

        let candidates = unique_places(search_results.into_iter().flatten())
            .into_iter()
            .filter(|raw| {
                filter::passes(
                    &self.rules.filter,
                    raw.name.as_deref().unwrap_or_default(),
                    &raw.types,
                )
            })
            .filter_map(|raw| PlaceCandidate::from_raw(&raw));

        Ok(rank(candidates, &complaints, &preferences))
    }

    async fn fan_out(
        &self,
        area: &BoundingBox,
        searches: &[NearbySearch],
    ) -> Result<(Vec<NoiseComplaint>, Vec<Vec<RawPlaceRecord>>), RecommendError> {
        let complaints = async {
            self.store.fetch_in_area(area).await.map_err(|e| {
                log::error!("Error fetching complaints for recommendation: {e}");
                RecommendError::from(e)
            })
        };
        let places = async {
            let searches = searches.iter().map(|s| self.places.search_nearby(s));
            Ok::<_, RecommendError>(futures::future::join_all(searches).await)
        };

        tokio::try_join!(complaints, places)
    }
}

/// Keeps the first record seen for each place ID. Records with no ID are
/// dropped.
#[must_use]
pub fn unique_places(records: impl IntoIterator<Item = RawPlaceRecord>) -> Vec<RawPlaceRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|raw| {
            raw.place_id
                .as_ref()
                .is_some_and(|id| !id.is_empty() && seen.insert(id.clone()))
        })
        .collect()
}

/// Label shown for a candidate.
///
/// The first preference whose category the place carries, else the
/// place's first category, else `"unknown"`.
#[must_use]
pub fn display_category(candidate: &PlaceCandidate, preferences: &[PreferenceRule]) -> String {
    preferences
        .iter()
        .find(|pref| candidate.has_category(&pref.category))
        .map(|pref| pref.name.clone())
        .or_else(|| candidate.categories.first().cloned())
        .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string())
}

/// Scores candidates and returns the quietest [`MAX_RECOMMENDATIONS`].
///
/// Ties keep their input order.
#[must_use]
pub fn rank(
    candidates: impl IntoIterator<Item = PlaceCandidate>,
    complaints: &[NoiseComplaint],
    preferences: &[PreferenceRule],
) -> Vec<ScoredRecommendation> {
    let mut scored: Vec<ScoredRecommendation> = candidates
        .into_iter()
        .map(|place| ScoredRecommendation {
            noise_score: scorer::score(&place, complaints, DEFAULT_RADIUS_DEGREES),
            display_category: display_category(&place, preferences),
            place,
        })
        .collect();

    scored.sort_by_key(|r| r.noise_score);
    scored.truncate(MAX_RECOMMENDATIONS);
    scored
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use async_trait::async_trait;
    use quiet_spaces_places::PlacesError;
    use quiet_spaces_places_models::PlaceDetails;
    use quiet_spaces_store::StoreError;
    use quiet_spaces_store::memory::MemoryStore;

    use super::*;

    const A: (f64, f64) = (40.7310, -73.9910);
    const B: (f64, f64) = (40.7350, -73.9850);

    /// Gateway double answering by category, optionally after a delay.
    struct FakePlaces {
        by_category: HashMap<String, Vec<RawPlaceRecord>>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl FakePlaces {
        fn new(by_category: HashMap<String, Vec<RawPlaceRecord>>) -> Self {
            Self {
                by_category,
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PlacesGateway for FakePlaces {
        async fn try_search_nearby(
            &self,
            search: &NearbySearch,
        ) -> Result<Vec<RawPlaceRecord>, PlacesError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.by_category
                .get(&search.category)
                .cloned()
                .ok_or_else(|| PlacesError::Vendor {
                    status: "INVALID_REQUEST".to_string(),
                    message: String::new(),
                })
        }

        async fn place_details(&self, place_id: &str) -> Result<PlaceDetails, PlacesError> {
            Err(PlacesError::NotFound {
                place_id: place_id.to_string(),
                status: "NOT_FOUND".to_string(),
            })
        }

        fn photo_url(&self, _photo_reference: &str, _max_width: u32) -> String {
            String::new()
        }

        fn streetview_url(
            &self,
            _latitude: f64,
            _longitude: f64,
            _width: u32,
            _height: u32,
        ) -> String {
            String::new()
        }
    }

    /// Store double that always fails.
    struct FailingStore;

    #[async_trait]
    impl ComplaintStore for FailingStore {
        async fn fetch_in_area(
            &self,
            _area: &BoundingBox,
        ) -> Result<Vec<NoiseComplaint>, StoreError> {
            Err(StoreError::Status {
                status: 500,
                message: "database unavailable".to_string(),
            })
        }

        async fn fetch_all(
            &self,
            _limit: u32,
            _has_location: bool,
        ) -> Result<Vec<NoiseComplaint>, StoreError> {
            Ok(Vec::new())
        }

        async fn fetch_by_id(&self, _id: &str) -> Result<Option<NoiseComplaint>, StoreError> {
            Ok(None)
        }

        async fn upsert(&self, _complaints: &[NoiseComplaint]) -> Result<usize, StoreError> {
            Ok(0)
        }

        async fn count(&self) -> Result<u64, StoreError> {
            Ok(0)
        }
    }

    /// Store double that never answers in time.
    struct SlowStore;

    #[async_trait]
    impl ComplaintStore for SlowStore {
        async fn fetch_in_area(
            &self,
            _area: &BoundingBox,
        ) -> Result<Vec<NoiseComplaint>, StoreError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        async fn fetch_all(
            &self,
            _limit: u32,
            _has_location: bool,
        ) -> Result<Vec<NoiseComplaint>, StoreError> {
            Ok(Vec::new())
        }

        async fn fetch_by_id(&self, _id: &str) -> Result<Option<NoiseComplaint>, StoreError> {
            Ok(None)
        }

        async fn upsert(&self, _complaints: &[NoiseComplaint]) -> Result<usize, StoreError> {
            Ok(0)
        }

        async fn count(&self) -> Result<u64, StoreError> {
            Ok(0)
        }
    }

    fn place(id: &str, (lat, lng): (f64, f64), types: &[&str]) -> RawPlaceRecord {
        serde_json::from_value(serde_json::json!({
            "place_id": id,
            "name": format!("Place {id}"),
            "vicinity": format!("{id} Street"),
            "geometry": {"location": {"lat": lat, "lng": lng}},
            "types": types,
        }))
        .unwrap()
    }

    fn complaint(id: &str, lat: f64, lng: f64) -> NoiseComplaint {
        NoiseComplaint {
            id: id.to_string(),
            latitude: Some(lat),
            longitude: Some(lng),
            category: Some("Noise - Residential".to_string()),
        }
    }

    fn request(preferences: &[&str]) -> RecommendationRequest {
        RecommendationRequest {
            latitude: 40.73,
            longitude: -73.99,
            preferences: preferences.iter().map(ToString::to_string).collect(),
            radius_miles: 1.0,
        }
    }

    fn recommender(store: Arc<dyn ComplaintStore>, places: Arc<dyn PlacesGateway>) -> Recommender {
        Recommender::new(store, places, Arc::new(Rules::embedded().clone()))
    }

    #[tokio::test]
    async fn ranks_quieter_place_first() {
        let store = MemoryStore::with_complaints([
            complaint("1", A.0 + 0.0005, A.1),
            complaint("2", A.0, A.1 - 0.0005),
            complaint("3", A.0 - 0.0003, A.1 + 0.0003),
        ]);
        let both = vec![place("A", A, &["cafe", "food"]), place("B", B, &["library"])];
        let places = FakePlaces::new(HashMap::from([
            ("cafe".to_string(), both.clone()),
            ("library".to_string(), both),
        ]));

        let results = recommender(Arc::new(store), Arc::new(places))
            .recommend(&request(&["cafe", "library"]))
            .await
            .unwrap();

        let summary: Vec<(&str, u32, &str)> = results
            .iter()
            .map(|r| (r.place.id.as_str(), r.noise_score, r.display_category.as_str()))
            .collect();
        assert_eq!(summary, vec![("B", 0, "library"), ("A", 3, "cafe")]);
        assert_eq!(results[1].place.address.as_deref(), Some("A Street"));
    }

    #[tokio::test]
    async fn returns_the_ten_quietest_in_order() {
        let mut complaints = Vec::new();
        let mut records = Vec::new();
        for i in 0..15_u32 {
            let lat = 40.70 + f64::from(i) * 0.01;
            records.push(place(&format!("p{i}"), (lat, -73.99), &["park"]));
            // Place i gets 14 - i nearby complaints.
            for j in 0..(14 - i) {
                complaints.push(complaint(&format!("c{i}-{j}"), lat, -73.99));
            }
        }
        let store = MemoryStore::with_complaints(complaints);
        let places = FakePlaces::new(HashMap::from([("park".to_string(), records)]));

        let results = recommender(Arc::new(store), Arc::new(places))
            .recommend(&RecommendationRequest {
                radius_miles: 20.0,
                ..request(&["park"])
            })
            .await
            .unwrap();

        let scores: Vec<u32> = results.iter().map(|r| r.noise_score).collect();
        assert_eq!(scores, (0..10).collect::<Vec<u32>>());
        assert_eq!(results[0].place.id, "p14");
    }

    #[tokio::test]
    async fn failing_search_contributes_nothing() {
        let places = FakePlaces::new(HashMap::from([(
            "library".to_string(),
            vec![place("L", B, &["library"])],
        )]));

        let results = recommender(Arc::new(MemoryStore::new()), Arc::new(places))
            .recommend(&request(&["museum", "library"]))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].place.id, "L");
    }

    #[tokio::test]
    async fn filters_excluded_and_private_candidates() {
        let mut private = place("U", A, &["library"]);
        private.name = Some("Fordham University Law Library".to_string());
        let records = vec![
            place("gym", A, &["gym", "cafe"]),
            private,
            place("ok", B, &["cafe"]),
        ];
        let places = FakePlaces::new(HashMap::from([("cafe".to_string(), records)]));

        let results = recommender(Arc::new(MemoryStore::new()), Arc::new(places))
            .recommend(&request(&["cafe"]))
            .await
            .unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.place.id.as_str()).collect();
        assert_eq!(ids, vec!["ok"]);
    }

    #[tokio::test]
    async fn store_failure_fails_the_request_without_waiting_for_searches() {
        let mut places = FakePlaces::new(HashMap::new());
        places.delay = Some(Duration::from_secs(60));

        let started = Instant::now();
        let err = recommender(Arc::new(FailingStore), Arc::new(places))
            .recommend(&request(&["cafe", "library"]))
            .await
            .unwrap_err();

        assert!(matches!(err, RecommendError::Store(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn deadline_bounds_the_fan_out() {
        let places = FakePlaces::new(HashMap::new());
        let deadline = Duration::from_millis(50);

        let err = recommender(Arc::new(SlowStore), Arc::new(places))
            .with_deadline(deadline)
            .recommend(&request(&["cafe"]))
            .await
            .unwrap_err();

        assert!(matches!(err, RecommendError::DeadlineExceeded(d) if d == deadline));
    }

    #[tokio::test]
    async fn searches_once_per_preference() {
        let places = Arc::new(FakePlaces::new(HashMap::new()));
        let gateway: Arc<dyn PlacesGateway> = places.clone();

        recommender(Arc::new(MemoryStore::new()), gateway)
            .recommend(&request(&["cafe", "library", "pops"]))
            .await
            .unwrap();

        assert_eq!(places.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn deduplicates_by_id_first_seen_wins() {
        let mut first = place("dup", A, &["cafe"]);
        first.name = Some("First".to_string());
        let mut second = place("dup", B, &["cafe"]);
        second.name = Some("Second".to_string());
        let mut anonymous = place("", B, &["cafe"]);
        anonymous.place_id = None;

        let unique = unique_places([first, place("other", B, &["park"]), second, anonymous]);

        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].name.as_deref(), Some("First"));
        assert_eq!(unique[1].place_id.as_deref(), Some("other"));
    }

    #[test]
    fn display_category_prefers_requested_preferences() {
        let rules = Rules::embedded();
        let candidate =
            PlaceCandidate::from_raw(&place("P", A, &["park", "point_of_interest"])).unwrap();

        let prefs = vec![rules.preference("cafe"), rules.preference("pops")];
        assert_eq!(display_category(&candidate, &prefs), "pops");

        let unrelated = vec![rules.preference("cafe")];
        assert_eq!(display_category(&candidate, &unrelated), "park");

        let bare = PlaceCandidate {
            categories: Vec::new(),
            ..candidate
        };
        assert_eq!(display_category(&bare, &unrelated), "unknown");
    }
}
