#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the quiet spaces application.
//!
//! Serves the REST API the map frontend uses: noise complaints and their
//! density grid, nearby libraries and parks, quiet-place recommendations,
//! and a small chat assistant. Every upstream collaborator is optional at
//! startup; endpoints that need a missing one answer 503.

pub mod config;
pub mod error;
mod handlers;

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use quiet_spaces_ai::providers::{LlmProvider, create_provider_from_env};
use quiet_spaces_places::{GooglePlacesClient, PlacesGateway};
use quiet_spaces_recommend::Rules;
use quiet_spaces_source::ComplaintSource;
use quiet_spaces_source::socrata::SocrataClient;
use quiet_spaces_store::ComplaintStore;
use quiet_spaces_store::postgrest::SupabaseStore;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use handlers::configure;

/// Shared application state.
pub struct AppState {
    /// Complaint persistence. Required for readiness.
    pub store: Option<Arc<dyn ComplaintStore>>,
    /// NYC Open Data client used by the refresh endpoint.
    pub source: Option<Arc<dyn ComplaintSource>>,
    /// Places vendor gateway.
    pub places: Option<Arc<dyn PlacesGateway>>,
    /// Chat completion provider.
    pub chat: Option<Arc<dyn LlmProvider>>,
    /// Recommendation rule tables.
    pub rules: Arc<Rules>,
    /// Deadline for one recommendation fan-out.
    pub recommendation_timeout: Duration,
}

impl AppState {
    /// Builds the state from the environment. Collaborators whose
    /// credentials are missing are logged and left unset.
    #[must_use]
    pub fn from_env(rules: Rules, recommendation_timeout: Duration) -> Self {
        let store = SupabaseStore::from_env()
            .inspect_err(|e| log::warn!("Complaint store disabled: {e}"))
            .ok()
            .map(|s| Arc::new(s) as Arc<dyn ComplaintStore>);

        let source = SocrataClient::from_env()
            .inspect_err(|e| log::warn!("Complaint refresh disabled: {e}"))
            .ok()
            .map(|s| Arc::new(s) as Arc<dyn ComplaintSource>);

        let places = GooglePlacesClient::from_env()
            .inspect_err(|e| log::warn!("Places endpoints disabled: {e}"))
            .ok()
            .map(|p| Arc::new(p) as Arc<dyn PlacesGateway>);

        let chat = create_provider_from_env()
            .inspect_err(|e| log::warn!("Chat disabled: {e}"))
            .ok()
            .map(Arc::from);

        Self {
            store,
            source,
            places,
            chat,
            rules: Arc::new(rules),
            recommendation_timeout,
        }
    }

    fn store(&self) -> Result<&Arc<dyn ComplaintStore>, ApiError> {
        self.store.as_ref().ok_or_else(|| {
            ApiError::ConfigurationMissing(
                "Complaint store is not configured. Set SUPABASE_URL and SUPABASE_KEY.".to_string(),
            )
        })
    }

    fn source(&self) -> Result<&Arc<dyn ComplaintSource>, ApiError> {
        self.source.as_ref().ok_or_else(|| {
            ApiError::ConfigurationMissing("NYC Open Data client is not available.".to_string())
        })
    }

    fn places(&self) -> Result<&Arc<dyn PlacesGateway>, ApiError> {
        self.places.as_ref().ok_or_else(|| {
            ApiError::ConfigurationMissing(
                "Google Places API key not configured. Set GOOGLE_PLACES_API_KEY.".to_string(),
            )
        })
    }

    fn chat(&self) -> Result<&Arc<dyn LlmProvider>, ApiError> {
        self.chat.as_ref().ok_or_else(|| {
            ApiError::ConfigurationMissing(
                "Chat is not configured. Set GOOGLE_GEMINI_API_KEY, ANTHROPIC_API_KEY, \
                 or OPENAI_API_KEY."
                    .to_string(),
            )
        })
    }
}

/// Starts the quiet spaces API server.
///
/// Reads the configuration, loads the rule tables, builds every upstream
/// client the environment has credentials for, and starts the Actix-Web
/// HTTP server. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the rule override cannot be
/// loaded, or if the HTTP server fails to bind or encounters a runtime
/// error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServiceConfig::from_env();

    let rules = config.load_rules().map_err(|e| {
        log::error!("Failed to load rule tables: {e}");
        std::io::Error::other(e)
    })?;
    log::info!(
        "Loaded rule tables v{} ({} preferences, {} excluded categories)",
        rules.version,
        rules.preferences.len(),
        rules.filter.excluded_categories.len()
    );

    let state = web::Data::new(AppState::from_env(rules, config.recommendation_timeout));

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}
