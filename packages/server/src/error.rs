//! API error taxonomy and its HTTP mapping.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use quiet_spaces_ai::AiError;
use quiet_spaces_ingest::IngestError;
use quiet_spaces_places::PlacesError;
use quiet_spaces_recommend::RecommendError;
use quiet_spaces_server_models::ErrorResponse;
use quiet_spaces_store::StoreError;

/// Errors returned by API handlers. Each renders as `{"detail": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A collaborator needed by the endpoint has no credentials.
    #[error("{0}")]
    ConfigurationMissing(String),

    /// An upstream service failed.
    #[error("{0}")]
    UpstreamUnavailable(String),

    /// An upstream service did not answer in time.
    #[error("{0}")]
    UpstreamTimeout(String),

    /// The requested resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The request was malformed.
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ConfigurationMissing(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            detail: self.to_string(),
        })
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        log::error!("Complaint store error: {e}");
        match e {
            StoreError::Config { message } => Self::ConfigurationMissing(message),
            other => Self::UpstreamUnavailable(format!("Complaint store error: {other}")),
        }
    }
}

impl From<PlacesError> for ApiError {
    fn from(e: PlacesError) -> Self {
        match e {
            PlacesError::NotFound { place_id, status } => {
                log::warn!("Place {place_id} not found: {status}");
                Self::NotFound(format!("Place not found: {place_id}"))
            }
            PlacesError::Config { message } => {
                log::error!("Places configuration error: {message}");
                Self::ConfigurationMissing(message)
            }
            other => {
                log::error!("Places API error: {other}");
                Self::UpstreamUnavailable(format!("Places API error: {other}"))
            }
        }
    }
}

impl From<RecommendError> for ApiError {
    fn from(e: RecommendError) -> Self {
        match e {
            RecommendError::Store(e) => e.into(),
            RecommendError::DeadlineExceeded(deadline) => {
                log::error!("Recommendation exceeded its {deadline:?} deadline");
                Self::UpstreamTimeout(format!(
                    "Recommendation timed out after {}s",
                    deadline.as_secs()
                ))
            }
            RecommendError::InvalidGridSize(size) => {
                Self::InvalidRequest(format!("grid_size must be a positive number, got {size}"))
            }
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Store(e) => e.into(),
            IngestError::Source(e) => {
                log::error!("Complaint refresh failed: {e}");
                Self::UpstreamUnavailable(format!("Failed to fetch complaints: {e}"))
            }
        }
    }
}

impl From<AiError> for ApiError {
    fn from(e: AiError) -> Self {
        log::error!("Chat error: {e}");
        match e {
            AiError::Config { message } => Self::ConfigurationMissing(message),
            other => Self::UpstreamUnavailable(format!("Chat error: {other}")),
        }
    }
}
