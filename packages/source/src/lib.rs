#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! NYC open-data ingestion for 311 noise complaints.
//!
//! The [`ComplaintSource`] trait abstracts "give me the recent complaints";
//! [`socrata::SocrataClient`] implements it against the city's Socrata SODA
//! endpoint. Raw records are validated in [`record`] before anything else
//! sees them.

pub mod record;
pub mod retry;
pub mod socrata;
pub mod window;

use async_trait::async_trait;
use quiet_spaces_complaint_models::NoiseComplaint;

/// Errors that can occur while fetching from the open-data API.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API rejected the app token.
    #[error("App token rejected: {message}")]
    AuthRejected {
        /// Response body.
        message: String,
    },

    /// The API answered with a non-success status.
    #[error("Open data API returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or summary.
        message: String,
    },
}

/// A provider of recent noise complaints.
#[async_trait]
pub trait ComplaintSource: Send + Sync {
    /// Returns a unique identifier for this source (e.g. `"nyc_311_noise"`).
    fn id(&self) -> &str;

    /// Fetches every validated complaint in the source's recent window.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the upstream request fails.
    async fn fetch_recent(&self) -> Result<Vec<NoiseComplaint>, SourceError>;
}
