#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Quiet place recommendation pipeline.
//!
//! Cross-references nearby places against historical noise complaints:
//! [`filter`] drops places that are unlikely to be quiet public spaces,
//! [`scorer`] counts complaints near each survivor, and [`aggregator`]
//! runs the concurrent fan-out and ranks the results. [`density`] buckets
//! complaints into a grid for heatmaps. The heuristics' lookup tables live
//! in [`rules`].

pub mod aggregator;
pub mod density;
pub mod filter;
pub mod rules;
pub mod scorer;

use std::time::Duration;

use quiet_spaces_store::StoreError;

pub use aggregator::{RecommendationRequest, Recommender};
pub use rules::{Rules, RulesError};

/// Errors that can occur producing recommendations or density grids.
#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    /// The complaint fetch failed.
    #[error("Complaint store error: {0}")]
    Store(#[from] StoreError),

    /// The fan-out did not finish before the deadline.
    #[error("Recommendation timed out after {0:?}")]
    DeadlineExceeded(Duration),

    /// A density grid was requested with a non-positive cell size.
    #[error("Invalid grid size: {0}")]
    InvalidGridSize(f64),
}
