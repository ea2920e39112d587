#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Noise complaint refresh.
//!
//! Pulls the recent complaint window from a [`ComplaintSource`] and upserts
//! it into a [`ComplaintStore`]. Used by the `POST /complaints/refresh`
//! endpoint and by the `quiet_spaces_ingest` CLI.

use std::time::Instant;

use quiet_spaces_source::{ComplaintSource, SourceError};
use quiet_spaces_store::{ComplaintStore, StoreError};
use serde::Serialize;

/// Errors that can occur during a refresh.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Fetching from the open-data source failed.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Writing to the complaint store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of one refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    /// Valid complaints fetched from the source.
    pub fetched: usize,
    /// Rows written to the store.
    pub inserted: usize,
}

/// Fetches recent complaints from `source` and upserts them into `store`.
///
/// An empty fetch writes nothing.
///
/// # Errors
///
/// Returns [`IngestError`] if the fetch or the upsert fails.
pub async fn refresh_complaints(
    source: &dyn ComplaintSource,
    store: &dyn ComplaintStore,
) -> Result<RefreshSummary, IngestError> {
    let start = Instant::now();
    log::info!("Refreshing complaints from {}", source.id());

    let complaints = source.fetch_recent().await.inspect_err(|e| {
        log::error!("{}: fetch failed: {e}", source.id());
    })?;

    if complaints.is_empty() {
        log::info!("{}: no complaints fetched", source.id());
        return Ok(RefreshSummary::default());
    }

    let inserted = store.upsert(&complaints).await.inspect_err(|e| {
        log::error!("{}: upsert failed: {e}", source.id());
    })?;

    log::info!(
        "{}: fetched {}, upserted {inserted} in {:.1}s",
        source.id(),
        complaints.len(),
        start.elapsed().as_secs_f64()
    );

    Ok(RefreshSummary {
        fetched: complaints.len(),
        inserted,
    })
}
