#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Noise complaint store gateway.
//!
//! The [`ComplaintStore`] trait is the only way the rest of the system
//! touches persisted complaints. Two backends are provided:
//!
//! - [`postgrest::SupabaseStore`] talks to a Supabase/PostgREST table over
//!   HTTP.
//! - [`memory::MemoryStore`] keeps rows in a map, for tests and local runs.
//!
//! Upserts are keyed on the complaint ID with last-write-wins semantics.
//! No component here retries; I/O failures surface as [`StoreError`].

pub mod memory;
pub mod postgrest;

use std::collections::BTreeMap;

use async_trait::async_trait;
use quiet_spaces_complaint_models::{BoundingBox, NoiseComplaint};

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// HTTP request to the store failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The store answered with a non-success status.
    #[error("Store returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or summary.
        message: String,
    },

    /// Required connection settings are missing.
    #[error("Store not configured: {message}")]
    Config {
        /// What is missing.
        message: String,
    },
}

/// Read/write access to persisted noise complaints.
#[async_trait]
pub trait ComplaintStore: Send + Sync {
    /// Returns every located complaint inside `bbox` (edges included).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    async fn fetch_in_area(&self, bbox: &BoundingBox) -> Result<Vec<NoiseComplaint>, StoreError>;

    /// Returns up to `limit` complaints, optionally only those with both
    /// coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    async fn fetch_all(
        &self,
        limit: u32,
        has_location: bool,
    ) -> Result<Vec<NoiseComplaint>, StoreError>;

    /// Looks a complaint up by ID.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    async fn fetch_by_id(&self, id: &str) -> Result<Option<NoiseComplaint>, StoreError>;

    /// Inserts or overwrites complaints keyed on ID. Returns the number of
    /// rows written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn upsert(&self, complaints: &[NoiseComplaint]) -> Result<usize, StoreError>;

    /// Total number of stored complaints.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    async fn count(&self) -> Result<u64, StoreError>;
}

/// Collapses a batch so each ID appears once, keeping the last occurrence's
/// values at the position of the first occurrence.
///
/// `PostgREST` rejects a single upsert statement that touches the same key
/// twice, so batches are collapsed before they are sent.
#[must_use]
pub fn dedupe_last_write_wins(complaints: &[NoiseComplaint]) -> Vec<NoiseComplaint> {
    let mut positions: BTreeMap<&str, usize> = BTreeMap::new();
    let mut rows: Vec<NoiseComplaint> = Vec::with_capacity(complaints.len());

    for complaint in complaints {
        if let Some(&idx) = positions.get(complaint.id.as_str()) {
            rows[idx] = complaint.clone();
        } else {
            positions.insert(complaint.id.as_str(), rows.len());
            rows.push(complaint.clone());
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complaint(id: &str, category: &str) -> NoiseComplaint {
        NoiseComplaint {
            id: id.to_string(),
            latitude: None,
            longitude: None,
            category: Some(category.to_string()),
        }
    }

    #[test]
    fn dedupe_keeps_last_values_in_first_position() {
        let batch = vec![
            complaint("a", "first"),
            complaint("b", "only"),
            complaint("a", "second"),
        ];
        let rows = dedupe_last_write_wins(&batch);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "a");
        assert_eq!(rows[0].category.as_deref(), Some("second"));
        assert_eq!(rows[1].id, "b");
    }
}
