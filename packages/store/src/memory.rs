//! In-memory complaint store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use quiet_spaces_complaint_models::{BoundingBox, NoiseComplaint};
use tokio::sync::RwLock;

use crate::{ComplaintStore, StoreError};

/// A [`ComplaintStore`] backed by an ordered map keyed on complaint ID.
///
/// Writers take an exclusive lock, so concurrent upserts of the same key
/// serialize and the later one wins.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<String, NoiseComplaint>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `complaints` (last write wins).
    #[must_use]
    pub fn with_complaints(complaints: impl IntoIterator<Item = NoiseComplaint>) -> Self {
        let rows = complaints
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        Self {
            rows: RwLock::new(rows),
        }
    }
}

#[async_trait]
impl ComplaintStore for MemoryStore {
    async fn fetch_in_area(&self, bbox: &BoundingBox) -> Result<Vec<NoiseComplaint>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|c| {
                c.coordinates()
                    .is_some_and(|(lat, lng)| bbox.contains(lat, lng))
            })
            .cloned()
            .collect())
    }

    async fn fetch_all(
        &self,
        limit: u32,
        has_location: bool,
    ) -> Result<Vec<NoiseComplaint>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|c| !has_location || c.has_location())
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<NoiseComplaint>, StoreError> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn upsert(&self, complaints: &[NoiseComplaint]) -> Result<usize, StoreError> {
        let batch = crate::dedupe_last_write_wins(complaints);
        let written = batch.len();

        let mut rows = self.rows.write().await;
        for complaint in batch {
            rows.insert(complaint.id.clone(), complaint);
        }
        drop(rows);

        log::debug!("Upserted {written} complaints into memory store");
        Ok(written)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.rows.read().await.len() as u64)
    }
}
