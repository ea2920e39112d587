//! Supabase / `PostgREST` complaint store.
//!
//! Rows live in the `noise_complaints` table with `unique_key` as the
//! conflict target. Filters use `PostgREST` operator syntax
//! (`latitude=gte.40.7`, `latitude=not.is.null`).
//!
//! See <https://postgrest.org/en/stable/references/api/tables_views.html>

use std::time::Duration;

use async_trait::async_trait;
use quiet_spaces_complaint_models::{BoundingBox, NoiseComplaint};

use crate::{ComplaintStore, StoreError, dedupe_last_write_wins};

/// Table holding complaint rows.
pub const TABLE_NAME: &str = "noise_complaints";

/// Column used as the upsert conflict target.
const CONFLICT_COLUMN: &str = "unique_key";

/// Maximum rows per upsert request.
const UPSERT_CHUNK_SIZE: usize = 1000;

/// Rows requested per read. Matches the default `PostgREST` `max-rows` cap
/// on Supabase, so a page shorter than this is the last one.
const READ_PAGE_SIZE: usize = 1000;

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A [`ComplaintStore`] backed by a Supabase project's REST endpoint.
pub struct SupabaseStore {
    table_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl SupabaseStore {
    /// Creates a store for the project at `project_url` (e.g.
    /// `https://abc.supabase.co`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Http`] if the HTTP client cannot be built.
    pub fn new(project_url: &str, api_key: String) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            table_url: table_url(project_url),
            api_key,
            client,
        })
    }

    /// Creates a store from the `SUPABASE_URL` and `SUPABASE_KEY`
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if either variable is unset or empty.
    pub fn from_env() -> Result<Self, StoreError> {
        let url = non_empty_env("SUPABASE_URL")?;
        let key = non_empty_env("SUPABASE_KEY")?;
        Self::new(&url, key)
    }

    fn get(&self) -> reqwest::RequestBuilder {
        self.authorized(self.client.get(&self.table_url))
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn fetch_rows(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Vec<NoiseComplaint>, StoreError> {
        let response = ensure_success(request.send().await?).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Reads every row matching `filter`, one page at a time, stopping at
    /// `max_rows` when given.
    async fn fetch_paged(
        &self,
        filter: &[(&'static str, String)],
        max_rows: Option<usize>,
    ) -> Result<Vec<NoiseComplaint>, StoreError> {
        let mut rows = Vec::new();

        loop {
            let want = next_page_len(rows.len(), max_rows);
            if want == 0 {
                break;
            }

            let page = self
                .fetch_rows(self.get().query(&page_query(filter, rows.len(), want)))
                .await?;
            let fetched = page.len();
            rows.extend(page);

            if fetched < want {
                break;
            }
        }

        Ok(rows)
    }

    async fn upsert_chunk(&self, chunk: &[NoiseComplaint]) -> Result<usize, StoreError> {
        let request = self
            .authorized(self.client.post(&self.table_url))
            .query(&[("on_conflict", CONFLICT_COLUMN)])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(chunk);

        let written: Vec<serde_json::Value> = {
            let response = ensure_success(request.send().await?).await?;
            serde_json::from_str(&response.text().await?)?
        };
        Ok(written.len())
    }
}

#[async_trait]
impl ComplaintStore for SupabaseStore {
    async fn fetch_in_area(&self, bbox: &BoundingBox) -> Result<Vec<NoiseComplaint>, StoreError> {
        let rows = self
            .fetch_paged(&area_filter(bbox), None)
            .await
            .inspect_err(|e| log::error!("Failed to fetch complaints in {bbox:?}: {e}"))?;
        log::debug!("Fetched {} complaints in area", rows.len());
        Ok(rows)
    }

    async fn fetch_all(
        &self,
        limit: u32,
        has_location: bool,
    ) -> Result<Vec<NoiseComplaint>, StoreError> {
        let mut filter = vec![("select", "*".to_string())];
        if has_location {
            filter.push(("latitude", "not.is.null".to_string()));
            filter.push(("longitude", "not.is.null".to_string()));
        }
        self.fetch_paged(&filter, Some(limit as usize))
            .await
            .inspect_err(|e| log::error!("Failed to fetch complaints: {e}"))
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<NoiseComplaint>, StoreError> {
        let filter = format!("eq.{id}");
        let rows = self
            .fetch_rows(
                self.get()
                    .query(&[("select", "*"), (CONFLICT_COLUMN, filter.as_str())]),
            )
            .await
            .inspect_err(|e| log::error!("Failed to fetch complaint {id}: {e}"))?;
        Ok(rows.into_iter().next())
    }

    async fn upsert(&self, complaints: &[NoiseComplaint]) -> Result<usize, StoreError> {
        if complaints.is_empty() {
            return Ok(0);
        }

        let rows = dedupe_last_write_wins(complaints);
        let mut written = 0;
        for chunk in rows.chunks(UPSERT_CHUNK_SIZE) {
            written += self
                .upsert_chunk(chunk)
                .await
                .inspect_err(|e| log::error!("Failed to upsert {} complaints: {e}", chunk.len()))?;
        }

        log::info!("Inserted/updated {written} noise complaints");
        Ok(written)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let request = self
            .authorized(self.client.head(&self.table_url))
            .query(&[("select", CONFLICT_COLUMN)])
            .header("Prefer", "count=exact");
        let response = ensure_success(request.send().await?).await?;

        let content_range = response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        parse_content_range_total(content_range).ok_or_else(|| StoreError::Status {
            status: response.status().as_u16(),
            message: format!("missing exact count in Content-Range: {content_range:?}"),
        })
    }
}

/// Builds the REST endpoint for the complaints table.
fn table_url(project_url: &str) -> String {
    format!("{}/rest/v1/{TABLE_NAME}", project_url.trim_end_matches('/'))
}

/// `PostgREST` query parameters selecting located rows inside `bbox`.
fn area_filter(bbox: &BoundingBox) -> Vec<(&'static str, String)> {
    vec![
        ("select", "*".to_string()),
        ("latitude", format!("gte.{}", bbox.min_lat)),
        ("latitude", format!("lte.{}", bbox.max_lat)),
        ("longitude", format!("gte.{}", bbox.min_lng)),
        ("longitude", format!("lte.{}", bbox.max_lng)),
    ]
}

/// `filter` plus a stable order and the `limit`/`offset` window of one page.
fn page_query(
    filter: &[(&'static str, String)],
    offset: usize,
    limit: usize,
) -> Vec<(&'static str, String)> {
    let mut params = filter.to_vec();
    params.push(("order", format!("{CONFLICT_COLUMN}.asc")));
    params.push(("limit", limit.to_string()));
    params.push(("offset", offset.to_string()));
    params
}

/// Rows to request next after `fetched` rows, capped by `max_rows`.
fn next_page_len(fetched: usize, max_rows: Option<usize>) -> usize {
    max_rows.map_or(READ_PAGE_SIZE, |max| {
        max.saturating_sub(fetched).min(READ_PAGE_SIZE)
    })
}

/// Extracts the total from a `Content-Range` header such as `0-24/3573`
/// or `*/3573`.
fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

/// Turns a non-2xx response into [`StoreError::Status`].
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        message,
    })
}

fn non_empty_env(name: &str) -> Result<String, StoreError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| StoreError::Config {
            message: format!("{name} environment variable not set"),
        })
}
