//! Socrata SODA client for the NYC 311 noise complaint dataset.
//!
//! Fetches the recent window page by page using `$limit`, `$offset`,
//! `$order`, and `$where`. Each page request is a two-attempt sequence:
//! first with the configured `X-App-Token`, and if the API rejects that
//! token, once more anonymously. Any other failure propagates.

use std::time::Duration;

use async_trait::async_trait;
use quiet_spaces_complaint_models::NoiseComplaint;

use crate::record::parse_records;
use crate::retry::send_with_retry;
use crate::window::TimeWindow;
use crate::{ComplaintSource, SourceError};

/// NYC 311 service requests, filtered to noise complaints.
pub const DEFAULT_BASE_URL: &str = "https://data.cityofnewyork.us/resource/p5f6-bkga.json";

/// Records per page.
pub const PAGE_SIZE: u64 = 5000;

/// Column used for ordering and window filtering.
const DATE_COLUMN: &str = "created_date";

/// Substring of the 403 body Socrata returns for a bad app token.
const INVALID_TOKEN_MARKER: &str = "Invalid app_token";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which credential a page request is sent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAttempt {
    /// Send the configured app token.
    WithToken,
    /// Send no token.
    Anonymous,
}

impl TokenAttempt {
    /// The first attempt for a client that does or does not hold a token.
    #[must_use]
    pub const fn first(has_token: bool) -> Self {
        if has_token {
            Self::WithToken
        } else {
            Self::Anonymous
        }
    }

    /// The attempt to make after `error`, if any.
    ///
    /// Only a rejected token on the tokened attempt earns a second try.
    #[must_use]
    pub fn next_after(self, error: &SourceError) -> Option<Self> {
        match (self, error) {
            (Self::WithToken, SourceError::AuthRejected { .. }) => Some(Self::Anonymous),
            _ => None,
        }
    }
}

/// One page of validated complaints.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Records that passed validation.
    pub complaints: Vec<NoiseComplaint>,
    /// Records returned by the API before validation.
    pub raw_count: usize,
}

/// Client for the 311 noise complaint dataset.
pub struct SocrataClient {
    base_url: String,
    app_token: Option<String>,
    page_size: u64,
    client: reqwest::Client,
}

impl SocrataClient {
    /// Creates a client for the dataset at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        app_token: Option<String>,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            app_token: app_token.filter(|t| !t.trim().is_empty()),
            page_size: PAGE_SIZE,
            client,
        })
    }

    /// Creates a client from `NYC_OPENDATA_BASE_URL` (optional) and
    /// `NYC_OPENDATA_APP_TOKEN` (optional).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, SourceError> {
        let base_url = std::env::var("NYC_OPENDATA_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let app_token = std::env::var("NYC_OPENDATA_APP_TOKEN").ok();
        if app_token.is_none() {
            log::info!("NYC_OPENDATA_APP_TOKEN not set; requests will be rate limited");
        }
        Self::new(base_url, app_token)
    }

    /// Overrides the page size (default [`PAGE_SIZE`]).
    #[must_use]
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Fetches one page of the window starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if both token attempts fail, or the first
    /// attempt fails for any reason other than a rejected token.
    pub async fn fetch_page(&self, window: &TimeWindow, offset: u64) -> Result<Page, SourceError> {
        let mut attempt = TokenAttempt::first(self.app_token.is_some());

        loop {
            match self.request_page(window, offset, attempt).await {
                Ok(records) => {
                    let raw_count = records.len();
                    let complaints = parse_records(records);
                    log::info!(
                        "Fetched {} noise complaints (offset: {offset})",
                        complaints.len()
                    );
                    return Ok(Page {
                        complaints,
                        raw_count,
                    });
                }
                Err(e) => {
                    if let Some(next) = attempt.next_after(&e) {
                        log::warn!("Invalid app token detected, retrying without token...");
                        attempt = next;
                        continue;
                    }
                    log::error!("Error fetching complaints at offset {offset}: {e}");
                    return Err(e);
                }
            }
        }
    }

    /// Fetches every page of the window.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if any page fails.
    pub async fn fetch_window(
        &self,
        window: &TimeWindow,
    ) -> Result<Vec<NoiseComplaint>, SourceError> {
        let mut all = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let page = self.fetch_page(window, offset).await?;
            all.extend(page.complaints);

            let raw_count = page.raw_count as u64;
            if raw_count < self.page_size {
                break;
            }
            offset += raw_count;
        }

        log::info!("Total complaints fetched: {}", all.len());
        Ok(all)
    }

    async fn request_page(
        &self,
        window: &TimeWindow,
        offset: u64,
        attempt: TokenAttempt,
    ) -> Result<Vec<serde_json::Value>, SourceError> {
        let params = page_params(window, self.page_size, offset);
        let token = match attempt {
            TokenAttempt::WithToken => self.app_token.as_deref(),
            TokenAttempt::Anonymous => None,
        };

        let response = send_with_retry(|| {
            let builder = self
                .client
                .get(&self.base_url)
                .query(&params)
                .header(reqwest::header::ACCEPT, "application/json");
            match token {
                Some(token) => builder.header("X-App-Token", token),
                None => builder,
            }
        })
        .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), body));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ComplaintSource for SocrataClient {
    fn id(&self) -> &str {
        "nyc_311_noise"
    }

    async fn fetch_recent(&self) -> Result<Vec<NoiseComplaint>, SourceError> {
        self.fetch_window(&TimeWindow::past_week()).await
    }
}

/// SoQL query parameters for one page.
fn page_params(window: &TimeWindow, limit: u64, offset: u64) -> Vec<(&'static str, String)> {
    vec![
        ("$where", window.where_clause(DATE_COLUMN)),
        ("$limit", limit.to_string()),
        ("$offset", offset.to_string()),
        ("$order", format!("{DATE_COLUMN} DESC")),
    ]
}

/// Maps a non-success response to an error, recognising token rejection.
fn classify_failure(status: u16, body: String) -> SourceError {
    if status == 403 && body.contains(INVALID_TOKEN_MARKER) {
        SourceError::AuthRejected { message: body }
    } else {
        SourceError::Status {
            status,
            message: body,
        }
    }
}
