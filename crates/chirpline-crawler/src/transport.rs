//! HTTP transport for search, timeline, and rate-limit status calls
//!
//! Uses the shared async reqwest client behind `block_on` - the scheduler is
//! a single sequential loop, so a sync interface keeps the call sites plain.
//! The transport never retries; every failure surfaces as a
//! [`TransportError`] for the caller's fixed-delay retry.

use std::sync::LazyLock;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;

use crate::config::{Account, SearchConfig};
use crate::mode::{FetchMode, SearchMode};
use crate::normalize::{build_outcome, FetchOutcome};
use crate::progress::KeyProgress;
use crate::ratelimit::{ModeWindows, RateWindow};

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Whole-request timeout (a stalled response counts as a transient failure)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error from one transport call. All variants are transient to the
/// scheduler; it never distinguishes rate-limit exhaustion from other
/// failures - that is the account selector's job via rate metadata.
#[derive(Debug)]
pub enum TransportError {
    /// Non-success HTTP status
    Http { status: u16, message: String },
    /// Connect/send failure without a status
    Network(String),
    /// Response body missing or malformed
    Body(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http { status, message } => write!(f, "HTTP {status}: {message}"),
            Self::Network(message) => write!(f, "network error: {message}"),
            Self::Body(message) => write!(f, "bad response body: {message}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl TransportError {
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Http {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => Self::Network(e.to_string()),
        }
    }
}

/// Boundary filters for one fetch, derived from a key's progress and mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageBounds {
    pub max_id: Option<u64>,
    pub since_id: Option<u64>,
}

/// Build the boundary filters for a fetch.
///
/// New fetches are unbounded. Paging walks below the most recent page and,
/// once a floor exists, not past it (`floor - 1` keeps the floor post itself
/// in range; the overlap is trimmed after normalization). Updates fetch
/// strictly above the known ceiling.
pub fn page_bounds(mode: FetchMode, progress: &KeyProgress) -> PageBounds {
    match mode {
        FetchMode::New => PageBounds::default(),
        FetchMode::Paging => {
            // no page fetched yet: same as a fresh search
            let Some(recent_min) = progress.recent_min else {
                return PageBounds::default();
            };
            PageBounds {
                max_id: Some(recent_min.saturating_sub(1)),
                since_id: progress.since_id.map(|floor| floor.saturating_sub(1)),
            }
        }
        FetchMode::Update => PageBounds {
            max_id: None,
            since_id: progress.max_id,
        },
    }
}

/// Fetch and status-query operations the orchestrator depends on.
///
/// The production implementation is [`HttpTransport`]; tests drive the
/// orchestrator with a scripted in-memory implementation.
pub trait Transport {
    /// One search/timeline call. Returns the normalized outcome plus the
    /// rate window from response metadata when the server supplied one.
    fn search(
        &self,
        account: &Account,
        mode: SearchMode,
        key: &str,
        bounds: PageBounds,
    ) -> Result<(FetchOutcome, Option<RateWindow>), TransportError>;

    /// Explicit rate-limit status query for one credential.
    fn rate_limit_status(&self, account: &Account) -> Result<ModeWindows, TransportError>;
}

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("failed to build HTTP client")
});

/// Shared tokio runtime for HTTP operations.
static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// reqwest-backed [`Transport`] for a v1.1-compatible API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    lang: Option<String>,
    keyword_count: u32,
    timeline_count: u32,
}

impl HttpTransport {
    pub fn new(base_url: &str, search: &SearchConfig) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            lang: search.lang.clone(),
            keyword_count: search.keyword_count,
            timeline_count: search.timeline_count,
        }
    }

    fn build_query(
        &self,
        mode: SearchMode,
        key: &str,
        bounds: PageBounds,
    ) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        match mode {
            SearchMode::Keyword => {
                query.push(("q", key.to_string()));
                if let Some(lang) = &self.lang {
                    query.push(("lang", lang.clone()));
                }
                query.push(("result_type", "recent".to_string()));
                query.push(("count", self.keyword_count.to_string()));
            }
            SearchMode::User => {
                query.push(("count", self.timeline_count.to_string()));
                // numeric keys are user ids, everything else a handle
                if !key.is_empty() && key.chars().all(|c| c.is_ascii_digit()) {
                    query.push(("user_id", key.to_string()));
                } else {
                    query.push(("screen_name", key.to_string()));
                }
            }
        }
        if let Some(max_id) = bounds.max_id {
            query.push(("max_id", max_id.to_string()));
        }
        if let Some(since_id) = bounds.since_id {
            query.push(("since_id", since_id.to_string()));
        }
        query
    }

    fn get(
        &self,
        account: &Account,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<(String, Option<RateWindow>), TransportError> {
        let url = format!("{}{path}", self.base_url);
        SHARED_RUNTIME.handle().block_on(async {
            let response = SHARED_CLIENT
                .get(&url)
                .bearer_auth(&account.bearer_token)
                .query(query)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| TransportError::from_reqwest(&e))?;

            let window = rate_window_from_headers(response.headers());
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::from_reqwest(&e))?;
            Ok((body, window))
        })
    }
}

impl Transport for HttpTransport {
    fn search(
        &self,
        account: &Account,
        mode: SearchMode,
        key: &str,
        bounds: PageBounds,
    ) -> Result<(FetchOutcome, Option<RateWindow>), TransportError> {
        let query = self.build_query(mode, key, bounds);
        let (body, window) = self.get(account, mode.endpoint(), &query)?;

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| TransportError::Body(format!("invalid JSON: {e}")))?;
        let posts = match mode {
            SearchMode::Keyword => value
                .get("statuses")
                .and_then(Value::as_array)
                .ok_or_else(|| TransportError::Body("missing statuses array".to_string()))?,
            SearchMode::User => value
                .as_array()
                .ok_or_else(|| TransportError::Body("expected timeline array".to_string()))?,
        };

        let outcome = build_outcome(posts, Utc::now().timestamp());
        Ok((outcome, window))
    }

    fn rate_limit_status(&self, account: &Account) -> Result<ModeWindows, TransportError> {
        let query = [("resources", "search,statuses".to_string())];
        let (body, _) = self.get(account, "/application/rate_limit_status.json", &query)?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| TransportError::Body(format!("invalid JSON: {e}")))?;
        parse_status_body(&value)
    }
}

/// Rate window from `x-rate-limit-*` response headers, when present.
fn rate_window_from_headers(headers: &reqwest::header::HeaderMap) -> Option<RateWindow> {
    let remaining = headers
        .get("x-rate-limit-remaining")?
        .to_str()
        .ok()?
        .parse()
        .ok()?;
    let reset_at = headers
        .get("x-rate-limit-reset")?
        .to_str()
        .ok()?
        .parse()
        .ok()?;
    Some(RateWindow { remaining, reset_at })
}

/// Both mode windows from a rate-limit status body.
fn parse_status_body(value: &Value) -> Result<ModeWindows, TransportError> {
    let window = |group: &str, endpoint: &str| -> Option<RateWindow> {
        let node = &value["resources"][group][endpoint];
        Some(RateWindow {
            remaining: node["remaining"].as_u64()? as u32,
            reset_at: node["reset"].as_i64()?,
        })
    };
    let keyword = window("search", "/search/tweets")
        .ok_or_else(|| TransportError::Body("missing search window in status".to_string()))?;
    let user = window("statuses", "/statuses/user_timeline")
        .ok_or_else(|| TransportError::Body("missing timeline window in status".to_string()))?;
    Ok(ModeWindows { keyword, user })
}
