//! Request orchestration: validate, consult the cache, fetch, parse, assemble.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::cache::{cache_key, ResponseCache};
use crate::config::Config;
use crate::feed::{build_feed_url, parse_feed, FeedFetcher, FetchError, ParseError};
use crate::types::{BookmarksResponse, FeedQuery, FilterParams, ParsedFeed};
use crate::validation::{validate_query, ValidationError};

// ============================================================================
// Error Types
// ============================================================================

/// A classified failure of a bookmark request, as reported to the caller.
#[derive(Debug, Error)]
pub enum BookmarkError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Transport failure, timeout, cancellation or oversized body
    #[error("Failed to fetch RSS feed: {source}")]
    Network {
        url: String,
        #[source]
        source: FetchError,
    },

    /// The service answered with a status other than 200
    #[error("API returned status {status}")]
    Api { url: String, status: u16 },

    #[error("Failed to parse RSS feed: {0}")]
    Parsing(#[from] ParseError),

    /// The configured base URL cannot produce a feed URL
    #[error("Failed to create request: {0}")]
    RequestUrl(#[from] url::ParseError),
}

impl BookmarkError {
    /// Maps a fetch failure to its classification. Non-OK statuses are API
    /// errors; everything else is a network error.
    fn from_fetch(url: &url::Url, error: FetchError) -> Self {
        match error {
            FetchError::HttpStatus(status) => Self::Api {
                url: url.to_string(),
                status,
            },
            source => Self::Network {
                url: url.to_string(),
                source,
            },
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Network { .. } | Self::RequestUrl(_) => "NETWORK_ERROR",
            Self::Api { .. } => "API_ERROR",
            Self::Parsing(_) => "PARSING_ERROR",
        }
    }

    /// Structured context for the error. Never includes response bodies.
    pub fn details(&self) -> Value {
        match self {
            Self::Validation(e) => json!({ "field": e.field() }),
            Self::Network { url, source } => {
                let kind = match source {
                    FetchError::Network(_) => "transport",
                    FetchError::Timeout(_) => "timeout",
                    FetchError::Cancelled => "cancelled",
                    FetchError::ResponseTooLarge => "response_too_large",
                    FetchError::HttpStatus(_) => "status",
                };
                json!({ "url": url, "kind": kind })
            }
            Self::Api { url, status } => json!({ "url": url, "status_code": status }),
            Self::Parsing(e) => json!({
                "dialect": e.dialect.to_string(),
                "xml_length": e.input_len,
            }),
            Self::RequestUrl(_) => json!({ "kind": "request_url" }),
        }
    }

    /// `"[CODE] message"`, the form shown to tool callers.
    pub fn to_tool_message(&self) -> String {
        format!("[{}] {}", self.code(), self)
    }
}

// ============================================================================
// Service
// ============================================================================

/// Serves bookmark requests against one upstream base URL.
///
/// Cheap to share behind an `Arc`; the HTTP client and cache are reused
/// across concurrent requests.
#[derive(Debug)]
pub struct BookmarkService {
    base_url: String,
    fetcher: FeedFetcher,
    cache: Option<Arc<ResponseCache>>,
}

impl BookmarkService {
    pub fn new(
        base_url: impl Into<String>,
        fetcher: FeedFetcher,
        cache: Option<Arc<ResponseCache>>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            fetcher,
            cache,
        }
    }

    /// Builds the fetcher and, if enabled, the cache and its sweeper.
    ///
    /// Must be called inside a tokio runtime when the cache is enabled.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let fetcher = FeedFetcher::new(
            &config.user_agent,
            Duration::from_secs(config.request_timeout_secs),
        )?;

        let cache = config.cache_enabled.then(|| {
            let cache = Arc::new(ResponseCache::new(Duration::from_secs(config.cache_ttl_secs)));
            // The sweeper exits on its own once the cache is dropped
            cache.spawn_sweeper(Duration::from_secs(config.cache_sweep_interval_secs));
            cache
        });

        tracing::info!(
            base_url = %config.base_url,
            timeout_secs = config.request_timeout_secs,
            cache_enabled = config.cache_enabled,
            cache_ttl_secs = config.cache_ttl_secs,
            "Bookmark service configured"
        );

        Ok(Self::new(config.base_url.clone(), fetcher, cache))
    }

    pub fn cache(&self) -> Option<&Arc<ResponseCache>> {
        self.cache.as_ref()
    }

    /// Fetches one page of a user's public bookmarks.
    ///
    /// Validation failures short-circuit before any network access. Only
    /// successful responses are cached.
    ///
    /// # Errors
    ///
    /// See [`BookmarkError`] for the classification.
    pub async fn get_bookmarks(
        &self,
        query: FeedQuery,
        cancel: &CancellationToken,
    ) -> Result<BookmarksResponse, BookmarkError> {
        tracing::info!(
            username = %query.username,
            tag = ?query.tag,
            date = ?query.date,
            url = ?query.url,
            page = query.page,
            "Fetching Hatena bookmarks"
        );

        if let Err(e) = validate_query(&query) {
            tracing::warn!(field = e.field(), error = %e, "Rejected bookmark query");
            return Err(e.into());
        }

        let key = cache_key(&query);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key).await {
                tracing::debug!(username = %query.username, "Serving bookmarks from cache");
                return Ok(hit);
            }
        }

        let url = build_feed_url(&self.base_url, &query)?;

        let bytes = self
            .fetcher
            .fetch(&url, cancel)
            .await
            .map_err(|e| BookmarkError::from_fetch(&url, e))
            .inspect_err(|e| tracing::warn!(url = %url, error = %e, "Feed fetch failed"))?;

        let feed = parse_feed(&bytes)
            .inspect_err(|e| tracing::warn!(url = %url, error = %e, "Feed parse failed"))?;

        let response = assemble_response(&query, feed);

        if let Some(cache) = &self.cache {
            cache.set(key, response.clone()).await;
        }

        tracing::info!(
            username = %response.user,
            count = response.total_count,
            page = response.page,
            "Fetched Hatena bookmarks"
        );

        Ok(response)
    }
}

/// Wraps parsed records with the caller's request metadata.
///
/// `page` is the effective page (at least 1) and `filters` is present only
/// when the query carried at least one filter.
pub fn assemble_response(query: &FeedQuery, feed: ParsedFeed) -> BookmarksResponse {
    let filters = query.has_filters().then(|| FilterParams {
        tag: query.tag.clone(),
        date: query.date.clone(),
        url: query.url.clone(),
    });

    BookmarksResponse {
        user: query.username.clone(),
        page: query.effective_page(),
        total_count: feed.count,
        filters,
        bookmarks: feed.records,
    }
}
