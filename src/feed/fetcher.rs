use futures::StreamExt;
use reqwest::redirect::Policy;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Response bodies larger than this are rejected.
pub const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while downloading a feed document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, body read)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with a status other than 200
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// The caller abandoned the request
    #[error("Request cancelled")]
    Cancelled,
    /// Response body exceeded [`MAX_FEED_SIZE`]
    #[error("Response too large (limit {limit} bytes)", limit = MAX_FEED_SIZE)]
    ResponseTooLarge,
}

/// Downloads feed documents with a shared HTTP client.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl FeedFetcher {
    /// Builds the HTTP client once with the given `User-Agent` and timeout.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(create_redirect_policy())
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(timeout)
            .build()?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Performs a single GET of `url` and returns the body bytes.
    ///
    /// There are no retries. The whole exchange (connect, headers and body)
    /// is bounded by the configured timeout, and cancelling `cancel` aborts
    /// it immediately.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Network`] - Connection, TLS or body read failure
    /// - [`FetchError::Timeout`] - Timeout elapsed
    /// - [`FetchError::HttpStatus`] - Any status other than 200
    /// - [`FetchError::ResponseTooLarge`] - Body exceeded [`MAX_FEED_SIZE`]
    /// - [`FetchError::Cancelled`] - `cancel` fired first
    pub async fn fetch(&self, url: &Url, cancel: &CancellationToken) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(url = %url, timeout_secs = self.timeout.as_secs(), "Fetching feed");

        let exchange = tokio::time::timeout(self.timeout, self.fetch_inner(url));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(url = %url, "Feed fetch cancelled");
                Err(FetchError::Cancelled)
            }
            result = exchange => match result {
                Ok(inner) => inner,
                Err(_) => Err(FetchError::Timeout(self.timeout)),
            },
        }
    }

    async fn fetch_inner(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::warn!(url = %url, status = %status, "Feed request returned non-OK status");
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_FEED_SIZE)
            .await
            .map_err(|e| match e {
                FetchError::Network(e) => self.classify(e),
                other => other,
            })?;

        tracing::debug!(url = %url, bytes = bytes.len(), "Fetched feed");
        Ok(bytes)
    }

    fn classify(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Network(error)
        }
    }
}

/// Redirect policy for feed requests.
///
/// - Limits redirects to 3 hops maximum
/// - Detects redirect loops (same URL appearing twice in chain)
/// - Logs each hop at debug level
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        for prev in attempt.previous() {
            if prev.as_str() == url.as_str() {
                return attempt.error("Redirect loop detected");
            }
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
