use thiserror::Error;
use url::Url;

/// Maximum accepted length of a URL filter.
pub const MAX_FILTER_URL_LENGTH: usize = 2000;

/// Errors that can occur during URL validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlValidationError {
    /// The URL string could not be parsed as an absolute URL.
    #[error("Invalid URL format: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("URL scheme must be http or https (got {0})")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL must include host")]
    MissingHost,
    /// The URL exceeds [`MAX_FILTER_URL_LENGTH`].
    #[error("URL must be {max} characters or less (got {0})", max = MAX_FILTER_URL_LENGTH)]
    TooLong(usize),
}

/// Validates a URL supplied as a bookmark filter.
///
/// Accepts absolute `http`/`https` URLs with a non-empty host, up to
/// [`MAX_FILTER_URL_LENGTH`] characters. Surrounding whitespace is ignored.
///
/// # Examples
///
/// ```
/// use hatena_bookmark_mcp::util::validate_filter_url;
///
/// let url = validate_filter_url("https://example.com/article").unwrap();
/// assert_eq!(url.host_str(), Some("example.com"));
///
/// assert!(validate_filter_url("ftp://example.com").is_err());
/// assert!(validate_filter_url("/relative/path").is_err());
/// ```
pub fn validate_filter_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url_str = url_str.trim();

    let length = url_str.chars().count();
    if length > MAX_FILTER_URL_LENGTH {
        return Err(UrlValidationError::TooLong(length));
    }

    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlValidationError::MissingHost),
    }
}
