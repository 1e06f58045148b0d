//! Configuration file parser for ~/.config/hatena-bookmark-mcp/config.toml.
//!
//! The config file is optional. A missing file yields `Config::default()`.
//! Unknown keys are ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Public Hatena Bookmark host.
pub const DEFAULT_BASE_URL: &str = "https://b.hatena.ne.jp";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// base_url is not an absolute https URL (http allowed for localhost only).
    #[error("Invalid base_url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level server configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service root that feed paths are appended to.
    pub base_url: String,

    /// Hard timeout for one feed request, in seconds.
    pub request_timeout_secs: u64,

    /// `User-Agent` header sent with feed requests.
    pub user_agent: String,

    /// Whether assembled responses are cached in memory.
    pub cache_enabled: bool,

    /// Lifetime of a cached response, in seconds.
    pub cache_ttl_secs: u64,

    /// Interval between sweeps of expired cache entries, in seconds.
    pub cache_sweep_interval_secs: u64,

    /// Log level used when neither RUST_LOG nor LOG_LEVEL is set.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 10,
            user_agent: format!("hatena-bookmark-mcp/{}", env!("CARGO_PKG_VERSION")),
            cache_enabled: true,
            cache_ttl_secs: 300,
            cache_sweep_interval_secs: 60,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "base_url",
        "request_timeout_secs",
        "user_agent",
        "cache_enabled",
        "cache_ttl_secs",
        "cache_sweep_interval_secs",
        "log_level",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - Invalid values → `Err(ConfigError::InvalidBaseUrl / InvalidValue)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading to prevent memory exhaustion
        // from a maliciously large or corrupted config file.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {} // Size is within limits, proceed
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(path = %path.display(), base_url = %config.base_url, "Loaded configuration");
        Ok(config)
    }

    /// Checks values serde cannot: URL shape and non-zero durations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.base_url)?;

        let durations = [
            ("request_timeout_secs", self.request_timeout_secs),
            ("cache_ttl_secs", self.cache_ttl_secs),
            ("cache_sweep_interval_secs", self.cache_sweep_interval_secs),
        ];
        for (key, value) in durations {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key,
                    reason: "must be greater than 0".to_string(),
                });
            }
        }

        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "user_agent",
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Accepts `https` URLs, and `http` only for loopback hosts.
fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(base_url).map_err(|e| invalid(&e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot have path segments"));
    }

    let is_loopback = matches!(
        url.host_str(),
        Some("localhost") | Some("127.0.0.1") | Some("[::1]")
    );

    match url.scheme() {
        "https" => Ok(()),
        "http" if is_loopback => Ok(()),
        "http" => Err(invalid("plain http is only allowed for localhost")),
        _ => Err(invalid("scheme must be https")),
    }
}

// ============================================================================
// Tests
// ============================================================================
