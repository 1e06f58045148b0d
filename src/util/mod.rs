//! Utility functions for common operations.
//!
//! This module provides reusable utilities for:
//!
//! - **Text processing**: Markup stripping and comment extraction for feed fields
//! - **URL validation**: Checks applied to caller-supplied URL filters
//!
//! # Examples
//!
//! ```
//! use hatena_bookmark_mcp::util::{extract_comment, validate_filter_url};
//!
//! // Validate a URL filter
//! let url = validate_filter_url("https://example.com/article").unwrap();
//!
//! // Pull the user comment out of an HTML description
//! let comment = extract_comment("<p>Great <b>read</b></p>");
//! assert_eq!(comment, "Great read");
//! ```

mod text;
mod url_validator;

pub use text::{extract_comment, strip_tags, MAX_COMMENT_CHARS};
pub use url_validator::{validate_filter_url, UrlValidationError, MAX_FILTER_URL_LENGTH};
