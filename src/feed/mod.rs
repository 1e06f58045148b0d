//! Feed ingestion: URL building, fetching and dual-dialect parsing.
//!
//! The bookmark service publishes the same logical feed in two XML shapes:
//! RSS 2.0 and the older RDF Site Summary (RSS 1.0). Both normalize to
//! [`crate::types::BookmarkRecord`].
//!
//! # Architecture
//!
//! - [`request`] - Builds `{base}/{user}/rss?...` from a validated query
//! - [`fetcher`] - Single HTTP GET with timeout, size cap and cancellation
//! - [`dialect`] - Cheap textual detection of the XML dialect
//! - [`parser`] - Envelope reader plus per-dialect item conversion
//! - [`dates`] - Timestamp layouts and canonical rendering
//!
//! # Example
//!
//! ```ignore
//! use hatena_bookmark_mcp::feed::{build_feed_url, parse_feed, FeedFetcher};
//!
//! let url = build_feed_url("https://b.hatena.ne.jp", &query)?;
//! let bytes = fetcher.fetch(&url, &cancel).await?;
//! let feed = parse_feed(&bytes)?;
//! ```

pub mod dates;
pub mod dialect;
pub mod fetcher;
pub mod parser;
pub mod request;

mod rdf;
mod syndication;

pub use dialect::{detect, Dialect};
pub use fetcher::{FeedFetcher, FetchError, MAX_FEED_SIZE};
pub use parser::{parse_feed, parse_with, ParseError};
pub use request::build_feed_url;
