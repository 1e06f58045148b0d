//! Hatena Bookmark feed ingestion exposed as an MCP tool.
//!
//! The pipeline for one request is sequential:
//! [`validation`] → [`cache`] lookup → [`feed::build_feed_url`] →
//! [`feed::FeedFetcher`] → [`feed::parse_feed`] → [`service::assemble_response`].
//! [`server`] wires it to the `get_hatena_bookmarks` tool.

pub mod cache;
pub mod config;
pub mod feed;
pub mod server;
pub mod service;
pub mod types;
pub mod util;
pub mod validation;
