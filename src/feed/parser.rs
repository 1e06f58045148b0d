//! Dual-dialect feed parsing.
//!
//! Parsing happens in two stages. [`read_envelope`] walks the XML with
//! `quick-xml` and collects the channel title plus the raw fields of every
//! `<item>` (keyed by local name, so `dc:subject` and `subject` are the same
//! field). The dialect-specific converters in `syndication` and `rdf` then
//! turn each raw item into a [`BookmarkRecord`].
//!
//! Only a document that cannot be read as the dialect's envelope at all
//! (malformed XML, truncated input, a non-`<rss>` root for RSS 2.0) fails the
//! parse. The RDF reader accepts any root element, so RSS 2.0 documents that
//! merely declare the RDF namespace are still read.
//! Individual items that cannot be converted are logged and skipped.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use super::dates::{canonical, DateParseError};
use super::dialect::{detect, Dialect};
use super::{rdf, syndication};
use crate::types::{BookmarkRecord, ParsedFeed};

/// The feed document could not be read as the detected dialect.
///
/// Carries the input length for diagnostics but never the content itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to parse {dialect} feed ({input_len} bytes): {reason}")]
pub struct ParseError {
    pub dialect: Dialect,
    pub input_len: usize,
    pub reason: String,
}

/// Why a single item was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ItemError {
    #[error("undecodable <{field}> text: {reason}")]
    Text { field: String, reason: String },
    #[error("item has no link")]
    MissingLink,
    #[error("item link {link:?} is not an absolute URL: {reason}")]
    InvalidLink { link: String, reason: String },
}

/// A record produced by a dialect converter.
pub(crate) struct Converted {
    pub record: BookmarkRecord,
    /// True if `bookmarked_at` is a substituted current time
    pub date_fell_back: bool,
}

/// Raw text fields of one `<item>`, in document order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct RawItem {
    fields: Vec<(String, String)>,
}

impl RawItem {
    /// First value of the field with this local name.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// All values of the field with this local name, in document order.
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn push(&mut self, name: String, value: String) {
        self.fields.push((name, value));
    }
}

/// Channel title plus every item, undecodable items kept as errors.
#[derive(Debug, Default)]
pub(crate) struct RawFeed {
    pub title: String,
    pub items: Vec<Result<RawItem, ItemError>>,
}

/// Detects the dialect of `bytes` and parses it.
///
/// # Errors
///
/// Returns [`ParseError`] when the document is not well-formed XML, or when
/// an RSS 2.0 document does not have an `<rss>` root.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, ParseError> {
    parse_with(bytes, detect(bytes))
}

/// Parses `bytes` as the given dialect.
pub fn parse_with(bytes: &[u8], dialect: Dialect) -> Result<ParsedFeed, ParseError> {
    parse_at(bytes, dialect, Utc::now())
}

/// Parses `bytes` as the given dialect, substituting `now` for unusable dates.
pub(crate) fn parse_at(
    bytes: &[u8],
    dialect: Dialect,
    now: DateTime<Utc>,
) -> Result<ParsedFeed, ParseError> {
    tracing::debug!(dialect = %dialect, content_length = bytes.len(), "Parsing feed");

    let raw = read_envelope(bytes, dialect)?;

    let convert: fn(&RawItem, DateTime<Utc>) -> Result<Converted, ItemError> = match dialect {
        Dialect::Syndication => syndication::convert_item,
        Dialect::ResourceDescription => rdf::convert_item,
    };

    let mut records = Vec::with_capacity(raw.items.len());
    let mut skipped = 0;
    let mut date_fallbacks = 0;

    for item in raw.items {
        match item.and_then(|item| convert(&item, now)) {
            Ok(converted) => {
                if converted.date_fell_back {
                    date_fallbacks += 1;
                }
                records.push(converted.record);
            }
            Err(e) => {
                skipped += 1;
                tracing::warn!(dialect = %dialect, error = %e, "Skipping feed item that could not be converted");
            }
        }
    }

    tracing::info!(
        dialect = %dialect,
        title = %raw.title,
        item_count = records.len(),
        skipped = skipped,
        date_fallbacks = date_fallbacks,
        "Parsed feed"
    );

    Ok(ParsedFeed::new(raw.title, records, skipped, date_fallbacks))
}

/// Resolves a raw date field to a canonical timestamp.
///
/// Unusable dates become `now`; the boolean reports whether that happened.
pub(crate) fn resolve_date(
    raw: Option<&str>,
    parse: fn(&str) -> Result<DateTime<Utc>, DateParseError>,
    now: DateTime<Utc>,
) -> (String, bool) {
    match parse(raw.unwrap_or("")) {
        Ok(dt) => (canonical(dt), false),
        Err(DateParseError::Missing) => {
            tracing::debug!("Feed item has no date, using current time");
            (canonical(now), true)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not parse feed item date, using current time");
            (canonical(now), true)
        }
    }
}

/// Trims and checks an item link.
pub(crate) fn require_link(raw: Option<&str>) -> Result<String, ItemError> {
    let link = raw.map(str::trim).unwrap_or("");
    if link.is_empty() {
        return Err(ItemError::MissingLink);
    }

    url::Url::parse(link).map_err(|e| ItemError::InvalidLink {
        link: link.to_owned(),
        reason: e.to_string(),
    })?;

    Ok(link.to_owned())
}

// ============================================================================
// Envelope Reader
// ============================================================================

/// Collects the fields of the `<item>` currently being read.
struct ItemBuilder {
    /// Index of the `<item>` element in the element stack
    depth: usize,
    item: RawItem,
    field: Option<(String, String)>,
    error: Option<ItemError>,
}

impl ItemBuilder {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            item: RawItem::default(),
            field: None,
            error: None,
        }
    }

    fn append(&mut self, text: Result<String, String>) {
        let Some((name, value)) = self.field.as_mut() else {
            return;
        };
        match text {
            Ok(text) => value.push_str(&text),
            Err(reason) => {
                if self.error.is_none() {
                    self.error = Some(ItemError::Text {
                        field: name.clone(),
                        reason,
                    });
                }
            }
        }
    }

    fn close_field(&mut self) {
        if let Some((name, value)) = self.field.take() {
            self.item.push(name, value);
        }
    }

    fn finish(mut self) -> Result<RawItem, ItemError> {
        self.close_field();
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.item),
        }
    }
}

/// Reads the envelope of `bytes` as `dialect`.
///
/// Items are any `<item>` elements (namespace prefixes ignored) that are not
/// nested in another item; their direct children become fields. The channel
/// title is the text of `<channel><title>` directly below the root.
pub(crate) fn read_envelope(bytes: &[u8], dialect: Dialect) -> Result<RawFeed, ParseError> {
    let fail = |reason: String| ParseError {
        dialect,
        input_len: bytes.len(),
        reason,
    };

    // SEC-002: quick-xml (0.37) never expands <!ENTITY> declarations; only the five
    // predefined entities and character references are resolved by `unescape`.
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut feed = RawFeed::default();
    let mut buf = Vec::new();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut root_seen = false;
    let mut item: Option<ItemBuilder> = None;
    let mut in_channel_title = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                check_root(&mut root_seen, &stack, &name, dialect).map_err(fail)?;

                match item.as_mut() {
                    Some(builder) if stack.len() == builder.depth + 1 => {
                        builder.field = Some((lossy(&name), String::new()));
                    }
                    Some(_) => {}
                    None if name == b"item" => {
                        let mut builder = ItemBuilder::new(stack.len());
                        read_item_attributes(&e, &reader, &mut builder);
                        item = Some(builder);
                    }
                    None => {}
                }

                stack.push(name);
                in_channel_title = item.is_none()
                    && stack.len() == 3
                    && stack[1] == b"channel"
                    && stack[2] == b"title";
            }
            Ok(Event::Empty(e)) => {
                let name = e.local_name().as_ref().to_vec();
                check_root(&mut root_seen, &stack, &name, dialect).map_err(fail)?;

                match item.as_mut() {
                    Some(builder) if stack.len() == builder.depth + 1 => {
                        builder.item.push(lossy(&name), String::new());
                    }
                    Some(_) => {}
                    None if name == b"item" => {
                        let mut builder = ItemBuilder::new(stack.len());
                        read_item_attributes(&e, &reader, &mut builder);
                        feed.items.push(builder.finish());
                    }
                    None => {}
                }
            }
            Ok(Event::End(_)) => {
                stack.pop();
                in_channel_title = false;

                if let Some(builder) = item.as_mut() {
                    if stack.len() == builder.depth + 1 {
                        builder.close_field();
                    } else if stack.len() == builder.depth {
                        if let Some(done) = item.take() {
                            feed.items.push(done.finish());
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let text = decode_text(&e);
                if let Some(builder) = item.as_mut() {
                    builder.append(text);
                } else if in_channel_title {
                    feed.title.push_str(&text.map_err(fail)?);
                }
            }
            Ok(Event::CData(e)) => {
                let text = std::str::from_utf8(&e)
                    .map(str::to_owned)
                    .map_err(|e| e.to_string());
                if let Some(builder) = item.as_mut() {
                    builder.append(text);
                } else if in_channel_title {
                    feed.title.push_str(&text.map_err(fail)?);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(fail(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !root_seen {
        return Err(fail("document has no root element".to_owned()));
    }
    if !stack.is_empty() {
        return Err(fail(format!(
            "unexpected end of document inside <{}>",
            lossy(stack.last().map(Vec::as_slice).unwrap_or_default())
        )));
    }

    feed.title = feed.title.trim().to_owned();
    Ok(feed)
}

/// Verifies the document element when `name` opens at the top level.
fn check_root(
    root_seen: &mut bool,
    stack: &[Vec<u8>],
    name: &[u8],
    dialect: Dialect,
) -> Result<(), String> {
    if !stack.is_empty() {
        return Ok(());
    }
    if *root_seen {
        return Err(format!("unexpected element <{}> after document end", lossy(name)));
    }
    if let Some(expected) = dialect.root_element() {
        if name != expected {
            return Err(format!(
                "expected <{}> root element, found <{}>",
                lossy(expected),
                lossy(name)
            ));
        }
    }
    *root_seen = true;
    Ok(())
}

/// Records the `rdf:about` attribute of an item, used as a fallback link.
fn read_item_attributes(e: &BytesStart<'_>, reader: &Reader<&[u8]>, builder: &mut ItemBuilder) {
    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed item attribute");
                continue;
            }
        };
        if attr.key.local_name().as_ref() != b"about" {
            continue;
        }
        match attr.decode_and_unescape_value(reader.decoder()) {
            Ok(value) => builder.item.push("about".to_owned(), value.into_owned()),
            Err(e) => tracing::warn!(error = %e, "Ignoring undecodable item attribute"),
        }
    }
}

/// Decodes and unescapes a text node.
fn decode_text(raw: &[u8]) -> Result<String, String> {
    let text = std::str::from_utf8(raw).map_err(|e| e.to_string())?;
    quick_xml::escape::unescape(text)
        .map(|cow| cow.into_owned())
        .map_err(|e| e.to_string())
}

fn lossy(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}
