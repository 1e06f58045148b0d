//! RSS 1.0 (RDF) item conversion.

use chrono::{DateTime, Utc};

use super::dates::parse_rdf_date;
use super::parser::{require_link, resolve_date, Converted, ItemError, RawItem};
use crate::types::BookmarkRecord;
use crate::util::extract_comment;

/// Converts one RDF `<item>`.
///
/// `<dc:subject>` is single-valued here: the first occurrence, trimmed, is the
/// only tag. `<dc:creator>` is ignored. The link falls back to the item's
/// `rdf:about` attribute, and the comment falls back to `<content:encoded>`
/// when the description yields nothing. RSS 2.0 documents that declare the
/// RDF namespace land here too, so `<pubDate>` stands in for a missing
/// `<dc:date>`.
pub(crate) fn convert_item(item: &RawItem, now: DateTime<Utc>) -> Result<Converted, ItemError> {
    let link = item
        .first("link")
        .filter(|link| !link.trim().is_empty())
        .or_else(|| item.first("about"));
    let url = require_link(link)?;
    let title = item.first("title").unwrap_or("").trim().to_owned();

    let tags = match item.first("subject").map(str::trim) {
        Some(subject) if !subject.is_empty() => vec![subject.to_owned()],
        _ => Vec::new(),
    };

    let mut comment = extract_comment(item.first("description").unwrap_or(""));
    if comment.is_empty() {
        comment = extract_comment(item.first("encoded").unwrap_or(""));
    }

    let (bookmarked_at, date_fell_back) = resolve_date(
        item.first("date").or_else(|| item.first("pubDate")),
        parse_rdf_date,
        now,
    );

    Ok(Converted {
        record: BookmarkRecord {
            title,
            url,
            bookmarked_at,
            tags,
            comment,
        },
        date_fell_back,
    })
}
