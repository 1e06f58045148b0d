//! RSS 2.0 item conversion.

use chrono::{DateTime, Utc};

use super::dates::parse_syndication_date;
use super::parser::{require_link, resolve_date, Converted, ItemError, RawItem};
use crate::types::BookmarkRecord;
use crate::util::extract_comment;

/// Converts one RSS 2.0 `<item>`.
///
/// Every `<dc:subject>` contributes a tag; blank subjects are dropped while
/// order and duplicates are kept.
pub(crate) fn convert_item(item: &RawItem, now: DateTime<Utc>) -> Result<Converted, ItemError> {
    let url = require_link(item.first("link"))?;
    let title = item.first("title").unwrap_or("").trim().to_owned();

    let tags = item
        .all("subject")
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect();

    let comment = extract_comment(item.first("description").unwrap_or(""));
    let (bookmarked_at, date_fell_back) =
        resolve_date(item.first("pubDate"), parse_syndication_date, now);

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

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use crate::feed::dialect::Dialect;
    use crate::feed::parser::parse_at;

    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>sample's bookmarks</title>
    <item>
      <title>  Go concurrency patterns  </title>
      <link> https://example.com/go </link>
      <description><![CDATA[<b>hello</b> world]]></description>
      <pubDate>Mon, 15 Jan 2024 19:30:00 +0900</pubDate>
      <dc:subject>go</dc:subject>
      <dc:subject> mcp </dc:subject>
      <dc:subject></dc:subject>
      <dc:subject>   </dc:subject>
      <dc:subject>tools</dc:subject>
      <dc:subject>go</dc:subject>
    </item>
    <item>
      <title>Undated</title>
      <link>https://example.com/undated</link>
      <dc:creator>sample</dc:creator>
    </item>
  </channel>
</rss>"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_full_item_conversion() {
        let feed = parse_at(FEED.as_bytes(), Dialect::Syndication, now()).unwrap();

        assert_eq!(feed.title, "sample's bookmarks");
        assert_eq!(feed.count, 2);
        assert_eq!(feed.skipped, 0);
        assert_eq!(feed.date_fallbacks, 1);

        assert_eq!(
            feed.records[0],
            BookmarkRecord {
                title: "Go concurrency patterns".into(),
                url: "https://example.com/go".into(),
                bookmarked_at: "2024-01-15T10:30:00Z".into(),
                tags: vec!["go".into(), "mcp".into(), "tools".into(), "go".into()],
                comment: "hello world".into(),
            }
        );
    }

    #[test]
    fn test_missing_optional_fields() {
        let feed = parse_at(FEED.as_bytes(), Dialect::Syndication, now()).unwrap();
        let record = &feed.records[1];

        assert!(record.tags.is_empty());
        assert_eq!(record.comment, "");
        assert_eq!(record.bookmarked_at, "2030-01-01T00:00:00Z");
    }

    #[test]
    fn test_three_subjects_in_order() {
        let xml = r#"<rss xmlns:dc="http://purl.org/dc/elements/1.1/"><channel><item>
            <link>https://example.com/</link>
            <dc:subject>go</dc:subject><dc:subject>mcp</dc:subject><dc:subject>tools</dc:subject>
        </item></channel></rss>"#;
        let feed = parse_at(xml.as_bytes(), Dialect::Syndication, now()).unwrap();
        assert_eq!(feed.records[0].tags, vec!["go", "mcp", "tools"]);
    }

    #[test]
    fn test_long_description_is_not_a_comment() {
        let xml = format!(
            r#"<rss><channel><item><link>https://example.com/</link><description>{}</description></item></channel></rss>"#,
            "a".repeat(501)
        );
        let feed = parse_at(xml.as_bytes(), Dialect::Syndication, now()).unwrap();
        assert_eq!(feed.records[0].comment, "");
    }

    #[test]
    fn test_empty_channel() {
        let xml = r#"<rss version="2.0"><channel><title>empty</title></channel></rss>"#;
        let feed = parse_at(xml.as_bytes(), Dialect::Syndication, now()).unwrap();
        assert_eq!(feed.count, 0);
        assert!(feed.records.is_empty());
    }
}
