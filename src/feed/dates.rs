//! Date normalization for feed timestamps.
//!
//! Both dialects funnel their timestamps through an ordered list of
//! [`DateLayout`]s; the first layout that parses wins. The result is always
//! rendered as RFC 3339 in UTC with second precision, see [`canonical`].
//!
//! A leading `Mon, ` style weekday is checked for spelling and then dropped
//! before matching. Feeds often carry a weekday that disagrees with the
//! date, and the date wins.

use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use thiserror::Error;

/// Why a feed timestamp could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateParseError {
    /// The element was absent or blank
    #[error("date is missing")]
    Missing,
    /// No known layout matched
    #[error("unrecognized date format: {0:?}")]
    Unrecognized(String),
}

/// One accepted textual date layout.
#[derive(Debug, Clone, Copy)]
enum DateLayout {
    /// RFC 3339 / ISO 8601 with offset, fractional seconds allowed
    Rfc3339,
    /// `chrono` format with a numeric offset (`%z`)
    Offset(&'static str),
    /// `chrono` format followed by an alphabetic zone name (`GMT`, `JST`, ...)
    NamedZone(&'static str),
    /// `chrono` format without zone, interpreted as UTC
    Naive(&'static str),
}

/// Weekday abbreviations accepted as a `Mon, ` prefix.
const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Layouts used by RSS 2.0 `<pubDate>`, most common first. They match the
/// value after its weekday prefix has been removed.
const SYNDICATION_LAYOUTS: &[DateLayout] = &[
    // RFC 1123: "Mon, 02 Jan 2006 15:04:05 MST"
    DateLayout::NamedZone("%d %b %Y %H:%M:%S"),
    // RFC 1123 with numeric zone: "Mon, 02 Jan 2006 15:04:05 -0700"
    DateLayout::Offset("%d %b %Y %H:%M:%S %z"),
    // RFC 822: "02 Jan 06 15:04 MST"
    DateLayout::NamedZone("%d %b %y %H:%M"),
    // RFC 822 with numeric zone: "02 Jan 06 15:04 -0700"
    DateLayout::Offset("%d %b %y %H:%M %z"),
    DateLayout::Rfc3339,
    DateLayout::Naive("%Y-%m-%d %H:%M:%S"),
];

/// Layouts used by RDF `<dc:date>`, which is usually ISO 8601 already.
const ISO_LAYOUTS: &[DateLayout] = &[
    DateLayout::Rfc3339,
    DateLayout::Naive("%Y-%m-%dT%H:%M:%SZ"),
    DateLayout::Naive("%Y-%m-%dT%H:%M:%S"),
    DateLayout::Naive("%Y-%m-%d %H:%M:%S"),
];

/// Renders a timestamp in the one representation every record uses.
pub fn canonical(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses an RSS 2.0 `<pubDate>` value.
pub fn parse_syndication_date(raw: &str) -> Result<DateTime<Utc>, DateParseError> {
    parse_with_layouts(raw, &[SYNDICATION_LAYOUTS])
}

/// Parses an RDF `<dc:date>` value: ISO 8601 layouts first, then the RSS 2.0
/// layouts as a fallback.
pub fn parse_rdf_date(raw: &str) -> Result<DateTime<Utc>, DateParseError> {
    parse_with_layouts(raw, &[ISO_LAYOUTS, SYNDICATION_LAYOUTS])
}

fn parse_with_layouts(
    raw: &str,
    chains: &[&[DateLayout]],
) -> Result<DateTime<Utc>, DateParseError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(DateParseError::Missing);
    }
    let body = strip_weekday(value);

    chains
        .iter()
        .flat_map(|chain| chain.iter())
        .find_map(|layout| layout.parse(body))
        .ok_or_else(|| DateParseError::Unrecognized(value.to_owned()))
}

/// Drops a `Tue, ` prefix without checking it against the date. Anything
/// that is not a known weekday abbreviation is left in place, so no layout
/// will match it.
fn strip_weekday(value: &str) -> &str {
    match value.split_once(',') {
        Some((day, rest)) if WEEKDAYS.iter().any(|w| w.eq_ignore_ascii_case(day)) => {
            rest.trim_start()
        }
        _ => value,
    }
}

impl DateLayout {
    fn parse(self, value: &str) -> Option<DateTime<Utc>> {
        match self {
            DateLayout::Rfc3339 => DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            DateLayout::Offset(fmt) => DateTime::parse_from_str(value, fmt)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            DateLayout::NamedZone(fmt) => {
                let (rest, zone) = value.rsplit_once(' ')?;
                if zone.is_empty() || !zone.bytes().all(|b| b.is_ascii_alphabetic()) {
                    return None;
                }
                let naive = NaiveDateTime::parse_from_str(rest.trim_end(), fmt).ok()?;
                let offset = FixedOffset::east_opt(zone_offset_secs(zone))?;
                offset
                    .from_local_datetime(&naive)
                    .single()
                    .map(|dt| dt.with_timezone(&Utc))
            }
            DateLayout::Naive(fmt) => NaiveDateTime::parse_from_str(value, fmt)
                .ok()
                .map(|naive| naive.and_utc()),
        }
    }
}

/// Offset in seconds east of UTC for common zone abbreviations.
/// Unknown abbreviations map to UTC.
fn zone_offset_secs(zone: &str) -> i32 {
    const HOUR: i32 = 3600;
    match zone.to_ascii_uppercase().as_str() {
        "UT" | "UTC" | "GMT" | "Z" => 0,
        "JST" | "KST" => 9 * HOUR,
        "CET" => HOUR,
        "CEST" => 2 * HOUR,
        "EST" => -5 * HOUR,
        "EDT" => -4 * HOUR,
        "CST" => -6 * HOUR,
        "CDT" => -5 * HOUR,
        "MST" => -7 * HOUR,
        "MDT" => -6 * HOUR,
        "PST" => -8 * HOUR,
        "PDT" => -7 * HOUR,
        _ => 0,
    }
}
