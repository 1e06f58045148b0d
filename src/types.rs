use serde::{Deserialize, Serialize};

// ============================================================================
// Inbound Query
// ============================================================================

/// Parameters of a single bookmark feed request.
///
/// Constructed once per tool call and never mutated. Optional filters are
/// `None` when the caller did not supply them; empty strings are normalized
/// to `None` by [`FeedQuery::new`] so that downstream code only has to check
/// one representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FeedQuery {
    /// Hatena user id whose public bookmarks are requested
    pub username: String,
    /// Only bookmarks carrying this tag
    pub tag: Option<String>,
    /// Only bookmarks made on this day (`YYYYMMDD`)
    pub date: Option<String>,
    /// Only bookmarks of this URL
    pub url: Option<String>,
    /// 1-based page number; `0` means "use the default page"
    pub page: i64,
}

impl FeedQuery {
    pub fn new(
        username: impl Into<String>,
        tag: Option<String>,
        date: Option<String>,
        url: Option<String>,
        page: Option<i64>,
    ) -> Self {
        Self {
            username: username.into(),
            tag: non_empty(tag),
            date: non_empty(date),
            url: non_empty(url),
            page: page.unwrap_or(0),
        }
    }

    /// A query for the first page of `username` with no filters.
    pub fn for_user(username: impl Into<String>) -> Self {
        Self::new(username, None, None, None, None)
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = non_empty(Some(tag.into()));
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = non_empty(Some(date.into()));
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = non_empty(Some(url.into()));
        self
    }

    pub fn with_page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    /// Page number actually served: anything below 1 means the first page.
    pub fn effective_page(&self) -> i64 {
        if self.page <= 0 {
            1
        } else {
            self.page
        }
    }

    /// True if at least one optional filter was supplied.
    pub fn has_filters(&self) -> bool {
        self.tag.is_some() || self.date.is_some() || self.url.is_some()
    }
}

/// Trims a filter; blank filters count as absent. Everything downstream
/// (validation, upstream URL, cache key, echoed filters) sees this value.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Normalized Records
// ============================================================================

/// One bookmark, normalized from either feed dialect.
///
/// `bookmarked_at` is always an RFC 3339 UTC timestamp (`2024-01-15T10:30:00Z`),
/// and `tags` never holds empty entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkRecord {
    pub title: String,
    pub url: String,
    pub bookmarked_at: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

/// Result of parsing one feed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFeed {
    /// Feed-level `<channel><title>`
    pub title: String,
    pub records: Vec<BookmarkRecord>,
    /// Always `records.len()`
    pub count: usize,
    /// Items dropped because they could not be converted
    pub skipped: usize,
    /// Records whose timestamp was replaced with the current time
    pub date_fallbacks: usize,
}

impl ParsedFeed {
    pub fn new(
        title: String,
        records: Vec<BookmarkRecord>,
        skipped: usize,
        date_fallbacks: usize,
    ) -> Self {
        let count = records.len();
        Self {
            title,
            records,
            count,
            skipped,
            date_fallbacks,
        }
    }
}

// ============================================================================
// Outbound Response
// ============================================================================

/// Filters echoed back to the caller. Only present fields are serialized.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// The outward-facing result of `get_hatena_bookmarks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarksResponse {
    pub user: String,
    pub page: i64,
    pub total_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterParams>,
    pub bookmarks: Vec<BookmarkRecord>,
}
