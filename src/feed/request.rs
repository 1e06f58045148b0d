use url::Url;

use crate::types::FeedQuery;

/// Builds the feed URL for a query: `{base}/{username}/rss`.
///
/// `tag`, `date` and `url` become query parameters when present; `page` is
/// only sent when it is greater than 1, since page 1 is what the service
/// returns without it. The query is assumed to be validated already.
///
/// # Examples
///
/// ```
/// use hatena_bookmark_mcp::feed::build_feed_url;
/// use hatena_bookmark_mcp::types::FeedQuery;
///
/// let query = FeedQuery::for_user("sample").with_tag("c++").with_page(2);
/// let url = build_feed_url("https://b.hatena.ne.jp", &query).unwrap();
/// assert_eq!(url.as_str(), "https://b.hatena.ne.jp/sample/rss?tag=c%2B%2B&page=2");
/// ```
pub fn build_feed_url(base: &str, query: &FeedQuery) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;

    url.path_segments_mut()
        .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .push(&query.username)
        .push("rss");

    let params = [
        ("tag", query.tag.as_deref()),
        ("date", query.date.as_deref()),
        ("url", query.url.as_deref()),
    ];
    let page = (query.page > 1).then(|| query.page.to_string());

    if params.iter().any(|(_, value)| value.is_some()) || page.is_some() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            if let Some(value) = value {
                pairs.append_pair(key, value);
            }
        }
        if let Some(page) = &page {
            pairs.append_pair("page", page);
        }
    }

    Ok(url)
}
