use std::borrow::Cow;

/// Maximum length (in characters) of text still considered a user comment.
/// Anything longer is almost always the bookmarked article's excerpt.
pub const MAX_COMMENT_CHARS: usize = 500;

/// Removes markup tags (`<...>`) from text.
///
/// This is a plain scan, not an HTML parser: everything from a `<` up to and
/// including the next `>` is dropped. A `<` with no closing `>` after it is
/// not a tag and is kept verbatim, the same result as a `<[^>]*>` pattern.
///
/// Returns `Cow::Borrowed` when the input contains no `<` (common case).
///
/// # Examples
///
/// ```
/// use hatena_bookmark_mcp::util::strip_tags;
///
/// assert_eq!(strip_tags("<b>hello</b> world"), "hello world");
/// assert_eq!(strip_tags("no markup"), "no markup");
/// assert_eq!(strip_tags("1 < 2"), "1 < 2");
/// ```
pub fn strip_tags(s: &str) -> Cow<'_, str> {
    if !s.contains('<') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        match rest[open..].find('>') {
            Some(close) => rest = &rest[open + close + 1..],
            None => {
                // No closing bracket: not a tag, keep the tail as-is
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    Cow::Owned(out)
}

/// Extracts the user's comment from a description-like field.
///
/// Tags are stripped and the result trimmed. Text longer than
/// [`MAX_COMMENT_CHARS`] characters is treated as article content and yields
/// an empty comment.
pub fn extract_comment(description: &str) -> String {
    let stripped = strip_tags(description);
    let comment = stripped.trim();

    if comment.chars().count() > MAX_COMMENT_CHARS {
        return String::new();
    }

    comment.to_owned()
}
