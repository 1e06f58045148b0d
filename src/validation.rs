//! Syntactic validation of caller-supplied query parameters.
//!
//! Every rule is independent; [`validate_query`] reports the first violation
//! in field order (username, tag, date, url, page). Validation is pure: no
//! network access and no I/O, so it always runs before anything is fetched.

use chrono::{Datelike, NaiveDate, Utc};
use thiserror::Error;

use crate::types::FeedQuery;
use crate::util::{validate_filter_url, UrlValidationError};

pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MAX_TAG_LENGTH: usize = 100;
pub const MAX_PAGE: i64 = 10_000;
pub const MIN_YEAR: i32 = 1900;

/// Characters a tag filter must not contain.
const FORBIDDEN_TAG_CHARS: [char; 5] = ['<', '>', '"', '\'', '&'];

/// A rejected query parameter. [`ValidationError::field`] names the offender.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Username is required")]
    MissingUsername,

    #[error("Username must be {max} characters or less (got {0})", max = MAX_USERNAME_LENGTH)]
    UsernameTooLong(usize),

    #[error("Username must contain only alphanumeric characters and hyphens")]
    UsernameCharset,

    #[error("Tag must be {max} characters or less (got {0})", max = MAX_TAG_LENGTH)]
    TagTooLong(usize),

    #[error("Tag contains invalid character {0:?}")]
    TagInvalidChar(char),

    #[error("Date must be in YYYYMMDD format")]
    DateFormat,

    #[error("Invalid year {year} in date (expected {min}..={max})", min = MIN_YEAR)]
    DateYear { year: i32, max: i32 },

    #[error("Invalid month {0} in date")]
    DateMonth(u32),

    #[error("Invalid day {0} in date")]
    DateDay(u32),

    #[error("Invalid date: {0} does not exist")]
    DateNotOnCalendar(String),

    #[error(transparent)]
    Url(#[from] UrlValidationError),

    #[error("Page number must be positive (got {0})")]
    PageNegative(i64),

    #[error("Page number is too large (maximum: {max}, got {0})", max = MAX_PAGE)]
    PageTooLarge(i64),
}

impl ValidationError {
    /// Name of the query field that failed validation.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingUsername | Self::UsernameTooLong(_) | Self::UsernameCharset => "username",
            Self::TagTooLong(_) | Self::TagInvalidChar(_) => "tag",
            Self::DateFormat
            | Self::DateYear { .. }
            | Self::DateMonth(_)
            | Self::DateDay(_)
            | Self::DateNotOnCalendar(_) => "date",
            Self::Url(_) => "url",
            Self::PageNegative(_) | Self::PageTooLarge(_) => "page",
        }
    }
}

/// Validates every field of a [`FeedQuery`].
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered.
pub fn validate_query(query: &FeedQuery) -> Result<(), ValidationError> {
    validate_username(&query.username)?;

    if let Some(tag) = &query.tag {
        validate_tag(tag)?;
    }
    if let Some(date) = &query.date {
        validate_date(date)?;
    }
    if let Some(url) = &query.url {
        validate_filter_url(url)?;
    }

    validate_page(query.page)
}

/// Username: non-blank, at most 50 characters of `[A-Za-z0-9-]`.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::MissingUsername);
    }

    let length = username.chars().count();
    if length > MAX_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooLong(length));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ValidationError::UsernameCharset);
    }

    Ok(())
}

/// Tag: at most 100 characters, none of `< > " ' &`.
pub fn validate_tag(tag: &str) -> Result<(), ValidationError> {
    let tag = tag.trim();

    let length = tag.chars().count();
    if length > MAX_TAG_LENGTH {
        return Err(ValidationError::TagTooLong(length));
    }

    if let Some(c) = tag.chars().find(|c| FORBIDDEN_TAG_CHARS.contains(c)) {
        return Err(ValidationError::TagInvalidChar(c));
    }

    Ok(())
}

/// Date: `YYYYMMDD`, a real calendar day, year between 1900 and next year.
pub fn validate_date(date: &str) -> Result<(), ValidationError> {
    validate_date_with_current_year(date, Utc::now().year())
}

/// Same as [`validate_date`] with an explicit reference year.
pub fn validate_date_with_current_year(
    date: &str,
    current_year: i32,
) -> Result<(), ValidationError> {
    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::DateFormat);
    }

    // All ASCII digits, so these slices and parses cannot fail
    let year: i32 = date[..4].parse().map_err(|_| ValidationError::DateFormat)?;
    let month: u32 = date[4..6].parse().map_err(|_| ValidationError::DateFormat)?;
    let day: u32 = date[6..].parse().map_err(|_| ValidationError::DateFormat)?;

    let max_year = current_year + 1;
    if !(MIN_YEAR..=max_year).contains(&year) {
        return Err(ValidationError::DateYear {
            year,
            max: max_year,
        });
    }
    if !(1..=12).contains(&month) {
        return Err(ValidationError::DateMonth(month));
    }
    if !(1..=31).contains(&day) {
        return Err(ValidationError::DateDay(day));
    }

    NaiveDate::from_ymd_opt(year, month, day)
        .map(|_| ())
        .ok_or_else(|| ValidationError::DateNotOnCalendar(date.to_owned()))
}

/// Page: `0..=10000`. Values above the limit are rejected, not clamped.
pub fn validate_page(page: i64) -> Result<(), ValidationError> {
    if page < 0 {
        return Err(ValidationError::PageNegative(page));
    }
    if page > MAX_PAGE {
        return Err(ValidationError::PageTooLarge(page));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn query(username: &str) -> FeedQuery {
        FeedQuery::for_user(username)
    }

    #[test]
    fn test_valid_minimal_query() {
        assert_eq!(validate_query(&query("sample")), Ok(()));
    }

    #[test]
    fn test_valid_full_query() {
        let q = query("sample-user")
            .with_tag("programming")
            .with_date("20240115")
            .with_url("https://example.com/post")
            .with_page(3);
        assert_eq!(validate_query(&q), Ok(()));
    }

    #[test]
    fn test_padded_filters_validate_after_construction() {
        let q = FeedQuery::new(
            "sample",
            Some(" programming ".into()),
            Some(" 20240115 ".into()),
            Some(" https://example.com/post ".into()),
            None,
        );
        assert_eq!(validate_query(&q), Ok(()));
    }

    #[test]
    fn test_username_rules() {
        assert_eq!(validate_username(""), Err(ValidationError::MissingUsername));
        assert_eq!(validate_username("   "), Err(ValidationError::MissingUsername));
        assert_eq!(
            validate_username(&"a".repeat(51)),
            Err(ValidationError::UsernameTooLong(51))
        );
        assert!(validate_username(&"a".repeat(50)).is_ok());
        assert_eq!(
            validate_username("user_name"),
            Err(ValidationError::UsernameCharset)
        );
        assert_eq!(
            validate_username(" padded"),
            Err(ValidationError::UsernameCharset)
        );
        assert_eq!(
            validate_username("ユーザー"),
            Err(ValidationError::UsernameCharset)
        );
    }

    #[test]
    fn test_tag_rules() {
        assert!(validate_tag("rust").is_ok());
        assert!(validate_tag("日本語タグ").is_ok());
        assert!(validate_tag(&"t".repeat(100)).is_ok());
        assert_eq!(
            validate_tag(&"t".repeat(101)),
            Err(ValidationError::TagTooLong(101))
        );
        for c in FORBIDDEN_TAG_CHARS {
            let tag = format!("a{c}b");
            assert_eq!(validate_tag(&tag), Err(ValidationError::TagInvalidChar(c)));
        }
    }

    #[test]
    fn test_date_format() {
        assert_eq!(validate_date("2024011"), Err(ValidationError::DateFormat));
        assert_eq!(validate_date("202401155"), Err(ValidationError::DateFormat));
        assert_eq!(validate_date("2024-1-15"), Err(ValidationError::DateFormat));
        assert_eq!(validate_date("2024O115"), Err(ValidationError::DateFormat));
        assert_eq!(validate_date("２０２４０１１５"), Err(ValidationError::DateFormat));
    }

    #[test]
    fn test_date_components() {
        assert_eq!(
            validate_date_with_current_year("18991231", 2024),
            Err(ValidationError::DateYear {
                year: 1899,
                max: 2025
            })
        );
        assert!(validate_date_with_current_year("20251231", 2024).is_ok());
        assert!(matches!(
            validate_date_with_current_year("20260101", 2024),
            Err(ValidationError::DateYear { year: 2026, .. })
        ));
        assert_eq!(
            validate_date_with_current_year("20241301", 2024),
            Err(ValidationError::DateMonth(13))
        );
        assert_eq!(
            validate_date_with_current_year("20240001", 2024),
            Err(ValidationError::DateMonth(0))
        );
        assert_eq!(
            validate_date_with_current_year("20240132", 2024),
            Err(ValidationError::DateDay(32))
        );
        assert_eq!(
            validate_date_with_current_year("20240100", 2024),
            Err(ValidationError::DateDay(0))
        );
    }

    #[test]
    fn test_date_calendar_validity() {
        assert_eq!(
            validate_date_with_current_year("20240230", 2024),
            Err(ValidationError::DateNotOnCalendar("20240230".into()))
        );
        // 2024 is a leap year, 2023 is not
        assert!(validate_date_with_current_year("20240229", 2024).is_ok());
        assert!(validate_date_with_current_year("20230229", 2024).is_err());
        assert!(validate_date_with_current_year("20240431", 2024).is_err());
    }

    #[test]
    fn test_page_rules() {
        assert!(validate_page(0).is_ok());
        assert!(validate_page(1).is_ok());
        assert!(validate_page(MAX_PAGE).is_ok());
        assert_eq!(validate_page(-1), Err(ValidationError::PageNegative(-1)));
        assert_eq!(
            validate_page(MAX_PAGE + 1),
            Err(ValidationError::PageTooLarge(MAX_PAGE + 1))
        );
    }

    #[test]
    fn test_errors_identify_field() {
        let cases = [
            (query(""), "username"),
            (query("ok").with_tag("<script>"), "tag"),
            (query("ok").with_date("20240230"), "date"),
            (query("ok").with_url("mailto:a@example.com"), "url"),
            (query("ok").with_page(10_001), "page"),
        ];
        for (q, field) in cases {
            let err = validate_query(&q).unwrap_err();
            assert_eq!(err.field(), field, "query {:?}", q);
        }
    }

    #[test]
    fn test_first_violation_wins() {
        let q = query("bad user").with_tag("<x>").with_page(-5);
        assert_eq!(validate_query(&q).unwrap_err().field(), "username");
    }

    #[test]
    fn test_url_errors_survive_clone() {
        let err = validate_query(&query("ok").with_url("not a url")).unwrap_err();
        let copy = err.clone();
        assert!(matches!(
            copy,
            ValidationError::Url(UrlValidationError::InvalidUrl(_))
        ));
        assert_eq!(copy, err);
    }

    proptest! {
        #[test]
        fn prop_valid_usernames_accepted(name in "[A-Za-z0-9-]{1,50}") {
            prop_assert_eq!(validate_username(&name), Ok(()));
        }

        #[test]
        fn prop_foreign_char_rejected(
            prefix in "[A-Za-z0-9-]{0,20}",
            bad in any::<char>().prop_filter("outside charset", |c| !c.is_ascii_alphanumeric() && *c != '-'),
            suffix in "[A-Za-z0-9-]{0,20}",
        ) {
            let name = format!("{prefix}{bad}{suffix}");
            let err = validate_query(&FeedQuery::for_user(name)).unwrap_err();
            prop_assert_eq!(err.field(), "username");
        }

        #[test]
        fn prop_non_digit_dates_rejected(date in "[0-9]{0,7}[^0-9][0-9]{0,7}") {
            prop_assert!(validate_date(&date).is_err());
        }

        #[test]
        fn prop_calendar_dates_match_chrono(year in 1900i32..=2024, month in 1u32..=12, day in 1u32..=31) {
            let date = format!("{year:04}{month:02}{day:02}");
            let expected = NaiveDate::from_ymd_opt(year, month, day).is_some();
            prop_assert_eq!(validate_date_with_current_year(&date, 2024).is_ok(), expected);
        }
    }
}
