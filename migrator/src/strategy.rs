//! Lookup key extraction from stored identifiers.

use crate::error::{MigrateError, Result};

/// How the lookup key is cut out of a stored value.
///
/// Chosen once per record kind; never inferred from the value itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelimiterStrategy {
    /// Trailing segment after the last space, as in `!gelbooru-rss 12345`.
    LastSpace,
    /// Trailing segment after the last `/`, as in a feed URL path.
    LastSlash,
    /// Remainder after a fixed prefix.
    PrefixStrip(&'static str),
}

impl DelimiterStrategy {
    /// Extract the lookup key from `value`.
    ///
    /// Returns `None` when the delimiter or prefix is absent, or when nothing
    /// follows it.
    pub fn derive<'a>(&self, value: &'a str) -> Option<&'a str> {
        let key = match self {
            Self::LastSpace => value.rsplit_once(' ').map(|(_, tail)| tail),
            Self::LastSlash => value.rsplit_once('/').map(|(_, tail)| tail),
            Self::PrefixStrip(prefix) => value.strip_prefix(prefix),
        }?;
        (!key.is_empty()).then_some(key)
    }

    fn missing(&self) -> &'static str {
        match self {
            Self::LastSpace => "no space separated trailing segment",
            Self::LastSlash => "no slash separated trailing segment",
            Self::PrefixStrip(_) => "expected prefix not found",
        }
    }
}

/// Extract the lookup key for a value read from `table.column`.
///
/// Fails with [`MigrateError::MalformedRecord`] so callers can log and skip.
pub fn derive_lookup_key<'a>(
    value: &'a str,
    strategy: &DelimiterStrategy,
    table: &'static str,
    column: &'static str,
) -> Result<&'a str> {
    strategy
        .derive(value)
        .ok_or_else(|| MigrateError::MalformedRecord {
            table,
            column,
            value: value.to_string(),
            reason: strategy.missing(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAPTER: &str = "https://mangadex.org/chapter/";

    #[test]
    fn last_space_takes_trailing_segment() {
        let strategy = DelimiterStrategy::LastSpace;
        assert_eq!(strategy.derive("!gelbooru-rss 12345"), Some("12345"));
        assert_eq!(strategy.derive("!gelbooru-rss rating:safe 1girl"), Some("1girl"));
        assert_eq!(strategy.derive("!gelbooru-rss"), None);
        assert_eq!(strategy.derive("!gelbooru-rss "), None);
    }

    #[test]
    fn last_slash_takes_trailing_segment() {
        let strategy = DelimiterStrategy::LastSlash;
        assert_eq!(strategy.derive("https://mangadex.org/rss/42"), Some("42"));
        assert_eq!(strategy.derive("https://mangadex.org/rss/"), None);
        assert_eq!(strategy.derive("no-slash"), None);
    }

    #[test]
    fn prefix_strip_round_trips() {
        let strategy = DelimiterStrategy::PrefixStrip(CHAPTER);
        for id in ["abc123", "0b1c-22", "with space", "trailing/"] {
            let value = format!("{CHAPTER}{id}");
            assert_eq!(strategy.derive(&value), Some(id));
        }
    }

    #[test]
    fn prefix_strip_is_case_sensitive() {
        let strategy = DelimiterStrategy::PrefixStrip(CHAPTER);
        assert_eq!(strategy.derive("HTTPS://MANGADEX.ORG/CHAPTER/abc"), None);
        assert_eq!(strategy.derive(CHAPTER), None);
    }

    #[test]
    fn malformed_value_reports_location() {
        let err = derive_lookup_key("abc123", &DelimiterStrategy::LastSpace, "feeds", "url")
            .expect_err("no space in value");
        match err {
            MigrateError::MalformedRecord {
                table,
                column,
                value,
                ..
            } => {
                assert_eq!(table, "feeds");
                assert_eq!(column, "url");
                assert_eq!(value, "abc123");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
