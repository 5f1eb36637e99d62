//! [`LikePattern`] definition.

use derive_more::Display;
use postgres_types::{FromSql, ToSql};

/// `ILIKE` pattern matching any value containing the given substring.
#[derive(Clone, Debug, Display, Eq, FromSql, PartialEq, ToSql)]
#[postgres(transparent)]
pub struct LikePattern(String);

impl LikePattern {
    /// Creates a new [`LikePattern`] out of the given `input`, escaping all
    /// its wildcard characters.
    #[must_use]
    pub fn new(input: &str) -> Self {
        Self(format!(
            "%{}%",
            input
                .replace('\\', r"\\")
                .replace('%', r"\%")
                .replace('_', r"\_"),
        ))
    }
}

#[cfg(test)]
mod spec {
    use super::LikePattern;

    #[test]
    fn wraps_plain_input() {
        assert_eq!(LikePattern::new("Shibuya").to_string(), "%Shibuya%");
    }

    #[test]
    fn escapes_wildcards() {
        assert_eq!(
            LikePattern::new(r"100%_off\").to_string(),
            r"%100\%\_off\\%",
        );
    }
}
