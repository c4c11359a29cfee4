//! Authenticated principal identifier.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Principal`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PrincipalError {
    /// The input string is empty.
    #[error("principal cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("principal must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character that cannot be stored in a cookie value.
    #[error("principal contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Opaque identity issued by the external identity provider.
///
/// This is the only piece of identity state the storefront keeps. It is
/// stored verbatim as a cookie value, so parsing rejects anything outside
/// the RFC 6265 cookie-octet set, and `=` as well.
///
/// ## Examples
///
/// ```
/// use shopfront_core::Principal;
///
/// assert!(Principal::parse("abc123").is_ok());
/// assert!(Principal::parse("2vxsx-fae").is_ok());
///
/// assert!(Principal::parse("").is_err());
/// assert!(Principal::parse("a;b").is_err());
/// assert!(Principal::parse("a=b").is_err());
/// assert!(Principal::parse("has space").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    /// Maximum length of a principal.
    pub const MAX_LENGTH: usize = 256;

    /// Parse a `Principal` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than
    /// [`Self::MAX_LENGTH`], or contains a character that would corrupt a
    /// `name=value; name=value` cookie string.
    pub fn parse(s: &str) -> Result<Self, PrincipalError> {
        if s.is_empty() {
            return Err(PrincipalError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(PrincipalError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(c) = s.chars().find(|c| !is_token_char(*c)) {
            return Err(PrincipalError::InvalidCharacter(c));
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the principal as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Principal` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// cookie-octet = %x21 / %x23-2B / %x2D-3A / %x3C-5B / %x5D-7E, minus `=`.
const fn is_token_char(c: char) -> bool {
    matches!(c, '\x21' | '\x23'..='\x2B' | '\x2D'..='\x3A' | '\x3C' | '\x3E'..='\x5B' | '\x5D'..='\x7E')
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Principal {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Principal {
    type Error = PrincipalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Principal> for String {
    fn from(principal: Principal) -> Self {
        principal.0
    }
}

impl core::str::FromStr for Principal {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_principals() {
        for raw in [
            "abc123",
            "rrkah-fqaaa-aaaaa-aaaaq-cai",
            "user@example.com",
            "auth0|5f7c8ec7c33c6c004bbafe82",
            "a",
        ] {
            let principal = Principal::parse(raw).unwrap();
            assert_eq!(principal.as_str(), raw);
        }
    }

    #[test]
    fn test_empty() {
        assert_eq!(Principal::parse(""), Err(PrincipalError::Empty));
    }

    #[test]
    fn test_too_long() {
        let raw = "x".repeat(Principal::MAX_LENGTH + 1);
        assert!(matches!(
            Principal::parse(&raw),
            Err(PrincipalError::TooLong { .. })
        ));
        assert!(Principal::parse(&"x".repeat(Principal::MAX_LENGTH)).is_ok());
    }

    #[test]
    fn test_cookie_breaking_characters() {
        for (raw, bad) in [
            ("a;b", ';'),
            ("a=b", '='),
            ("a b", ' '),
            ("a,b", ','),
            ("a\"b", '"'),
            ("a\\b", '\\'),
            ("a\tb", '\t'),
            ("caf\u{e9}", '\u{e9}'),
        ] {
            assert_eq!(
                Principal::parse(raw),
                Err(PrincipalError::InvalidCharacter(bad)),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn test_serde_validates() {
        let principal: Principal = serde_json::from_str("\"abc123\"").unwrap();
        assert_eq!(principal.as_str(), "abc123");
        assert!(serde_json::from_str::<Principal>("\"a;b\"").is_err());
    }

    #[test]
    fn test_error_display() {
        let err = PrincipalError::InvalidCharacter(';');
        assert_eq!(err.to_string(), "principal contains invalid character ';'");
    }
}
