//! Session bundle domain model.

use chrono::{DateTime, Utc};
use std::fmt;

/// The three tokens issued by the identity provider.
///
/// `Debug` never prints token material.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub id_token: String,
}

impl TokenSet {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        id_token: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            id_token: id_token.into(),
        }
    }

    /// Builds a token set only when all three tokens are present and non-empty.
    pub fn from_parts(
        access_token: Option<String>,
        refresh_token: Option<String>,
        id_token: Option<String>,
    ) -> Option<Self> {
        let non_empty = |t: Option<String>| t.filter(|v| !v.is_empty());
        Some(Self {
            access_token: non_empty(access_token)?,
            refresh_token: non_empty(refresh_token)?,
            id_token: non_empty(id_token)?,
        })
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("id_token", &"<redacted>")
            .finish()
    }
}

/// Tokens plus the moment they were persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBundle {
    pub tokens: TokenSet,
    pub saved_at: DateTime<Utc>,
}

impl SessionBundle {
    pub fn new(tokens: TokenSet, saved_at: DateTime<Utc>) -> Self {
        Self { tokens, saved_at }
    }

    /// Age of the bundle relative to `now`. Negative ages (clock skew) count as zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.saved_at).max(chrono::Duration::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_is_all_or_nothing() {
        let some = |s: &str| Some(s.to_string());
        assert!(TokenSet::from_parts(some("a"), some("r"), some("i")).is_some());
        assert!(TokenSet::from_parts(some("a"), None, some("i")).is_none());
        assert!(TokenSet::from_parts(some("a"), some("r"), some("")).is_none());
        assert!(TokenSet::from_parts(None, None, None).is_none());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let tokens = TokenSet::new("secret-access", "secret-refresh", "secret-id");
        let printed = format!("{tokens:?}");
        assert!(!printed.contains("secret"));
    }
}
