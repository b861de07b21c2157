//! Identity provider client contract.

use crate::error::Result;
use crate::session::TokenSet;
use async_trait::async_trait;
use std::time::Duration;

/// How fresh a token must be before it is handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Refresh only when the token expires within the given window.
    AtLeast(Duration),
    /// Refresh unconditionally.
    Force,
}

impl Freshness {
    /// Decides whether a token expiring at `exp` (unix seconds) must be
    /// refreshed at `now`. Unknown expiry always refreshes.
    pub fn needs_refresh(&self, exp: Option<i64>, now: i64) -> bool {
        match (self, exp) {
            (Freshness::Force, _) | (_, None) => true,
            (Freshness::AtLeast(window), Some(exp)) => {
                let window = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
                exp.saturating_sub(now) < window
            }
        }
    }
}

/// Sends the user agent somewhere (login page, registration page, logout).
///
/// A browser shell navigates; the CLI prints the URL.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// The long-lived authentication client owned by the identity session.
///
/// Implementations hold the current tokens in memory; persistence is the
/// session's job, never the client's.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Initializes the client, optionally seeded with stored tokens.
    ///
    /// Returns whether the client ended up authenticated.
    async fn init(&self, seed: Option<TokenSet>) -> Result<bool>;

    /// Current in-memory tokens, if authenticated.
    async fn tokens(&self) -> Option<TokenSet>;

    async fn is_authenticated(&self) -> bool {
        self.tokens().await.is_some()
    }

    /// Refreshes the tokens if `freshness` requires it.
    ///
    /// Returns `Ok(true)` when a refresh happened, `Ok(false)` when the
    /// current token was fresh enough, and an error when the refresh failed.
    async fn update_token(&self, freshness: Freshness) -> Result<bool>;

    /// Completes a login redirect by exchanging an authorization code.
    async fn exchange_code(&self, code: &str) -> Result<()>;

    /// Starts an interactive login.
    async fn login(&self) -> Result<()>;

    /// Starts an interactive registration.
    async fn register(&self) -> Result<()>;

    /// Drops in-memory tokens and ends the provider session.
    async fn logout(&self) -> Result<()>;
}
