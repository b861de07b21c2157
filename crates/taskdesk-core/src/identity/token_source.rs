use async_trait::async_trait;

/// What the HTTP client layer needs from the identity session.
///
/// The HTTP layer only reads tokens through this trait; persisting them is
/// left to the session.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn is_authenticated(&self) -> bool;

    /// A token valid for at least the configured window, or `None` if the
    /// refresh failed.
    async fn fresh_token(&self) -> Option<String>;

    /// A token obtained by an unconditional refresh, or `None` if it failed.
    async fn force_refresh(&self) -> Option<String>;

    /// Starts an interactive login.
    async fn request_login(&self);

    /// Purges the stored session and starts an interactive login.
    async fn expire_session(&self);
}
