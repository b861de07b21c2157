//! Identity session controller.
//!
//! `IdentitySession` owns the identity client and is the only writer of the
//! persisted session bundle. It is constructed explicitly and shared behind
//! `Arc` with the HTTP layer and the application bootstrap.

use super::claims::{TokenClaims, UserInfo};
use super::client::{Freshness, IdentityClient};
use super::event::{EventBus, IdentityEvent};
use super::token_source::TokenSource;
use crate::config::TaskdeskConfig;
use crate::error::Result;
use crate::session::SessionStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lower bound between two expiry checks of the watcher.
const MIN_EXPIRY_POLL: Duration = Duration::from_secs(1);

/// Lifecycle of the identity session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Authenticated,
    Unauthenticated,
    LoggedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Stored bundles older than this are not used to seed the client.
    pub max_age: Duration,
    /// Minimum remaining validity before a token is refreshed.
    pub min_validity: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&TaskdeskConfig::default())
    }
}

impl From<&TaskdeskConfig> for SessionSettings {
    fn from(config: &TaskdeskConfig) -> Self {
        Self {
            max_age: config.session_max_age(),
            min_validity: config.token_min_validity(),
        }
    }
}

pub struct IdentitySession {
    client: Arc<dyn IdentityClient>,
    store: SessionStore,
    settings: SessionSettings,
    state: watch::Sender<SessionState>,
    events: EventBus,
}

impl IdentitySession {
    pub fn new(
        client: Arc<dyn IdentityClient>,
        store: SessionStore,
        settings: SessionSettings,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Uninitialized);
        Self {
            client,
            store,
            settings,
            state,
            events: EventBus::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Observes state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    fn set_state(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::info!(?previous, ?next, "identity session state changed");
        }
    }

    /// Initializes the identity client, resuming a stored session when one
    /// exists and is not older than the configured max age.
    ///
    /// Returns whether the session is authenticated. Calling it again after
    /// the first run only reports the current state.
    pub async fn initialize(&self) -> bool {
        if self.state() != SessionState::Uninitialized {
            return self.state() == SessionState::Authenticated;
        }
        self.set_state(SessionState::Initializing);

        let seed = match self.store.load() {
            Some(bundle) if SessionStore::is_expired(&bundle, self.settings.max_age) => {
                tracing::info!("stored session is too old, discarding it");
                self.store.clear();
                None
            }
            Some(bundle) => Some(bundle.tokens),
            None => None,
        };
        let seeded = seed.is_some();

        let authenticated = match self.client.init(seed).await {
            Ok(authenticated) => authenticated,
            Err(e) => {
                tracing::warn!(error = %e, "identity client initialization failed");
                false
            }
        };

        if authenticated {
            self.set_state(SessionState::Authenticated);
            self.persist_tokens().await;
            self.events.emit(&IdentityEvent::AuthSuccess);
        } else {
            if seeded {
                // The provider refused the stored tokens.
                self.store.clear();
            }
            self.set_state(SessionState::Unauthenticated);
        }

        self.events.emit(&IdentityEvent::Ready { authenticated });
        authenticated
    }

    /// Runs the session's own reaction to `event`, then notifies listeners.
    pub async fn dispatch(&self, event: IdentityEvent) {
        match &event {
            IdentityEvent::TokenExpired => {
                self.handle_token_expired().await;
            }
            IdentityEvent::AuthSuccess | IdentityEvent::AuthRefreshSuccess => {
                self.set_state(SessionState::Authenticated);
                self.persist_tokens().await;
            }
            IdentityEvent::AuthRefreshError => {
                self.store.clear();
                self.set_state(SessionState::Unauthenticated);
            }
            IdentityEvent::AuthLogout => {
                self.store.clear();
                self.set_state(SessionState::LoggedOut);
            }
            IdentityEvent::Ready { .. } => {}
        }
        self.events.emit(&event);
    }

    /// One refresh attempt for an expired token.
    ///
    /// On failure the stored session is purged and a fresh login is started;
    /// there is no further retry.
    async fn handle_token_expired(&self) -> bool {
        match self
            .client
            .update_token(Freshness::AtLeast(self.settings.min_validity))
            .await
        {
            Ok(refreshed) => {
                if refreshed {
                    tracing::info!("token refreshed after expiry");
                    self.persist_tokens().await;
                    self.events.emit(&IdentityEvent::AuthRefreshSuccess);
                }
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "token refresh failed, session ended");
                self.end_session().await;
                false
            }
        }
    }

    pub async fn login(&self) -> Result<()> {
        self.client.login().await
    }

    pub async fn register(&self) -> Result<()> {
        self.client.register().await
    }

    /// Finishes a login redirect with the authorization code.
    pub async fn complete_login(&self, code: &str) -> Result<()> {
        self.client.exchange_code(code).await?;
        self.set_state(SessionState::Authenticated);
        self.persist_tokens().await;
        self.events.emit(&IdentityEvent::AuthSuccess);
        Ok(())
    }

    /// Clears the stored session first, then ends the provider session.
    pub async fn logout(&self) -> Result<()> {
        self.store.clear();
        self.set_state(SessionState::LoggedOut);
        self.events.emit(&IdentityEvent::AuthLogout);
        self.client.logout().await
    }

    /// Returns a token valid for at least the configured window.
    ///
    /// `None` means the refresh failed; the caller decides what to do.
    pub async fn get_token(&self) -> Option<String> {
        match self
            .client
            .update_token(Freshness::AtLeast(self.settings.min_validity))
            .await
        {
            Ok(refreshed) => {
                if refreshed {
                    self.persist_tokens().await;
                }
                self.client.tokens().await.map(|t| t.access_token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to refresh token");
                None
            }
        }
    }

    /// Explicit refresh. Returns whether the token changed; failures are `false`.
    pub async fn refresh(&self, force: bool) -> bool {
        let freshness = if force {
            Freshness::Force
        } else {
            Freshness::AtLeast(self.settings.min_validity)
        };
        match self.client.update_token(freshness).await {
            Ok(refreshed) => {
                if refreshed {
                    self.persist_tokens().await;
                }
                refreshed
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed");
                false
            }
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated && self.client.is_authenticated().await
    }

    /// Claims of the current access token.
    pub async fn claims(&self) -> Option<TokenClaims> {
        let tokens = self.client.tokens().await?;
        match TokenClaims::decode(&tokens.access_token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::debug!(error = %e, "access token claims unreadable");
                None
            }
        }
    }

    pub async fn user_info(&self) -> Option<UserInfo> {
        self.claims().await.map(|c| c.user_info())
    }

    pub async fn has_role(&self, role: &str) -> bool {
        self.claims().await.is_some_and(|c| c.has_role(role))
    }

    pub async fn has_any_role(&self, roles: &[&str]) -> bool {
        match self.claims().await {
            Some(claims) => roles.iter().any(|role| claims.has_role(role)),
            None => false,
        }
    }

    pub async fn is_token_expired(&self) -> bool {
        self.claims()
            .await
            .is_none_or(|c| c.is_expired_at(chrono::Utc::now().timestamp()))
    }

    /// Purges the stored session and starts a fresh login.
    pub async fn end_session(&self) {
        self.store.clear();
        self.set_state(SessionState::Unauthenticated);
        self.events.emit(&IdentityEvent::AuthRefreshError);
        if let Err(e) = self.client.login().await {
            tracing::error!(error = %e, "failed to start login after session end");
        }
    }

    /// Spawns a task that dispatches [`IdentityEvent::TokenExpired`] whenever
    /// the access token reaches its `exp` claim.
    ///
    /// The task stops on cancellation or once the session is no longer
    /// authenticated.
    pub fn watch_expiry(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if self.state() != SessionState::Authenticated {
                    break;
                }
                let Some(exp) = self.claims().await.and_then(|c| c.exp) else {
                    tracing::debug!("access token has no exp claim, expiry watch stopped");
                    break;
                };
                let remaining = exp.saturating_sub(chrono::Utc::now().timestamp());
                let wait = Duration::from_secs(u64::try_from(remaining).unwrap_or(0))
                    .max(MIN_EXPIRY_POLL);

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }
                if self.state() != SessionState::Authenticated {
                    break;
                }
                self.dispatch(IdentityEvent::TokenExpired).await;
            }
            tracing::debug!("expiry watch finished");
        })
    }

    async fn persist_tokens(&self) {
        match self.client.tokens().await {
            Some(tokens) => self.store.save(&tokens),
            None => tracing::debug!("no tokens to persist"),
        }
    }
}

#[async_trait]
impl TokenSource for IdentitySession {
    async fn is_authenticated(&self) -> bool {
        IdentitySession::is_authenticated(self).await
    }

    async fn fresh_token(&self) -> Option<String> {
        self.get_token().await
    }

    async fn force_refresh(&self) -> Option<String> {
        match self.client.update_token(Freshness::Force).await {
            Ok(_) => {
                self.persist_tokens().await;
                self.client.tokens().await.map(|t| t.access_token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "forced token refresh failed");
                None
            }
        }
    }

    async fn request_login(&self) {
        if let Err(e) = self.client.login().await {
            tracing::error!(error = %e, "failed to start login");
        }
    }

    async fn expire_session(&self) {
        self.end_session().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskdeskError;
    use crate::identity::claims::tests::jwt;
    use crate::identity::event::EventKind;
    use crate::session::{SessionBundle, TokenSet, keys};
    use crate::storage::{KeyValueStore, MemoryStore};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn token_set(access: &str) -> TokenSet {
        TokenSet::new(access, "refresh", "id")
    }

    /// Scripted identity client recording every call.
    #[derive(Default)]
    struct MockIdentityClient {
        tokens: Mutex<Option<TokenSet>>,
        init_result: Mutex<Option<Result<bool>>>,
        update_results: Mutex<VecDeque<Result<TokenSet>>>,
        calls: Mutex<Vec<String>>,
        storage: Mutex<Option<Arc<MemoryStore>>>,
        storage_empty_at_logout: Mutex<Option<bool>>,
    }

    impl MockIdentityClient {
        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, call: &str) -> usize {
            self.calls().iter().filter(|c| c.as_str() == call).count()
        }

        fn queue_refresh(&self, result: Result<TokenSet>) {
            self.update_results.lock().unwrap().push_back(result);
        }
    }

    #[async_trait]
    impl IdentityClient for MockIdentityClient {
        async fn init(&self, seed: Option<TokenSet>) -> Result<bool> {
            self.record(if seed.is_some() { "init(seeded)" } else { "init" });
            let scripted = self.init_result.lock().unwrap().take();
            let result = scripted.unwrap_or(Ok(seed.is_some()));
            if matches!(result, Ok(true)) {
                *self.tokens.lock().unwrap() = seed.or_else(|| Some(token_set("fresh")));
            }
            result
        }

        async fn tokens(&self) -> Option<TokenSet> {
            self.tokens.lock().unwrap().clone()
        }

        async fn update_token(&self, freshness: Freshness) -> Result<bool> {
            self.record(match freshness {
                Freshness::Force => "update_token(force)",
                Freshness::AtLeast(_) => "update_token",
            });
            let next = self.update_results.lock().unwrap().pop_front();
            match next {
                Some(Ok(tokens)) => {
                    *self.tokens.lock().unwrap() = Some(tokens);
                    Ok(true)
                }
                Some(Err(e)) => Err(e),
                None if self.tokens.lock().unwrap().is_some() => Ok(false),
                None => Err(TaskdeskError::session_expired("not authenticated")),
            }
        }

        async fn exchange_code(&self, code: &str) -> Result<()> {
            self.record("exchange_code");
            if code == "bad" {
                return Err(TaskdeskError::Http {
                    status: 400,
                    message: Some("invalid_grant".to_string()),
                });
            }
            *self.tokens.lock().unwrap() = Some(token_set("from-code"));
            Ok(())
        }

        async fn login(&self) -> Result<()> {
            self.record("login");
            Ok(())
        }

        async fn register(&self) -> Result<()> {
            self.record("register");
            Ok(())
        }

        async fn logout(&self) -> Result<()> {
            self.record("logout");
            if let Some(storage) = self.storage.lock().unwrap().as_ref() {
                *self.storage_empty_at_logout.lock().unwrap() = Some(storage.is_empty());
            }
            *self.tokens.lock().unwrap() = None;
            Ok(())
        }
    }

    struct Fixture {
        session: Arc<IdentitySession>,
        client: Arc<MockIdentityClient>,
        storage: Arc<MemoryStore>,
        store: SessionStore,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(MemoryStore::new());
        let store = SessionStore::new(storage.clone());
        let client = Arc::new(MockIdentityClient::default());
        *client.storage.lock().unwrap() = Some(storage.clone());
        let session = Arc::new(IdentitySession::new(
            client.clone(),
            store.clone(),
            SessionSettings::default(),
        ));
        Fixture {
            session,
            client,
            storage,
            store,
        }
    }

    async fn authenticated_fixture() -> Fixture {
        let f = fixture();
        f.store.save(&token_set("stored"));
        assert!(f.session.initialize().await);
        f
    }

    #[tokio::test]
    async fn test_initialize_without_stored_session() {
        let f = fixture();
        let ready = Arc::new(Mutex::new(None));
        let seen = ready.clone();
        f.session.events().on(EventKind::Ready, move |event| {
            *seen.lock().unwrap() = Some(event.clone());
        });

        assert!(!f.session.initialize().await);
        assert_eq!(f.session.state(), SessionState::Unauthenticated);
        assert_eq!(f.client.calls(), vec!["init"]);
        assert_eq!(
            *ready.lock().unwrap(),
            Some(IdentityEvent::Ready {
                authenticated: false
            })
        );
    }

    #[tokio::test]
    async fn test_initialize_resumes_stored_session() {
        let f = authenticated_fixture().await;
        assert_eq!(f.client.calls(), vec!["init(seeded)"]);
        assert_eq!(f.session.state(), SessionState::Authenticated);
        assert!(f.session.is_authenticated().await);
        assert!(f.store.load().is_some());
    }

    #[tokio::test]
    async fn test_initialize_discards_stale_session() {
        let f = fixture();
        let old = chrono::Utc::now() - chrono::Duration::hours(25);
        f.store.save_at(&token_set("stale"), old);

        assert!(!f.session.initialize().await);
        assert_eq!(f.client.calls(), vec!["init"]);
        assert!(f.storage.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_clears_rejected_seed() {
        let f = fixture();
        f.store.save(&token_set("revoked"));
        *f.client.init_result.lock().unwrap() = Some(Ok(false));

        assert!(!f.session.initialize().await);
        assert!(f.store.load().is_none());
        assert_eq!(f.session.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_token_expired_refresh_success_saves_bundle() {
        let f = authenticated_fixture().await;
        f.client.queue_refresh(Ok(token_set("renewed")));

        f.session.dispatch(IdentityEvent::TokenExpired).await;

        let bundle: SessionBundle = f.store.load().unwrap();
        assert_eq!(bundle.tokens.access_token, "renewed");
        assert_eq!(f.session.state(), SessionState::Authenticated);
        assert_eq!(f.client.count("login"), 0);
    }

    #[tokio::test]
    async fn test_token_expired_refresh_failure_clears_and_logs_in_once() {
        let f = authenticated_fixture().await;
        f.client
            .queue_refresh(Err(TaskdeskError::session_expired("refresh token revoked")));

        f.session.dispatch(IdentityEvent::TokenExpired).await;

        assert!(f.store.load().is_none());
        assert_eq!(f.session.state(), SessionState::Unauthenticated);
        assert_eq!(f.client.count("update_token"), 1);
        assert_eq!(f.client.count("login"), 1);
    }

    #[tokio::test]
    async fn test_logout_clears_storage_before_client_logout() {
        let f = authenticated_fixture().await;
        let logouts = Arc::new(AtomicUsize::new(0));
        let counter = logouts.clone();
        f.session.events().on(EventKind::AuthLogout, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        f.session.logout().await.unwrap();

        assert_eq!(*f.client.storage_empty_at_logout.lock().unwrap(), Some(true));
        assert_eq!(f.session.state(), SessionState::LoggedOut);
        assert_eq!(logouts.load(Ordering::SeqCst), 1);
        assert!(f.storage.get(keys::SESSION).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_token_returns_none_on_failure() {
        let f = authenticated_fixture().await;
        assert_eq!(f.session.get_token().await.as_deref(), Some("stored"));

        f.client
            .queue_refresh(Err(TaskdeskError::transport("identity provider down")));
        assert_eq!(f.session.get_token().await, None);
        // A failed read does not end the session.
        assert_eq!(f.session.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_force_refresh_through_token_source() {
        let f = authenticated_fixture().await;
        f.client.queue_refresh(Ok(token_set("forced")));

        let source: Arc<dyn TokenSource> = f.session.clone();
        assert_eq!(source.force_refresh().await.as_deref(), Some("forced"));
        assert_eq!(f.store.load().unwrap().tokens.access_token, "forced");
        assert_eq!(f.client.count("update_token(force)"), 1);
    }

    #[tokio::test]
    async fn test_explicit_refresh_reports_change() {
        let f = authenticated_fixture().await;
        assert!(!f.session.refresh(false).await);

        f.client.queue_refresh(Ok(token_set("explicit")));
        assert!(f.session.refresh(true).await);
        assert_eq!(f.store.load().unwrap().tokens.access_token, "explicit");

        f.client
            .queue_refresh(Err(TaskdeskError::transport("identity provider down")));
        assert!(!f.session.refresh(true).await);
    }

    #[tokio::test]
    async fn test_complete_login_persists_tokens() {
        let f = fixture();
        f.session.initialize().await;

        assert!(f.session.complete_login("bad").await.is_err());
        assert!(f.store.load().is_none());

        f.session.complete_login("good").await.unwrap();
        assert_eq!(f.session.state(), SessionState::Authenticated);
        assert_eq!(f.store.load().unwrap().tokens.access_token, "from-code");
    }

    #[tokio::test]
    async fn test_roles_from_claims() {
        let f = fixture();
        let access = jwt(&serde_json::json!({
            "sub": "u-1",
            "exp": chrono::Utc::now().timestamp() + 600,
            "preferred_username": "amina",
            "realm_access": { "roles": ["ROLE_ADMIN"] }
        }));
        f.store.save(&TokenSet::new(access, "refresh", "id"));
        assert!(f.session.initialize().await);

        assert!(f.session.has_role("ROLE_ADMIN").await);
        assert!(f.session.has_any_role(&["ROLE_USER", "ROLE_ADMIN"]).await);
        assert!(!f.session.is_token_expired().await);
        let info = f.session.user_info().await.unwrap();
        assert_eq!(info.username.as_deref(), Some("amina"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_expiry_dispatches_token_expired() {
        let f = fixture();
        let access = jwt(&serde_json::json!({ "exp": chrono::Utc::now().timestamp() + 5 }));
        f.store.save(&TokenSet::new(access, "refresh", "id"));
        assert!(f.session.initialize().await);
        f.client
            .queue_refresh(Err(TaskdeskError::session_expired("refresh token expired")));

        let cancel = CancellationToken::new();
        let handle = f.session.clone().watch_expiry(cancel.clone());
        handle.await.unwrap();

        assert_eq!(f.client.count("update_token"), 1);
        assert_eq!(f.session.state(), SessionState::Unauthenticated);
        assert!(f.store.load().is_none());
    }

    #[tokio::test]
    async fn test_watch_expiry_stops_on_cancel() {
        let f = fixture();
        let access = jwt(&serde_json::json!({ "exp": chrono::Utc::now().timestamp() + 3600 }));
        f.store.save(&TokenSet::new(access, "refresh", "id"));
        assert!(f.session.initialize().await);

        let cancel = CancellationToken::new();
        let handle = f.session.clone().watch_expiry(cancel.clone());
        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(f.client.count("update_token"), 0);
    }
}
