//! Application bootstrap.
//!
//! [`AppContext`] builds the object graph once: the identity session, one
//! API client per backend service sharing it as token source, the gateways
//! and the list stores. Every store gets a scope nested in the context's
//! root cancellation scope.

use crate::infinite_scroll::InfiniteScroll;
use crate::store::CancelScope;
use crate::task_list::TaskListStore;
use crate::user_list::UserListStore;
use std::sync::{Arc, Mutex};
use taskdesk_core::config::TaskdeskConfig;
use taskdesk_core::error::Result;
use taskdesk_core::identity::{
    IdentityClient, IdentitySession, Navigator, SessionSettings, TokenSource,
};
use taskdesk_core::session::SessionStore;
use taskdesk_core::storage::KeyValueStore;
use taskdesk_infrastructure::{
    ApiClient, HttpTaskGateway, HttpTransport, HttpUserGateway, JsonFileStore,
    OidcIdentityClient, ReqwestTransport, TaskdeskPaths,
};
use tokio::task::JoinHandle;

/// External collaborators the context is built from.
pub struct AppServices {
    pub identity: Arc<dyn IdentityClient>,
    pub storage: Arc<dyn KeyValueStore>,
    pub transport: Arc<dyn HttpTransport>,
}

impl AppServices {
    /// Production services: OIDC client, `session.json` in the config
    /// directory and a `reqwest` transport.
    pub fn production(config: &TaskdeskConfig, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let session_file = TaskdeskPaths::session_file()?;
        tracing::debug!(path = %session_file.display(), "using session file");
        let transport: Arc<dyn HttpTransport> =
            Arc::new(ReqwestTransport::new(config.request_timeout())?);
        Ok(Self {
            identity: Arc::new(OidcIdentityClient::from_config(
                config,
                navigator,
                transport.clone(),
            )),
            storage: Arc::new(JsonFileStore::new(session_file)),
            transport,
        })
    }
}

pub struct AppContext {
    config: TaskdeskConfig,
    session: Arc<IdentitySession>,
    tasks: Arc<TaskListStore>,
    users: Arc<UserListStore>,
    root: CancelScope,
    expiry_watch: Mutex<Option<JoinHandle<()>>>,
}

impl AppContext {
    /// Wires the object graph without touching the network.
    pub fn new(config: TaskdeskConfig, services: AppServices) -> Self {
        let root = CancelScope::new();
        let session = Arc::new(IdentitySession::new(
            services.identity,
            SessionStore::new(services.storage),
            SessionSettings::from(&config),
        ));
        let tokens: Arc<dyn TokenSource> = session.clone();

        let task_api = ApiClient::new(
            "tasks",
            config.backend_api_url.clone(),
            services.transport.clone(),
            tokens.clone(),
        );
        let user_api = ApiClient::new(
            "users",
            config.user_api_url.clone(),
            services.transport,
            tokens,
        );

        let tasks = Arc::new(TaskListStore::new(
            Arc::new(HttpTaskGateway::new(task_api)),
            config.page_size,
            root.child(),
        ));
        let users = Arc::new(UserListStore::new(
            Arc::new(HttpUserGateway::new(user_api, &config.realm)),
            root.child(),
        ));

        Self {
            config,
            session,
            tasks,
            users,
            root,
            expiry_watch: Mutex::new(None),
        }
    }

    /// Builds the context, initializes the identity session and, when
    /// authenticated, starts the token expiry watch.
    pub async fn bootstrap(config: TaskdeskConfig, services: AppServices) -> Self {
        let context = Self::new(config, services);
        let authenticated = context.session.initialize().await;
        tracing::info!(authenticated, "application bootstrapped");
        if authenticated {
            context.start_expiry_watch();
        }
        context
    }

    /// (Re)starts the background task refreshing the token at expiry.
    pub fn start_expiry_watch(&self) {
        let handle = self
            .session
            .clone()
            .watch_expiry(self.root.token().child_token());
        if let Ok(mut slot) = self.expiry_watch.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }

    pub fn config(&self) -> &TaskdeskConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<IdentitySession> {
        &self.session
    }

    pub fn tasks(&self) -> &Arc<TaskListStore> {
        &self.tasks
    }

    pub fn users(&self) -> &Arc<UserListStore> {
        &self.users
    }

    pub fn infinite_scroll(&self) -> InfiniteScroll<TaskListStore> {
        InfiniteScroll::new(self.tasks.clone())
    }

    pub fn root_scope(&self) -> &CancelScope {
        &self.root
    }

    /// Finishes a login redirect and starts the expiry watch.
    pub async fn complete_login(&self, code: &str) -> Result<()> {
        self.session.complete_login(code).await?;
        self.start_expiry_watch();
        Ok(())
    }

    /// Cancels in-flight store operations and the expiry watch, then logs
    /// out. The context stays usable for a later login.
    pub async fn logout(&self) -> Result<()> {
        self.root.cancel();
        self.session.logout().await
    }

    /// Cancels everything currently running under this context.
    pub fn shutdown(&self) {
        self.root.cancel();
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
