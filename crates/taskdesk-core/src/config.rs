//! Client configuration.
//!
//! Values come from three layers, lowest precedence first: built-in defaults,
//! an optional TOML file, and `TASKDESK_*` environment variables.

use crate::error::{Result, TaskdeskError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix shared by every environment variable the client reads.
pub const ENV_PREFIX: &str = "TASKDESK_";

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_TOKEN_MIN_VALIDITY_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Root configuration for the client core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskdeskConfig {
    /// Base URL of the task backend (gateway in front of `/gw-tasks`).
    pub backend_api_url: String,
    /// Base URL of the user service (`/realms/{realm}/users-services`).
    pub user_api_url: String,
    /// Base URL of the OpenID Connect identity provider.
    pub identity_url: String,
    pub realm: String,
    pub client_id: String,
    /// Where the identity provider sends the browser back after login/logout.
    pub redirect_uri: String,
    pub page_size: u32,
    /// Stored sessions older than this are discarded at startup.
    pub session_max_age_secs: u64,
    /// Tokens expiring sooner than this are refreshed before use.
    pub token_min_validity_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for TaskdeskConfig {
    fn default() -> Self {
        Self {
            backend_api_url: "http://localhost:8080".to_string(),
            user_api_url: "http://localhost:8081".to_string(),
            identity_url: "http://localhost:8081".to_string(),
            realm: "task-swiftly".to_string(),
            client_id: "hahn-task-management".to_string(),
            redirect_uri: "http://localhost:5173/".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            session_max_age_secs: DEFAULT_SESSION_MAX_AGE_SECS,
            token_min_validity_secs: DEFAULT_TOKEN_MIN_VALIDITY_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl TaskdeskConfig {
    /// Loads configuration from an optional TOML file, then applies the
    /// process environment on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_toml_file(path)?,
            Some(path) => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file; missing keys keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TaskdeskError::config(format!(
                "Failed to read configuration file at {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Applies `TASKDESK_*` overrides obtained through `lookup`.
    ///
    /// Taking a lookup function keeps the environment out of tests.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("BACKEND_API_URL") {
            self.backend_api_url = v;
        }
        if let Some(v) = var("USER_API_URL") {
            self.user_api_url = v;
        }
        if let Some(v) = var("IDENTITY_URL") {
            self.identity_url = v;
        }
        if let Some(v) = var("REALM") {
            self.realm = v;
        }
        if let Some(v) = var("CLIENT_ID") {
            self.client_id = v;
        }
        if let Some(v) = var("REDIRECT_URI") {
            self.redirect_uri = v;
        }
        if let Some(v) = var("PAGE_SIZE") {
            self.page_size = parse_number("PAGE_SIZE", &v)?;
        }
        if let Some(v) = var("SESSION_MAX_AGE_SECS") {
            self.session_max_age_secs = parse_number("SESSION_MAX_AGE_SECS", &v)?;
        }
        if let Some(v) = var("TOKEN_MIN_VALIDITY_SECS") {
            self.token_min_validity_secs = parse_number("TOKEN_MIN_VALIDITY_SECS", &v)?;
        }
        if let Some(v) = var("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_number("REQUEST_TIMEOUT_SECS", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("backend_api_url", &self.backend_api_url),
            ("user_api_url", &self.user_api_url),
            ("identity_url", &self.identity_url),
            ("realm", &self.realm),
            ("client_id", &self.client_id),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(TaskdeskError::config(format!("{name} must not be empty")));
            }
        }
        if self.page_size == 0 {
            return Err(TaskdeskError::config("page_size must be greater than 0"));
        }
        Ok(())
    }

    pub fn session_max_age(&self) -> Duration {
        Duration::from_secs(self.session_max_age_secs)
    }

    pub fn token_min_validity(&self) -> Duration {
        Duration::from_secs(self.token_min_validity_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        TaskdeskError::config(format!("{ENV_PREFIX}{name} is not a valid number: '{value}'"))
    })
}
