//! Session bundle persistence over a durable key-value area.
//!
//! The bundle is written twice: once as an aggregate JSON blob and once as
//! individual keys. Reads prefer the blob and fall back to the individual
//! keys. Storage failures are logged and never surface to callers.

use super::bundle::{SessionBundle, TokenSet};
use crate::storage::KeyValueStore;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Storage keys, all under the `kc_` namespace.
pub mod keys {
    pub const SESSION: &str = "kc_session";
    pub const ACCESS_TOKEN: &str = "kc_token";
    pub const REFRESH_TOKEN: &str = "kc_refreshToken";
    pub const ID_TOKEN: &str = "kc_idToken";
    pub const SAVED_AT: &str = "kc_timeLocal";

    pub const ALL: [&str; 5] = [SESSION, ACCESS_TOKEN, REFRESH_TOKEN, ID_TOKEN, SAVED_AT];
}

/// Wire format of the aggregate blob.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    timestamp: Option<i64>,
}

/// Persists, restores and clears the session bundle.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Writes the tokens with the current time as `saved_at`.
    pub fn save(&self, tokens: &TokenSet) {
        self.save_at(tokens, Utc::now());
    }

    /// Writes the tokens with an explicit `saved_at`.
    pub fn save_at(&self, tokens: &TokenSet, saved_at: DateTime<Utc>) {
        let millis = saved_at.timestamp_millis();
        let blob = StoredSession {
            token: Some(tokens.access_token.clone()),
            refresh_token: Some(tokens.refresh_token.clone()),
            id_token: Some(tokens.id_token.clone()),
            timestamp: Some(millis),
        };

        let blob = match serde_json::to_string(&blob) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize session bundle");
                return;
            }
        };

        let millis = millis.to_string();
        let writes = [
            (keys::SESSION, blob.as_str()),
            (keys::ACCESS_TOKEN, tokens.access_token.as_str()),
            (keys::REFRESH_TOKEN, tokens.refresh_token.as_str()),
            (keys::ID_TOKEN, tokens.id_token.as_str()),
            (keys::SAVED_AT, millis.as_str()),
        ];
        for (key, value) in writes {
            if let Err(e) = self.storage.set(key, value) {
                tracing::warn!(key, error = %e, "failed to save session to storage");
            }
        }
        tracing::debug!("session bundle saved");
    }

    /// Reads the bundle back. Partial token sets are treated as absent.
    pub fn load(&self) -> Option<SessionBundle> {
        if let Some(raw) = self.read(keys::SESSION) {
            match serde_json::from_str::<StoredSession>(&raw) {
                Ok(stored) => {
                    let tokens =
                        TokenSet::from_parts(stored.token, stored.refresh_token, stored.id_token);
                    if let Some(tokens) = tokens {
                        let saved_at = stored
                            .timestamp
                            .and_then(from_millis)
                            .unwrap_or_else(Utc::now);
                        return Some(SessionBundle::new(tokens, saved_at));
                    }
                    tracing::warn!("stored session blob is incomplete, ignoring it");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stored session blob is corrupt, ignoring it");
                }
            }
        }

        self.load_individual_keys()
    }

    fn load_individual_keys(&self) -> Option<SessionBundle> {
        let tokens = TokenSet::from_parts(
            self.read(keys::ACCESS_TOKEN),
            self.read(keys::REFRESH_TOKEN),
            self.read(keys::ID_TOKEN),
        )?;
        let saved_at = self
            .read(keys::SAVED_AT)
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .and_then(from_millis)
            .unwrap_or_else(Utc::now);
        Some(SessionBundle::new(tokens, saved_at))
    }

    /// Removes every session key. Safe to call when nothing is stored.
    pub fn clear(&self) {
        for key in keys::ALL {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key, error = %e, "failed to clear session key");
            }
        }
        tracing::debug!("session bundle cleared");
    }

    /// Age-based staleness, independent of token expiry claims.
    pub fn is_expired(bundle: &SessionBundle, max_age: Duration) -> bool {
        Self::is_expired_at(bundle, max_age, Utc::now())
    }

    pub fn is_expired_at(bundle: &SessionBundle, max_age: Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(max_age) {
            Ok(max_age) => bundle.age_at(now) > max_age,
            // Out-of-range max age never expires.
            Err(_) => false,
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read session key");
                None
            }
        }
    }
}

fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}
