//! Token-holding identity client.
//!
//! Tokens live in memory only. Interactive steps (login, registration,
//! end-session) hand a URL to the [`Navigator`]; the code and refresh grants
//! are form-encoded POSTs to the token endpoint, sent over the shared
//! [`HttpTransport`].

use super::endpoints::OidcEndpoints;
use crate::http::{ApiRequest, HttpTransport, Method};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use taskdesk_core::config::TaskdeskConfig;
use taskdesk_core::error::{Result, TaskdeskError};
use taskdesk_core::identity::{Freshness, IdentityClient, Navigator, TokenClaims};
use taskdesk_core::session::TokenSet;
use tokio::sync::{Mutex, RwLock};

/// Token endpoint answer.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

/// Token endpoint error body (RFC 6749 section 5.2).
#[derive(Debug, Default, Deserialize)]
struct TokenError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

pub struct OidcIdentityClient {
    transport: Arc<dyn HttpTransport>,
    endpoints: OidcEndpoints,
    navigator: Arc<dyn Navigator>,
    tokens: RwLock<Option<TokenSet>>,
    // One refresh grant at a time.
    refresh_lock: Mutex<()>,
}

impl OidcIdentityClient {
    pub fn new(
        endpoints: OidcEndpoints,
        navigator: Arc<dyn Navigator>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            endpoints,
            navigator,
            tokens: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn from_config(
        config: &TaskdeskConfig,
        navigator: Arc<dyn Navigator>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self::new(OidcEndpoints::from_config(config), navigator, transport)
    }

    pub fn endpoints(&self) -> &OidcEndpoints {
        &self.endpoints
    }

    async fn token_grant(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let request = form.iter().fold(
            ApiRequest::new(Method::Post, self.endpoints.token_url()),
            |request, (key, value)| request.form_field(*key, *value),
        );
        let response = self.transport.execute(&request).await?;

        if !response.is_success() {
            let error: TokenError = response.json().unwrap_or_default();
            let message = error
                .error_description
                .or(error.error)
                .unwrap_or_else(|| format!("token endpoint returned {}", response.status));
            return Err(TaskdeskError::Http {
                status: response.status,
                message: Some(message),
            });
        }

        response.json().map_err(|e| TaskdeskError::Serialization {
            format: "JSON".to_string(),
            message: format!("Invalid token response: {e}"),
        })
    }

    async fn refresh_grant(&self, current: &TokenSet) -> Result<TokenSet> {
        let response = self
            .token_grant(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.endpoints.client_id()),
                ("refresh_token", current.refresh_token.as_str()),
            ])
            .await
            .map_err(|e| match e {
                // The provider refused the refresh token: the session is over.
                TaskdeskError::Http { status, message } if (400..500).contains(&status) => {
                    TaskdeskError::session_expired(
                        message.unwrap_or_else(|| "refresh token rejected".to_string()),
                    )
                }
                other => other,
            })?;

        Ok(TokenSet {
            access_token: response.access_token,
            refresh_token: response
                .refresh_token
                .unwrap_or_else(|| current.refresh_token.clone()),
            id_token: response
                .id_token
                .unwrap_or_else(|| current.id_token.clone()),
        })
    }
}

fn access_token_exp(tokens: &TokenSet) -> Option<i64> {
    TokenClaims::decode(&tokens.access_token)
        .ok()
        .and_then(|claims| claims.exp)
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[async_trait]
impl IdentityClient for OidcIdentityClient {
    async fn init(&self, seed: Option<TokenSet>) -> Result<bool> {
        let Some(seed) = seed else {
            return Ok(false);
        };
        *self.tokens.write().await = Some(seed);

        // Only an already-expired access token needs the provider at startup.
        match self.update_token(Freshness::AtLeast(Duration::ZERO)).await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(error = %e, "stored session could not be resumed");
                *self.tokens.write().await = None;
                Ok(false)
            }
        }
    }

    async fn tokens(&self) -> Option<TokenSet> {
        self.tokens.read().await.clone()
    }

    async fn update_token(&self, freshness: Freshness) -> Result<bool> {
        let _guard = self.refresh_lock.lock().await;

        let current = self
            .tokens
            .read()
            .await
            .clone()
            .ok_or_else(|| TaskdeskError::session_expired("not authenticated"))?;

        if !freshness.needs_refresh(access_token_exp(&current), now_unix()) {
            return Ok(false);
        }

        tracing::debug!(?freshness, "refreshing access token");
        let refreshed = self.refresh_grant(&current).await?;
        *self.tokens.write().await = Some(refreshed);
        Ok(true)
    }

    async fn exchange_code(&self, code: &str) -> Result<()> {
        let response = self
            .token_grant(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.endpoints.client_id()),
                ("code", code),
                ("redirect_uri", self.endpoints.redirect_uri()),
            ])
            .await?;

        let tokens = TokenSet::from_parts(
            Some(response.access_token),
            response.refresh_token,
            response.id_token,
        )
        .ok_or_else(|| TaskdeskError::Serialization {
            format: "JSON".to_string(),
            message: "token response is missing the refresh or id token".to_string(),
        })?;

        *self.tokens.write().await = Some(tokens);
        tracing::info!("authorization code exchanged");
        Ok(())
    }

    async fn login(&self) -> Result<()> {
        let url = self.endpoints.auth_url()?;
        self.navigator.navigate(url.as_str());
        Ok(())
    }

    async fn register(&self) -> Result<()> {
        let url = self.endpoints.registration_url()?;
        self.navigator.navigate(url.as_str());
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        let previous = self.tokens.write().await.take();
        let url = self
            .endpoints
            .logout_url(previous.as_ref().map(|t| t.id_token.as_str()))?;
        self.navigator.navigate(url.as_str());
        Ok(())
    }
}
