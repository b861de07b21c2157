//! Authenticated API client.

use super::transport::{ApiRequest, ApiResponse, HttpTransport, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use taskdesk_core::error::{Result, TaskdeskError};
use taskdesk_core::identity::TokenSource;

const UNAUTHORIZED_STATUS: u16 = 401;

/// Request client bound to one backend service.
///
/// Every request passes two interceptors:
/// - before sending, a fresh bearer token is attached when the session is
///   authenticated;
/// - on a 401 while authenticated, the token is force-refreshed once and the
///   request replayed once. A failed refresh or a second 401 ends the session.
#[derive(Clone)]
pub struct ApiClient {
    name: &'static str,
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    tokens: Arc<dyn TokenSource>,
}

impl ApiClient {
    pub fn new(
        name: &'static str,
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            name,
            base_url,
            transport,
            tokens,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds a request against `path`, relative to the base URL.
    pub fn request(&self, method: Method, path: &str) -> ApiRequest {
        ApiRequest::new(method, format!("{}/{}", self.base_url, path.trim_start_matches('/')))
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<R> {
        let mut request = self.request(Method::Get, path);
        for (key, value) in query {
            request = request.query(*key, value);
        }
        self.send(request).await?.json()
    }

    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let request = self.request(Method::Post, path).json(serde_json::to_value(body)?);
        self.send(request).await?.json()
    }

    /// POST whose response body is not interpreted.
    pub async fn post_unit<B>(&self, path: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        let request = self.request(Method::Post, path).json(serde_json::to_value(body)?);
        self.send(request).await?;
        Ok(())
    }

    pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let request = self.request(Method::Put, path).json(serde_json::to_value(body)?);
        self.send(request).await?.json()
    }

    /// PUT without a body whose response body is not interpreted.
    pub async fn put_unit(&self, path: &str, query: &[(&str, String)]) -> Result<()> {
        let mut request = self.request(Method::Put, path);
        for (key, value) in query {
            request = request.query(*key, value);
        }
        self.send(request).await?;
        Ok(())
    }

    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.send(self.request(Method::Delete, path)).await?.json()
    }

    /// Sends a request through both interceptors and returns a success
    /// response, or the rejection it resolved to.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        self.attach_token(&mut request).await;

        tracing::debug!(api = self.name, method = %request.method, url = %request.url, "sending request");
        let response = self.transport.execute(&request).await?;

        if response.status != UNAUTHORIZED_STATUS || !self.tokens.is_authenticated().await {
            return Self::into_result(response);
        }

        tracing::info!(api = self.name, url = %request.url, "401 received, refreshing token and retrying once");
        let Some(token) = self.tokens.force_refresh().await else {
            tracing::error!(api = self.name, "token refresh after 401 failed");
            self.tokens.expire_session().await;
            return Err(TaskdeskError::Unauthorized(
                "token refresh failed, please log in again".to_string(),
            ));
        };

        request.bearer = Some(token);
        let replay = self.transport.execute(&request).await?;
        if replay.status == UNAUTHORIZED_STATUS {
            tracing::error!(api = self.name, url = %request.url, "request still unauthorized after refresh");
            self.tokens.expire_session().await;
            return Err(TaskdeskError::Unauthorized(
                replay
                    .backend_message()
                    .unwrap_or_else(|| "request rejected after token refresh".to_string()),
            ));
        }
        Self::into_result(replay)
    }

    async fn attach_token(&self, request: &mut ApiRequest) {
        if !self.tokens.is_authenticated().await {
            return;
        }
        match self.tokens.fresh_token().await {
            Some(token) => request.bearer = Some(token),
            None => {
                // The request still goes out, unauthenticated.
                tracing::warn!(api = self.name, "could not refresh token before request, starting login");
                self.tokens.request_login().await;
            }
        }
    }

    fn into_result(response: ApiResponse) -> Result<ApiResponse> {
        if response.is_success() {
            return Ok(response);
        }
        let message = response.backend_message();
        tracing::debug!(status = response.status, ?message, "request rejected");
        Err(TaskdeskError::Http {
            status: response.status,
            message,
        })
    }
}
