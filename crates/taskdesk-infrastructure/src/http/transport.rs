//! Wire abstraction under the API clients.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use taskdesk_core::error::{Result, TaskdeskError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        })
    }
}

/// A fully resolved request, replayable as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// `application/x-www-form-urlencoded` fields, sent instead of `body`.
    pub form: Vec<(String, String)>,
    /// Bearer token attached by the request interceptor.
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
            form: Vec::new(),
            bearer: None,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn form_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((key.into(), value.into()));
        self
    }

    /// Value of a form field, if present.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The backend's `message` field, if the body is a JSON object carrying one.
    pub fn backend_message(&self) -> Option<String> {
        let value: serde_json::Value = serde_json::from_slice(&self.body).ok()?;
        value
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .filter(|m| !m.trim().is_empty())
    }
}

/// Executes one HTTP exchange.
///
/// Non-success statuses are returned as responses, not errors; only failures
/// below HTTP (connect, timeout, body read) are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// Production transport on top of `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TaskdeskError::transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        } else if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|err| {
            TaskdeskError::transport(format!(
                "{} {} failed: {err}",
                request.method, request.url
            ))
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|err| {
            TaskdeskError::transport(format!("Failed to read response body: {err}"))
        })?;
        Ok(ApiResponse::new(status, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message() {
        let response = ApiResponse::new(400, r#"{"message":"Name is required"}"#);
        assert_eq!(response.backend_message().as_deref(), Some("Name is required"));

        assert_eq!(ApiResponse::new(500, "<html>").backend_message(), None);
        assert_eq!(
            ApiResponse::new(400, r#"{"message":"  "}"#).backend_message(),
            None
        );
    }

    #[test]
    fn test_request_builder() {
        let request = ApiRequest::new(Method::Get, "http://localhost/tasks")
            .query("page", 2)
            .query("pageSize", 20);
        assert_eq!(
            request.query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("pageSize".to_string(), "20".to_string())
            ]
        );
        assert!(request.bearer.is_none());
    }

    #[test]
    fn test_form_fields() {
        let request = ApiRequest::new(Method::Post, "http://localhost/token")
            .form_field("grant_type", "refresh_token")
            .form_field("client_id", "web");
        assert_eq!(request.form_value("grant_type"), Some("refresh_token"));
        assert_eq!(request.form_value("code"), None);
        assert!(request.body.is_none());
    }
}
