//! HTTP client layer.
//!
//! # Module Structure
//!
//! - `transport`: request/response types and the [`HttpTransport`] trait,
//!   with the `reqwest` implementation
//! - `client`: [`ApiClient`], one per backend service, carrying the bearer
//!   token interceptor and the 401 refresh-and-replay interceptor

mod client;
mod transport;

pub use client::ApiClient;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, ReqwestTransport};

#[cfg(test)]
pub(crate) use client::tests as test_support;
