//! Infrastructure layer: durable storage, platform paths, the HTTP client
//! layer with its REST gateways, and the OpenID Connect identity client.

pub mod http;
pub mod oidc;
pub mod paths;
pub mod storage;
pub mod task_api;
pub mod user_api;

pub use http::{ApiClient, HttpTransport, ReqwestTransport};
pub use oidc::OidcIdentityClient;
pub use paths::TaskdeskPaths;
pub use storage::JsonFileStore;
pub use task_api::HttpTaskGateway;
pub use user_api::HttpUserGateway;
