//! OpenID Connect identity client (Keycloak-compatible).
//!
//! # Module Structure
//!
//! - `endpoints`: URLs of the realm's `openid-connect` protocol endpoints
//! - `client`: [`OidcIdentityClient`], the token holder driving the code and
//!   refresh grants

mod client;
mod endpoints;

pub use client::OidcIdentityClient;
pub use endpoints::OidcEndpoints;
