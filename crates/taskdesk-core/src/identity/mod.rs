//! Identity domain module.
//!
//! # Module Structure
//!
//! - `client`: the identity provider client contract and token freshness rules
//! - `claims`: read-only view of access token claims
//! - `event`: lifecycle events and listener registration
//! - `controller`: [`IdentitySession`], the session state machine
//! - `token_source`: what the HTTP layer needs from the session

mod claims;
mod client;
mod controller;
mod event;
mod token_source;

pub use claims::{TokenClaims, UserInfo};
pub use client::{Freshness, IdentityClient, Navigator};
pub use controller::{IdentitySession, SessionSettings, SessionState};
pub use event::{EventBus, EventKind, IdentityEvent, Listener, ListenerId};
pub use token_source::TokenSource;
