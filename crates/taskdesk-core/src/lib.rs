//! Domain layer of the TaskDesk client.
//!
//! Holds the models, the workspace error type, configuration, the session
//! bundle store and the identity session controller, plus the traits the
//! infrastructure layer implements (storage, identity client, gateways).

pub mod config;
pub mod error;
pub mod identity;
pub mod pagination;
pub mod session;
pub mod storage;
pub mod task;
pub mod user;
mod wire;

// Re-export common error type
pub use error::{Result, TaskdeskError};
