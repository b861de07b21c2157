//! User domain module.
//!
//! # Module Structure
//!
//! - `model`: user profile as returned by the user service, invite payload
//! - `gateway`: the user service contract used by the user list store

mod gateway;
mod model;

pub use gateway::UserGateway;
pub use model::{InviteUserRequest, User};
