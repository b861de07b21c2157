//! Session persistence.
//!
//! - `bundle`: the token set and the persisted session bundle
//! - `store`: load/save/clear of the bundle over a [`KeyValueStore`](crate::storage::KeyValueStore)

mod bundle;
mod store;

pub use bundle::{SessionBundle, TokenSet};
pub use store::{SessionStore, keys};
