//! Durable key-value storage implementations.

mod json_file;

pub use json_file::JsonFileStore;
pub use taskdesk_core::storage::MemoryStore;
