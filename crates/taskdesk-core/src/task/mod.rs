//! Task domain module.
//!
//! # Module Structure
//!
//! - `model`: task entity, status/priority enums, create and update payloads
//! - `gateway`: the task backend contract used by the list store
//!
//! # Usage
//!
//! ```ignore
//! use taskdesk_core::task::{Task, TaskRequest, TaskPatch, TaskGateway};
//! ```

mod gateway;
mod model;

pub use gateway::TaskGateway;
pub use model::{Task, TaskId, TaskPatch, TaskPriority, TaskRequest, TaskStatus};
