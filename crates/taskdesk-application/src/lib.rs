//! Application layer for TaskDesk.
//!
//! Coordinates the domain and infrastructure layers: the list
//! synchronization stores for tasks and users, the infinite-scroll
//! controller, and the bootstrap context that wires them to the identity
//! session.

pub mod context;
pub mod infinite_scroll;
pub mod store;
pub mod task_list;
pub mod user_list;

pub use context::{AppContext, AppServices};
pub use infinite_scroll::{InfiniteScroll, PagedCollection, PagingStatus, ScrollMetrics};
pub use store::{CancelScope, Phase, StoreEvent};
pub use task_list::{TaskAction, TaskListState, TaskListStore, TaskOperation};
pub use user_list::{UserAction, UserListState, UserListStore, UserOperation};
