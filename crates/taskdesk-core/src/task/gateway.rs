//! Task backend gateway trait.

use super::model::{Task, TaskId, TaskPatch, TaskRequest};
use crate::error::Result;
use crate::pagination::{OperationResult, PageResponse};
use async_trait::async_trait;

/// Remote operations of the task backend.
///
/// Implementations return the backend's answer as-is. Interpreting an
/// [`OperationResult`] with zero affected records is the caller's job.
#[async_trait]
pub trait TaskGateway: Send + Sync {
    /// Fetches one page. `page` is zero-based.
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<PageResponse<Task>>;

    /// Looks up specific tasks by id, in backend order.
    async fn find_many(&self, ids: &[TaskId]) -> Result<Vec<Task>>;

    /// Creates tasks in one request. The response preserves request order.
    async fn create_many(&self, requests: &[TaskRequest]) -> Result<Vec<Task>>;

    async fn delete_one(&self, id: TaskId) -> Result<OperationResult>;

    async fn update_one(&self, id: TaskId, patch: &TaskPatch) -> Result<OperationResult>;
}
