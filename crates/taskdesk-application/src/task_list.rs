//! Paginated task list synchronization store.
//!
//! Operations dispatch a pending action, await the gateway, then dispatch a
//! fulfilled or rejected action into [`reduce`]. Nothing is applied
//! optimistically, so a rejection never has anything to roll back.

use crate::store::{CancelScope, Phase, StateCell, StoreEvent, cancellable, rejection_message};
use std::sync::Arc;
use taskdesk_core::error::{Result, TaskdeskError};
use taskdesk_core::pagination::{PageResponse, PaginationInfo};
use taskdesk_core::task::{Task, TaskGateway, TaskId, TaskPatch, TaskRequest};
use tokio::sync::{broadcast, watch};

pub const NO_RECORDS_DELETED: &str = "No records were deleted";
pub const NO_RECORDS_UPDATED: &str = "No records were updated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskOperation {
    FetchPage,
    Create,
    Delete,
    Update,
    FindMany,
}

impl TaskOperation {
    /// Message shown when the backend gives none.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            TaskOperation::FetchPage => "Failed to fetch paginated tasks",
            TaskOperation::Create => "Failed to create tasks",
            TaskOperation::Delete => "Failed to delete task",
            TaskOperation::Update => "Failed to update task",
            TaskOperation::FindMany => "Failed to fetch tasks",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListState {
    /// Accumulated across pages, newest creations first.
    pub items: Vec<Task>,
    pub pagination: PaginationInfo,
    pub loading: bool,
    pub error: Option<String>,
    pub has_more: bool,
    /// Requested page number of the last applied fetch.
    pub last_applied_page: Option<u32>,
}

impl TaskListState {
    pub fn new(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            pagination: PaginationInfo::new(page_size),
            loading: false,
            error: None,
            has_more: true,
            last_applied_page: None,
        }
    }

    /// The page the scroll controller should request next.
    pub fn next_page(&self) -> u32 {
        match self.last_applied_page {
            Some(_) => self.pagination.page.saturating_add(1),
            None => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    Pending(TaskOperation),
    PageFetched {
        requested_page: u32,
        response: PageResponse<Task>,
    },
    Created(Vec<Task>),
    Deleted(TaskId),
    Updated {
        id: TaskId,
        patch: TaskPatch,
    },
    /// A lookup settled; the list is not touched.
    Looked,
    Rejected {
        operation: TaskOperation,
        error: TaskdeskError,
    },
}

impl TaskAction {
    pub fn event(&self) -> StoreEvent<TaskOperation> {
        match self {
            TaskAction::Pending(operation) => StoreEvent::new(*operation, Phase::Pending),
            TaskAction::PageFetched { .. } => {
                StoreEvent::new(TaskOperation::FetchPage, Phase::Fulfilled)
            }
            TaskAction::Created(_) => StoreEvent::new(TaskOperation::Create, Phase::Fulfilled),
            TaskAction::Deleted(_) => StoreEvent::new(TaskOperation::Delete, Phase::Fulfilled),
            TaskAction::Updated { .. } => StoreEvent::new(TaskOperation::Update, Phase::Fulfilled),
            TaskAction::Looked => StoreEvent::new(TaskOperation::FindMany, Phase::Fulfilled),
            TaskAction::Rejected { operation, error } => StoreEvent::rejected(
                *operation,
                rejection_message(error, operation.fallback_message()),
            ),
        }
    }
}

/// Pure state transition of the task list.
pub fn reduce(state: &mut TaskListState, action: &TaskAction) {
    match action {
        TaskAction::Pending(TaskOperation::FindMany) => {}
        TaskAction::Pending(_) => {
            state.loading = true;
            state.error = None;
        }
        TaskAction::PageFetched {
            requested_page,
            response,
        } => {
            state.loading = false;
            if state
                .last_applied_page
                .is_some_and(|last| *requested_page <= last)
            {
                tracing::debug!(
                    requested_page,
                    last_applied = ?state.last_applied_page,
                    "discarding stale page"
                );
                return;
            }
            state.items.extend(response.content.iter().cloned());
            state.pagination = PaginationInfo::from_page(response);
            state.has_more = response.has_more();
            state.last_applied_page = Some(*requested_page);
        }
        TaskAction::Created(created) => {
            state.loading = false;
            let mut items = created.clone();
            items.append(&mut state.items);
            state.items = items;
            state.pagination.total_elements += created.len() as u64;
            state.pagination.recompute_total_pages();
        }
        TaskAction::Deleted(id) => {
            state.loading = false;
            state.items.retain(|task| task.id != *id);
            state.pagination.total_elements = state.pagination.total_elements.saturating_sub(1);
        }
        TaskAction::Updated { id, patch } => {
            state.loading = false;
            if let Some(task) = state.items.iter_mut().find(|task| task.id == *id) {
                patch.apply_to(task);
            }
        }
        TaskAction::Looked => {}
        TaskAction::Rejected { operation, error } => {
            if *operation != TaskOperation::FindMany {
                state.loading = false;
            }
            if let Some(message) = rejection_message(error, operation.fallback_message()) {
                state.error = Some(message);
            }
        }
    }
}

/// Store for the paginated task list.
pub struct TaskListStore {
    gateway: Arc<dyn TaskGateway>,
    cell: StateCell<TaskListState, TaskOperation>,
    cancel: CancelScope,
}

impl TaskListStore {
    pub fn new(gateway: Arc<dyn TaskGateway>, page_size: u32, cancel: CancelScope) -> Self {
        Self {
            gateway,
            cell: StateCell::new(TaskListState::new(page_size)),
            cancel,
        }
    }

    pub fn state(&self) -> TaskListState {
        self.cell.snapshot()
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&TaskListState) -> R) -> R {
        self.cell.read(f)
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskListState> {
        self.cell.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent<TaskOperation>> {
        self.cell.subscribe_events()
    }

    /// Cancels the operations in flight. Later calls run normally.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    fn dispatch(&self, action: TaskAction) {
        let event = action.event();
        self.cell.dispatch(|state| reduce(state, &action), event);
    }

    fn reject<T>(&self, operation: TaskOperation, error: TaskdeskError) -> Result<T> {
        if error.is_cancelled() {
            tracing::debug!(?operation, "task operation cancelled");
        } else {
            tracing::warn!(?operation, error = %error, "task operation rejected");
        }
        self.dispatch(TaskAction::Rejected {
            operation,
            error: error.clone(),
        });
        Err(error)
    }

    /// Fetches one page and appends it to the list.
    pub async fn fetch_page(&self, page: u32, page_size: u32) -> Result<()> {
        self.dispatch(TaskAction::Pending(TaskOperation::FetchPage));
        match cancellable(&self.cancel, self.gateway.fetch_page(page, page_size)).await {
            Ok(response) => {
                tracing::debug!(page, items = response.content.len(), "task page fetched");
                self.dispatch(TaskAction::PageFetched {
                    requested_page: page,
                    response,
                });
                Ok(())
            }
            Err(e) => self.reject(TaskOperation::FetchPage, e),
        }
    }

    /// Creates tasks and prepends them in response order.
    pub async fn create_many(&self, requests: Vec<TaskRequest>) -> Result<Vec<Task>> {
        self.dispatch(TaskAction::Pending(TaskOperation::Create));
        match cancellable(&self.cancel, self.gateway.create_many(&requests)).await {
            Ok(created) => {
                tracing::info!(count = created.len(), "tasks created");
                self.dispatch(TaskAction::Created(created.clone()));
                Ok(created)
            }
            Err(e) => self.reject(TaskOperation::Create, e),
        }
    }

    /// Deletes a task. Zero affected records is a rejection.
    pub async fn delete_one(&self, id: TaskId) -> Result<()> {
        self.dispatch(TaskAction::Pending(TaskOperation::Delete));
        match cancellable(&self.cancel, self.gateway.delete_one(id)).await {
            Ok(result) if result.affected_any() => {
                tracing::info!(id, "task deleted");
                self.dispatch(TaskAction::Deleted(id));
                Ok(())
            }
            Ok(_) => self.reject(
                TaskOperation::Delete,
                TaskdeskError::rejected(NO_RECORDS_DELETED),
            ),
            Err(e) => self.reject(TaskOperation::Delete, e),
        }
    }

    /// Updates a task and merges the submitted fields into the cached copy.
    pub async fn update_one(&self, id: TaskId, patch: TaskPatch) -> Result<()> {
        self.dispatch(TaskAction::Pending(TaskOperation::Update));
        match cancellable(&self.cancel, self.gateway.update_one(id, &patch)).await {
            Ok(result) if result.affected_any() => {
                tracing::info!(id, "task updated");
                self.dispatch(TaskAction::Updated { id, patch });
                Ok(())
            }
            Ok(_) => self.reject(
                TaskOperation::Update,
                TaskdeskError::rejected(NO_RECORDS_UPDATED),
            ),
            Err(e) => self.reject(TaskOperation::Update, e),
        }
    }

    /// Read-only lookup of specific tasks; the list is left as is.
    pub async fn find_many(&self, ids: &[TaskId]) -> Result<Vec<Task>> {
        self.dispatch(TaskAction::Pending(TaskOperation::FindMany));
        match cancellable(&self.cancel, self.gateway.find_many(ids)).await {
            Ok(tasks) => {
                self.dispatch(TaskAction::Looked);
                Ok(tasks)
            }
            Err(e) => self.reject(TaskOperation::FindMany, e),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use taskdesk_core::pagination::OperationResult;
    use taskdesk_core::task::{TaskPriority, TaskStatus};

    pub(crate) fn task(id: TaskId) -> Task {
        Task {
            id,
            name: format!("task {id}"),
            status: TaskStatus::Open,
            priority: TaskPriority::Medium,
            description: String::new(),
            estimate_date: None,
            assign_to_user_id: None,
            user_name: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub(crate) fn page(page: u32, ids: std::ops::Range<TaskId>, total: u64) -> PageResponse<Task> {
        PageResponse {
            content: ids.map(task).collect(),
            page,
            size: 20,
            total_elements: total,
            total_pages: taskdesk_core::pagination::total_pages(total, 20),
        }
    }

    /// Gateway answering from per-operation scripts.
    #[derive(Default)]
    pub(crate) struct ScriptedTasks {
        pub(crate) pages: Mutex<VecDeque<Result<PageResponse<Task>>>>,
        pub(crate) created: Mutex<VecDeque<Result<Vec<Task>>>>,
        pub(crate) results: Mutex<VecDeque<Result<OperationResult>>>,
        pub(crate) fetched_pages: Mutex<Vec<u32>>,
        pub(crate) block_fetch: bool,
    }

    fn next<T>(queue: &Mutex<VecDeque<Result<T>>>) -> Result<T> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TaskdeskError::transport("unscripted call")))
    }

    #[async_trait]
    impl TaskGateway for ScriptedTasks {
        async fn fetch_page(&self, page: u32, _page_size: u32) -> Result<PageResponse<Task>> {
            self.fetched_pages.lock().unwrap().push(page);
            if self.block_fetch {
                std::future::pending::<()>().await;
            }
            next(&self.pages)
        }

        async fn find_many(&self, ids: &[TaskId]) -> Result<Vec<Task>> {
            Ok(ids.iter().copied().map(task).collect())
        }

        async fn create_many(&self, _requests: &[TaskRequest]) -> Result<Vec<Task>> {
            next(&self.created)
        }

        async fn delete_one(&self, _id: TaskId) -> Result<OperationResult> {
            next(&self.results)
        }

        async fn update_one(&self, _id: TaskId, _patch: &TaskPatch) -> Result<OperationResult> {
            next(&self.results)
        }
    }

    fn affected(n: u64) -> Result<OperationResult> {
        Ok(OperationResult {
            affected_records: n,
            message: None,
        })
    }

    fn store(gateway: ScriptedTasks) -> (TaskListStore, Arc<ScriptedTasks>) {
        let gateway = Arc::new(gateway);
        (
            TaskListStore::new(gateway.clone(), 20, CancelScope::new()),
            gateway,
        )
    }

    #[test]
    fn test_initial_state() {
        let state = TaskListState::new(20);
        assert!(state.items.is_empty());
        assert!(state.has_more);
        assert!(!state.loading);
        assert_eq!(state.pagination.page_size, 20);
        assert_eq!(state.next_page(), 0);
    }

    #[test]
    fn test_pages_accumulate_until_last() {
        let mut state = TaskListState::new(20);
        let fetched = |state: &mut TaskListState, n: u32, response| {
            reduce(
                state,
                &TaskAction::PageFetched {
                    requested_page: n,
                    response,
                },
            )
        };

        fetched(&mut state, 0, page(0, 0..20, 45));
        assert_eq!(state.items.len(), 20);
        assert!(state.has_more);

        fetched(&mut state, 1, page(1, 20..40, 45));
        assert_eq!(state.items.len(), 40);
        assert!(state.has_more);

        fetched(&mut state, 2, page(2, 40..45, 45));
        assert_eq!(state.items.len(), 45);
        assert_eq!(state.pagination.total_pages, 3);
        assert!(!state.has_more);
    }

    #[test]
    fn test_stale_page_is_discarded() {
        let mut state = TaskListState::new(20);
        reduce(
            &mut state,
            &TaskAction::PageFetched {
                requested_page: 1,
                response: page(1, 20..40, 45),
            },
        );
        reduce(&mut state, &TaskAction::Pending(TaskOperation::FetchPage));
        reduce(
            &mut state,
            &TaskAction::PageFetched {
                requested_page: 0,
                response: page(0, 0..20, 45),
            },
        );

        assert_eq!(state.items.len(), 20);
        assert_eq!(state.items[0].id, 20);
        assert_eq!(state.pagination.page, 1);
        assert!(!state.loading);
    }

    #[test]
    fn test_create_prepends_and_recomputes_pages() {
        let mut state = TaskListState::new(20);
        reduce(
            &mut state,
            &TaskAction::PageFetched {
                requested_page: 0,
                response: page(0, 0..10, 10),
            },
        );

        reduce(&mut state, &TaskAction::Created(vec![task(100), task(101)]));
        assert_eq!(state.pagination.total_elements, 12);
        assert_eq!(state.pagination.total_pages, 1);
        assert_eq!(state.items[0].id, 100);
        assert_eq!(state.items[1].id, 101);
        assert_eq!(state.items.len(), 12);
    }

    #[test]
    fn test_delete_floors_total_at_zero() {
        let mut state = TaskListState::new(20);
        state.items.push(task(1));
        reduce(&mut state, &TaskAction::Deleted(1));
        assert!(state.items.is_empty());
        assert_eq!(state.pagination.total_elements, 0);
    }

    #[tokio::test]
    async fn test_delete_with_zero_affected_is_rejected() {
        let gateway = ScriptedTasks::default();
        gateway.pages.lock().unwrap().push_back(Ok(page(0, 0..3, 3)));
        gateway.results.lock().unwrap().push_back(affected(0));
        let (store, _) = store(gateway);
        store.fetch_page(0, 20).await.unwrap();
        let before = store.state();

        let err = store.delete_one(1).await.unwrap_err();
        assert_eq!(err, TaskdeskError::rejected(NO_RECORDS_DELETED));

        let after = store.state();
        assert_eq!(after.items, before.items);
        assert_eq!(after.pagination, before.pagination);
        assert_eq!(after.error.as_deref(), Some(NO_RECORDS_DELETED));
        assert!(!after.loading);
    }

    #[tokio::test]
    async fn test_delete_success_removes_item() {
        let gateway = ScriptedTasks::default();
        gateway.pages.lock().unwrap().push_back(Ok(page(0, 0..3, 3)));
        gateway.results.lock().unwrap().push_back(affected(1));
        let (store, _) = store(gateway);
        store.fetch_page(0, 20).await.unwrap();

        store.delete_one(1).await.unwrap();
        let state = store.state();
        assert_eq!(
            state.items.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![0, 2]
        );
        assert_eq!(state.pagination.total_elements, 2);
    }

    #[tokio::test]
    async fn test_update_merges_submitted_fields() {
        let gateway = ScriptedTasks::default();
        gateway.pages.lock().unwrap().push_back(Ok(page(0, 0..2, 2)));
        gateway.results.lock().unwrap().push_back(affected(1));
        gateway.results.lock().unwrap().push_back(affected(0));
        let (store, _) = store(gateway);
        store.fetch_page(0, 20).await.unwrap();

        let patch = TaskPatch {
            status: Some(TaskStatus::Done),
            ..Default::default()
        };
        store.update_one(1, patch.clone()).await.unwrap();
        let state = store.state();
        assert_eq!(state.items[1].status, TaskStatus::Done);
        assert_eq!(state.items[1].name, "task 1");

        let err = store.update_one(0, patch).await.unwrap_err();
        assert_eq!(err.to_string(), NO_RECORDS_UPDATED);
        assert_eq!(store.state().items[0].status, TaskStatus::Open);
    }

    #[tokio::test]
    async fn test_rejection_uses_backend_message_or_fallback() {
        let gateway = ScriptedTasks::default();
        gateway.created.lock().unwrap().push_back(Err(TaskdeskError::Http {
            status: 400,
            message: Some("Estimate date must be in the future".to_string()),
        }));
        gateway
            .pages
            .lock()
            .unwrap()
            .push_back(Err(TaskdeskError::transport("timeout")));
        let (store, _) = store(gateway);
        let mut events = store.subscribe_events();

        assert!(store.create_many(Vec::new()).await.is_err());
        assert_eq!(
            store.state().error.as_deref(),
            Some("Estimate date must be in the future")
        );

        assert!(store.fetch_page(0, 20).await.is_err());
        assert_eq!(
            store.state().error.as_deref(),
            Some("Failed to fetch paginated tasks")
        );

        let first = events.recv().await.unwrap();
        assert_eq!(first, StoreEvent::new(TaskOperation::Create, Phase::Pending));
        let second = events.recv().await.unwrap();
        assert_eq!(second.phase, Phase::Rejected);
    }

    #[tokio::test]
    async fn test_cancel_clears_loading_without_error() {
        let gateway = ScriptedTasks {
            block_fetch: true,
            ..Default::default()
        };
        let (store, _) = store(gateway);
        let store = Arc::new(store);

        let running = {
            let store = store.clone();
            tokio::spawn(async move { store.fetch_page(0, 20).await })
        };
        let mut state = store.subscribe();
        state.wait_for(|s| s.loading).await.unwrap();

        store.cancel();
        let result = running.await.unwrap();
        assert_eq!(result, Err(TaskdeskError::Cancelled));

        let state = store.state();
        assert!(!state.loading);
        assert_eq!(state.error, None);
        assert!(state.items.is_empty());
    }

    #[tokio::test]
    async fn test_find_many_leaves_list_untouched() {
        let (store, _) = store(ScriptedTasks::default());
        let found = store.find_many(&[4, 5]).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(store.state().items.is_empty());
        assert!(!store.state().loading);
    }
}
