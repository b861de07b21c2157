//! User list synchronization store.

use crate::store::{CancelScope, Phase, StateCell, StoreEvent, cancellable, rejection_message};
use std::sync::Arc;
use taskdesk_core::error::{Result, TaskdeskError};
use taskdesk_core::user::{InviteUserRequest, User, UserGateway};
use tokio::sync::{broadcast, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserOperation {
    FetchUsers,
    ToggleStatus,
    InviteBulk,
}

impl UserOperation {
    pub fn fallback_message(&self) -> &'static str {
        match self {
            UserOperation::FetchUsers => "Failed to fetch users",
            UserOperation::ToggleStatus => "Failed to update user status",
            UserOperation::InviteBulk => "Failed to invite users",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserListState {
    pub users: Vec<User>,
    pub loading: bool,
    pub error: Option<String>,
}

impl UserListState {
    pub fn find(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Pending(UserOperation),
    Fetched(Vec<User>),
    /// The backend confirmed the new enabled state.
    StatusConfirmed { user_id: String, enabled: bool },
    /// Immediate local flip, no backend involved.
    StatusFlippedLocally(String),
    Invited { count: usize },
    Rejected {
        operation: UserOperation,
        error: TaskdeskError,
    },
}

impl UserAction {
    /// `None` for purely local actions.
    pub fn event(&self) -> Option<StoreEvent<UserOperation>> {
        let event = match self {
            UserAction::Pending(operation) => StoreEvent::new(*operation, Phase::Pending),
            UserAction::Fetched(_) => StoreEvent::new(UserOperation::FetchUsers, Phase::Fulfilled),
            UserAction::StatusConfirmed { .. } => {
                StoreEvent::new(UserOperation::ToggleStatus, Phase::Fulfilled)
            }
            UserAction::StatusFlippedLocally(_) => return None,
            UserAction::Invited { .. } => {
                StoreEvent::new(UserOperation::InviteBulk, Phase::Fulfilled)
            }
            UserAction::Rejected { operation, error } => StoreEvent::rejected(
                *operation,
                rejection_message(error, operation.fallback_message()),
            ),
        };
        Some(event)
    }
}

pub fn reduce(state: &mut UserListState, action: &UserAction) {
    match action {
        UserAction::Pending(_) => {
            state.loading = true;
            state.error = None;
        }
        UserAction::Fetched(users) => {
            state.loading = false;
            state.users = users.clone();
        }
        UserAction::StatusConfirmed { user_id, enabled } => {
            state.loading = false;
            if let Some(user) = state.users.iter_mut().find(|u| u.id == *user_id) {
                user.enabled = *enabled;
            }
        }
        UserAction::StatusFlippedLocally(user_id) => {
            if let Some(user) = state.users.iter_mut().find(|u| u.id == *user_id) {
                user.enabled = !user.enabled;
            }
        }
        UserAction::Invited { .. } => {
            state.loading = false;
        }
        UserAction::Rejected { operation, error } => {
            state.loading = false;
            if let Some(message) = rejection_message(error, operation.fallback_message()) {
                state.error = Some(message);
            }
        }
    }
}

pub struct UserListStore {
    gateway: Arc<dyn UserGateway>,
    cell: StateCell<UserListState, UserOperation>,
    cancel: CancelScope,
}

impl UserListStore {
    pub fn new(gateway: Arc<dyn UserGateway>, cancel: CancelScope) -> Self {
        Self {
            gateway,
            cell: StateCell::new(UserListState::default()),
            cancel,
        }
    }

    pub fn state(&self) -> UserListState {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<UserListState> {
        self.cell.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent<UserOperation>> {
        self.cell.subscribe_events()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    fn dispatch(&self, action: UserAction) {
        match action.event() {
            Some(event) => self.cell.dispatch(|state| reduce(state, &action), event),
            None => self.cell.modify(|state| reduce(state, &action)),
        }
    }

    fn reject<T>(&self, operation: UserOperation, error: TaskdeskError) -> Result<T> {
        if !error.is_cancelled() {
            tracing::warn!(?operation, error = %error, "user operation rejected");
        }
        self.dispatch(UserAction::Rejected {
            operation,
            error: error.clone(),
        });
        Err(error)
    }

    /// Replaces the user list with the backend's.
    pub async fn fetch_users(&self) -> Result<()> {
        self.dispatch(UserAction::Pending(UserOperation::FetchUsers));
        match cancellable(&self.cancel, self.gateway.list()).await {
            Ok(users) => {
                tracing::debug!(count = users.len(), "users fetched");
                self.dispatch(UserAction::Fetched(users));
                Ok(())
            }
            Err(e) => self.reject(UserOperation::FetchUsers, e),
        }
    }

    /// Sets a user's enabled flag to `enabled`. The cached flag changes only
    /// once the backend confirmed.
    pub async fn toggle_status(&self, user_id: &str, enabled: bool) -> Result<()> {
        self.dispatch(UserAction::Pending(UserOperation::ToggleStatus));
        match cancellable(&self.cancel, self.gateway.set_status(user_id, enabled)).await {
            Ok(()) => {
                tracing::info!(user_id, enabled, "user status updated");
                self.dispatch(UserAction::StatusConfirmed {
                    user_id: user_id.to_string(),
                    enabled,
                });
                Ok(())
            }
            Err(e) => self.reject(UserOperation::ToggleStatus, e),
        }
    }

    /// Flips the cached flag immediately without calling the backend.
    ///
    /// Returns `false` if the user is not in the list.
    pub fn flip_status_local(&self, user_id: &str) -> bool {
        let known = self.cell.read(|state| state.find(user_id).is_some());
        if known {
            self.dispatch(UserAction::StatusFlippedLocally(user_id.to_string()));
        }
        known
    }

    /// Sends invitations. The list is not touched.
    pub async fn invite_bulk(&self, emails: &[String]) -> Result<()> {
        let invites: Vec<InviteUserRequest> =
            emails.iter().map(InviteUserRequest::new).collect();
        self.dispatch(UserAction::Pending(UserOperation::InviteBulk));
        match cancellable(&self.cancel, self.gateway.invite_bulk(&invites)).await {
            Ok(()) => {
                tracing::info!(count = invites.len(), "invitations sent");
                self.dispatch(UserAction::Invited {
                    count: invites.len(),
                });
                Ok(())
            }
            Err(e) => self.reject(UserOperation::InviteBulk, e),
        }
    }
}
