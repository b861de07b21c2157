//! Shared plumbing of the list synchronization stores.
//!
//! A store keeps its state in a `watch` channel (latest snapshot wins) and
//! publishes `(operation, phase)` events on a `broadcast` channel.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use taskdesk_core::error::{Result, TaskdeskError};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

const EVENT_CAPACITY: usize = 64;

/// Observable phase of an asynchronous store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Fulfilled,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent<Op> {
    pub operation: Op,
    pub phase: Phase,
    /// User-facing message of a rejection. `None` for cancellations.
    pub error: Option<String>,
}

impl<Op> StoreEvent<Op> {
    pub fn new(operation: Op, phase: Phase) -> Self {
        Self {
            operation,
            phase,
            error: None,
        }
    }

    pub fn rejected(operation: Op, error: Option<String>) -> Self {
        Self {
            operation,
            phase: Phase::Rejected,
            error,
        }
    }
}

pub(crate) struct StateCell<S, Op> {
    state: watch::Sender<S>,
    events: broadcast::Sender<StoreEvent<Op>>,
}

impl<S, Op> StateCell<S, Op>
where
    S: Clone,
    Op: Clone,
{
    pub(crate) fn new(initial: S) -> Self {
        let (state, _) = watch::channel(initial);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { state, events }
    }

    pub(crate) fn snapshot(&self) -> S {
        self.state.borrow().clone()
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.borrow())
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<S> {
        self.state.subscribe()
    }

    pub(crate) fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent<Op>> {
        self.events.subscribe()
    }

    /// Applies a reducer step and publishes the matching event.
    pub(crate) fn dispatch(&self, reduce: impl FnOnce(&mut S), event: StoreEvent<Op>) {
        self.state.send_modify(reduce);
        // Having no event subscribers is normal.
        let _ = self.events.send(event);
    }

    /// Applies a reducer step without publishing an event.
    pub(crate) fn modify(&self, reduce: impl FnOnce(&mut S)) {
        self.state.send_modify(reduce);
    }
}

/// Cancellation scope whose token is renewed once it has fired.
///
/// [`CancelScope::cancel`] stops the operations started under the current
/// token. Operations started afterwards run under a fresh token, derived
/// from the parent scope's live token for nested scopes.
#[derive(Clone, Default)]
pub struct CancelScope {
    current: Arc<Mutex<CancellationToken>>,
    parent: Option<Box<CancelScope>>,
}

impl CancelScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A nested scope, cancelled together with this one.
    pub fn child(&self) -> Self {
        Self {
            current: Arc::new(Mutex::new(self.token().child_token())),
            parent: Some(Box::new(self.clone())),
        }
    }

    /// The live token of this scope.
    pub fn token(&self) -> CancellationToken {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.is_cancelled() {
            *current = match &self.parent {
                Some(parent) => parent.token().child_token(),
                None => CancellationToken::new(),
            };
        }
        current.clone()
    }

    /// Cancels the current generation, including nested scopes.
    pub fn cancel(&self) {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }
}

/// Runs `fut` unless the scope is cancelled first, in which case the
/// operation resolves to [`TaskdeskError::Cancelled`].
pub(crate) async fn cancellable<T, F>(scope: &CancelScope, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let cancel = scope.token();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TaskdeskError::Cancelled),
        result = fut => result,
    }
}

/// User-facing message for a rejection, `None` when it was a cancellation.
pub(crate) fn rejection_message(error: &TaskdeskError, fallback: &str) -> Option<String> {
    if error.is_cancelled() {
        None
    } else {
        Some(error.message_or(fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_stops_only_the_current_generation() {
        let scope = CancelScope::new();
        let result: Result<u32> = cancellable(&scope, async {
            scope.cancel();
            std::future::pending().await
        })
        .await;
        assert_eq!(result, Err(TaskdeskError::Cancelled));

        let result = cancellable(&scope, async { Ok(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_parent_cancel_reaches_nested_scope() {
        let root = CancelScope::new();
        let child = root.child();
        let token = child.token();

        root.cancel();
        assert!(token.is_cancelled());
        assert!(!child.token().is_cancelled());
    }

    #[tokio::test]
    async fn test_dispatch_updates_state_and_publishes() {
        let cell: StateCell<u32, &'static str> = StateCell::new(0);
        let mut events = cell.subscribe_events();

        cell.dispatch(|n| *n += 2, StoreEvent::new("add", Phase::Fulfilled));
        assert_eq!(cell.snapshot(), 2);
        assert_eq!(
            events.recv().await.unwrap(),
            StoreEvent::new("add", Phase::Fulfilled)
        );
    }

    #[test]
    fn test_rejection_message() {
        assert_eq!(rejection_message(&TaskdeskError::Cancelled, "x"), None);
        assert_eq!(
            rejection_message(&TaskdeskError::transport("down"), "Failed"),
            Some("Failed".to_string())
        );
    }
}
