use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Lifecycle events raised by the identity session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    /// Initialization finished.
    Ready { authenticated: bool },
    /// Tokens were obtained through login or a restored session.
    AuthSuccess,
    /// The access token reached its expiry.
    TokenExpired,
    AuthRefreshSuccess,
    AuthRefreshError,
    AuthLogout,
}

/// Discriminant used to register listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    AuthSuccess,
    TokenExpired,
    AuthRefreshSuccess,
    AuthRefreshError,
    AuthLogout,
}

impl IdentityEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            IdentityEvent::Ready { .. } => EventKind::Ready,
            IdentityEvent::AuthSuccess => EventKind::AuthSuccess,
            IdentityEvent::TokenExpired => EventKind::TokenExpired,
            IdentityEvent::AuthRefreshSuccess => EventKind::AuthRefreshSuccess,
            IdentityEvent::AuthRefreshError => EventKind::AuthRefreshError,
            IdentityEvent::AuthLogout => EventKind::AuthLogout,
        }
    }
}

pub type Listener = Arc<dyn Fn(&IdentityEvent) + Send + Sync>;

/// Handle returned by [`EventBus::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Register/unregister contract for lifecycle listeners.
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, EventKind, Listener)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&IdentityEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push((id, kind, Arc::new(listener)));
        }
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let Ok(mut listeners) = self.listeners.lock() else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(existing, _, _)| *existing != id);
        listeners.len() != before
    }

    pub fn emit(&self, event: &IdentityEvent) {
        let kind = event.kind();
        // Listeners run outside the lock so they may register or unregister.
        let matching: Vec<Listener> = match self.listeners.lock() {
            Ok(listeners) => listeners
                .iter()
                .filter(|(_, k, _)| *k == kind)
                .map(|(_, _, l)| l.clone())
                .collect(),
            Err(_) => return,
        };
        tracing::debug!(?kind, listeners = matching.len(), "identity event");
        for listener in matching {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }
}
