//! Global session-invalidation handling.
//!
//! A 406 response on any request means the held credential is no longer
//! acceptable. The monitor clears the token store and broadcasts a single
//! `SessionEvent::Expired` so the UI can show one notice and navigate to
//! login. The trip guard makes the sequence effectively-once: N in-flight
//! requests all receiving 406 produce one clear and one event. A new
//! sign-in re-arms the guard.

use crate::core::{SessionEvent, SessionEvents};
use crate::session::store::TokenStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// The distinguished invalidation status.
pub const INVALIDATION_STATUS: u16 = 406;

pub struct InvalidationMonitor {
    store: Arc<TokenStore>,
    events: SessionEvents,
    tripped: AtomicBool,
}

impl InvalidationMonitor {
    #[must_use]
    pub fn new(store: Arc<TokenStore>, events: SessionEvents) -> Self {
        Self {
            store,
            events,
            tripped: AtomicBool::new(false),
        }
    }

    /// Inspect an inbound response status. Returns `true` when the status
    /// is the invalidation signal, whether or not this call performed the
    /// reset.
    pub fn on_status(&self, status: u16) -> bool {
        if status != INVALIDATION_STATUS {
            return false;
        }
        if self.tripped.swap(true, Ordering::SeqCst) {
            // Another in-flight response already ran the reset.
            return true;
        }
        warn!("session invalidated by server, clearing credentials");
        self.store.clear();
        self.events.send(SessionEvent::Expired);
        true
    }

    /// Allow a future invalidation to fire again, called when a new
    /// session token is written.
    pub fn rearm(&self) {
        self.tripped.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionScope;
    use secrecy::SecretString;

    fn monitor() -> (Arc<TokenStore>, SessionEvents, InvalidationMonitor) {
        let store = Arc::new(TokenStore::new());
        let events = SessionEvents::new();
        let monitor = InvalidationMonitor::new(store.clone(), events.clone());
        (store, events, monitor)
    }

    #[test]
    fn ignores_other_statuses() {
        let (_store, events, monitor) = monitor();
        let mut rx = events.subscribe();
        assert!(!monitor.on_status(200));
        assert!(!monitor.on_status(401));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn trips_once_for_concurrent_signals() {
        let (store, events, monitor) = monitor();
        store.write(
            SecretString::from("tok"),
            SessionScope::Durable,
            "a@custodia.dev".to_string(),
        );
        let mut rx = events.subscribe();

        assert!(monitor.on_status(406));
        assert!(monitor.on_status(406));
        assert!(monitor.on_status(406));

        assert!(store.read().is_none());
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Expired)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn rearm_allows_a_later_invalidation() {
        let (store, events, monitor) = monitor();
        let mut rx = events.subscribe();

        assert!(monitor.on_status(406));
        monitor.rearm();
        store.write(
            SecretString::from("tok2"),
            SessionScope::Ephemeral,
            "a@custodia.dev".to_string(),
        );
        assert!(monitor.on_status(406));

        assert!(store.read().is_none());
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Expired)));
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Expired)));
    }
}
