//! In-memory token store with two mutually exclusive lifetime slots.
//!
//! At most one session exists per client context: `write` clears both
//! slots before filling the requested one (last write wins across
//! scopes), and `clear` empties both unconditionally so a stray token in
//! the other scope cannot survive sign-out. The store is process-wide
//! shared state, so access is synchronized with a mutex.

use crate::session::{Session, SessionScope};
use secrecy::SecretString;
use std::sync::Mutex;

#[derive(Default)]
struct Slots {
    durable: Option<Session>,
    ephemeral: Option<Session>,
}

#[derive(Default)]
pub struct TokenStore {
    slots: Mutex<Slots>,
}

impl TokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently held session, if any.
    #[must_use]
    pub fn read(&self) -> Option<Session> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.durable.clone().or_else(|| slots.ephemeral.clone())
    }

    /// Store a new session, replacing whatever was held in either scope.
    pub fn write(&self, token: SecretString, scope: SessionScope, identity: String) {
        let session = Session::new(token, scope, identity);
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.durable = None;
        slots.ephemeral = None;
        match scope {
            SessionScope::Durable => slots.durable = Some(session),
            SessionScope::Ephemeral => slots.ephemeral = Some(session),
        }
    }

    /// Remove the session from both scopes unconditionally.
    pub fn clear(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.durable = None;
        slots.ephemeral = None;
    }

    /// True when the held token equals `token` exactly.
    #[must_use]
    pub fn matches_token(&self, token: &str) -> bool {
        self.read().is_some_and(|s| s.matches_token(token))
    }
}
