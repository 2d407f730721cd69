//! Client-held session state: the token store, the global invalidation
//! monitor, and the inventory of a user's active sessions.

pub mod inventory;
pub mod monitor;
pub mod store;

use secrecy::{ExposeSecret, SecretString};

/// Lifetime scope of the held session token.
///
/// `Durable` survives a restart of the embedding shell, `Ephemeral` does
/// not. The crate keeps the scope as metadata; persistence itself is
/// owned by the shell.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionScope {
    Durable,
    Ephemeral,
}

/// The single session a client context may hold.
#[derive(Clone, Debug)]
pub struct Session {
    token: SecretString,
    scope: SessionScope,
    identity: String,
}

impl Session {
    #[must_use]
    pub fn new(token: SecretString, scope: SessionScope, identity: String) -> Self {
        Self {
            token,
            scope,
            identity,
        }
    }

    /// The opaque bearer token. No shape validation is performed
    /// client-side.
    #[must_use]
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    #[must_use]
    pub fn scope(&self) -> SessionScope {
        self.scope
    }

    /// Email of the signed-in identity.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Exact string comparison against another token. Also how "this
    /// browser's own session" is identified among the server-reported
    /// records; there is no separate server-issued session id.
    #[must_use]
    pub fn matches_token(&self, other: &str) -> bool {
        self.token.expose_secret() == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_token_is_exact() {
        let session = Session::new(
            SecretString::from("abc123"),
            SessionScope::Durable,
            "user@custodia.dev".to_string(),
        );
        assert!(session.matches_token("abc123"));
        assert!(!session.matches_token("abc123 "));
        assert!(!session.matches_token("ABC123"));
    }
}
