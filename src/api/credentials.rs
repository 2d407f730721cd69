//! Credential routing for outgoing requests.
//!
//! An ordered prefix table decides whether a request carries the fixed
//! administrative Basic pair, the user's bearer token, or nothing. The
//! first matching prefix wins; the admin rule is ordered first so
//! admin-plane calls stay isolated from user-plane calls regardless of
//! the token store contents. Precedence between genuinely overlapping
//! prefixes beyond rule order is an open design question and is kept
//! as observed.

use crate::config::AdminCredential;
use crate::session::store::TokenStore;
use base64ct::{Base64, Encoding};
use secrecy::ExposeSecret;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CredentialKind {
    None,
    Bearer,
    FixedBasic,
}

#[derive(Clone, Debug)]
pub struct PolicyRule {
    pub prefix: String,
    pub kind: CredentialKind,
}

/// Ordered, first-match-wins credential policy. Static configuration;
/// never mutated at runtime.
#[derive(Clone, Debug)]
pub struct CredentialPolicy {
    rules: Vec<PolicyRule>,
}

impl CredentialPolicy {
    #[must_use]
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self { rules }
    }

    /// The dashboard's policy table: admin plane on Basic, user
    /// management and session/MFA self-service on Bearer, everything
    /// else anonymous.
    #[must_use]
    pub fn standard() -> Self {
        let rule = |prefix: &str, kind| PolicyRule {
            prefix: prefix.to_string(),
            kind,
        };
        Self::new(vec![
            rule("/v1/admin", CredentialKind::FixedBasic),
            rule("/v1/users", CredentialKind::Bearer),
            rule("/v1/auth/me", CredentialKind::Bearer),
            rule("/v1/auth/sessions", CredentialKind::Bearer),
            rule("/v1/auth/mfa", CredentialKind::Bearer),
        ])
    }

    /// Resolve a request path to a credential kind.
    #[must_use]
    pub fn resolve(&self, path: &str) -> CredentialKind {
        self.rules
            .iter()
            .find(|rule| path.starts_with(&rule.prefix))
            .map_or(CredentialKind::None, |rule| rule.kind)
    }
}

/// Computes the `Authorization` header for a request, consulting the
/// token store at request-build time. A read here can race a concurrent
/// sign-out; that is accepted as eventual consistency.
#[derive(Clone)]
pub struct CredentialRouter {
    policy: CredentialPolicy,
    store: Arc<TokenStore>,
    admin: Option<AdminCredential>,
}

impl CredentialRouter {
    #[must_use]
    pub fn new(
        policy: CredentialPolicy,
        store: Arc<TokenStore>,
        admin: Option<AdminCredential>,
    ) -> Self {
        Self {
            policy,
            store,
            admin,
        }
    }

    /// The header value to attach, or `None` to omit the header. An
    /// empty or placeholder credential is never attached: a Bearer rule
    /// with an empty store and a FixedBasic rule with no configured pair
    /// both resolve to no header.
    #[must_use]
    pub fn authorization(&self, path: &str) -> Option<String> {
        match self.policy.resolve(path) {
            CredentialKind::None => None,
            CredentialKind::Bearer => self
                .store
                .read()
                .map(|session| format!("Bearer {}", session.token().expose_secret())),
            CredentialKind::FixedBasic => self.admin.as_ref().map(|admin| {
                let pair = format!("{}:{}", admin.id, admin.secret.expose_secret());
                format!("Basic {}", Base64::encode_string(pair.as_bytes()))
            }),
        }
    }
}
