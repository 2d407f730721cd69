//! The explicitly constructed core context. One `Core` is built at
//! process start and shared by reference with every consumer; there are
//! no session-state singletons. It wires the token store, the credential
//! router, the API client, the invalidation monitor, and the
//! notification channel together.

use crate::api::ApiClient;
use crate::api::credentials::{CredentialPolicy, CredentialRouter};
use crate::config::AppConfig;
use crate::error::Result;
use crate::notify::NotificationChannel;
use crate::session::SessionScope;
use crate::session::monitor::InvalidationMonitor;
use crate::session::store::TokenStore;
use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Session-level events consumed by the embedding UI. `Expired` carries
/// the "show one notice, navigate to login" obligation; the UI dismisses
/// any prior notice before showing a new one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionEvent {
    Expired,
    SignedOut,
}

/// Broadcast fan-out for [`SessionEvent`]s. Sending without receivers is
/// harmless.
#[derive(Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn send(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Core {
    pub config: Arc<AppConfig>,
    pub store: Arc<TokenStore>,
    pub events: SessionEvents,
    pub monitor: Arc<InvalidationMonitor>,
    pub api: ApiClient,
    pub channel: NotificationChannel,
}

impl Core {
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: AppConfig) -> Result<Self> {
        let config = Arc::new(config);
        let store = Arc::new(TokenStore::new());
        let events = SessionEvents::new();
        let monitor = Arc::new(InvalidationMonitor::new(store.clone(), events.clone()));
        let router = CredentialRouter::new(
            CredentialPolicy::standard(),
            store.clone(),
            config.admin_credential.clone(),
        );
        let api = ApiClient::new(&config, router, monitor.clone())?;
        let channel = NotificationChannel::new(config.clone(), store.clone());

        Ok(Self {
            config,
            store,
            events,
            monitor,
            api,
            channel,
        })
    }

    /// Store a freshly issued session token and re-arm the invalidation
    /// monitor so a later 406 can fire again.
    pub fn install_session(&self, token: SecretString, scope: SessionScope, identity: String) {
        self.store.write(token, scope, identity);
        self.monitor.rearm();
    }

    /// Drop local session state and tell the UI to return to login. The
    /// notification channel is torn down as well since no identity
    /// remains.
    pub fn sign_out_local(&self) {
        self.channel.disconnect();
        self.store.clear();
        self.events.send(SessionEvent::SignedOut);
    }
}
