//! Connection state machine for the per-identity notification channel.
//!
//! `Disconnected -> Connecting -> Connected -> (Error -> Connecting via
//! retry) -> Disconnected` on explicit teardown. The channel connects
//! only while an identity is known, subscribes to the identity-scoped
//! topic, and keeps received notifications in reverse-chronological
//! order. Reconnection is a cancellable task with bounded attempts and
//! exponential backoff plus jitter; teardown cancels everything.

use crate::config::AppConfig;
use crate::notify::wire::{
    ClientFrame, Envelope, Notification, ServerFrame, identity_topic, publish_destination,
};
use crate::session::store::TokenStore;
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use secrecy::ExposeSecret;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Live channel events for consumers that render as they arrive.
#[derive(Clone, Debug)]
pub enum ChannelEvent {
    Connected,
    Notification(Notification),
    TransportError(String),
}

struct Inner {
    state: ChannelState,
    topic: Option<String>,
    notifications: VecDeque<Notification>,
    outbound: Option<mpsc::UnboundedSender<ClientFrame>>,
    cancel: Option<CancellationToken>,
    attempt: u32,
    // Bumped on every connect(); lets a stale task detect that a newer
    // connection owns the shared fields.
    generation: u64,
}

#[derive(Clone)]
pub struct NotificationChannel {
    config: Arc<AppConfig>,
    store: Arc<TokenStore>,
    inner: Arc<Mutex<Inner>>,
    events: broadcast::Sender<ChannelEvent>,
}

impl NotificationChannel {
    #[must_use]
    pub fn new(config: Arc<AppConfig>, store: Arc<TokenStore>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            config,
            store,
            inner: Arc::new(Mutex::new(Inner {
                state: ChannelState::Disconnected,
                topic: None,
                notifications: VecDeque::new(),
                outbound: None,
                cancel: None,
                attempt: 0,
                generation: 0,
            })),
            events,
        }
    }

    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.lock().state
    }

    #[must_use]
    pub fn subscribed_topic(&self) -> Option<String> {
        self.lock().topic.clone()
    }

    /// Received notifications, most recent first.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.iter().cloned().collect()
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }

    /// Open the channel for the signed-in identity. A no-op while the
    /// channel is already Connecting or Connected, while a connection
    /// task (including its backoff timer) is still alive, or when no
    /// identity is known.
    pub fn connect(&self) {
        let Some(session) = self.store.read() else {
            debug!("notification channel not started: no identity");
            return;
        };
        let identity = session.identity().to_string();

        let (cancel, outbound_rx, generation) = {
            let mut inner = self.lock();
            if matches!(
                inner.state,
                ChannelState::Connecting | ChannelState::Connected
            ) || inner.cancel.is_some()
            {
                return;
            }
            inner.state = ChannelState::Connecting;
            inner.generation += 1;
            inner.attempt = 0;
            let cancel = CancellationToken::new();
            let (tx, rx) = mpsc::unbounded_channel();
            inner.cancel = Some(cancel.clone());
            inner.outbound = Some(tx);
            (cancel, rx, inner.generation)
        };

        let channel = self.clone();
        tokio::spawn(async move {
            channel.run(identity, cancel, outbound_rx, generation).await;
        });
    }

    /// Publish a message to a named destination. Valid only while
    /// Connected with a known identity; returns whether a send was
    /// attempted.
    pub fn publish(&self, destination: &str, message: &str) -> bool {
        let Some(session) = self.store.read() else {
            return false;
        };
        let inner = self.lock();
        if inner.state != ChannelState::Connected {
            return false;
        }
        let Some(tx) = inner.outbound.as_ref() else {
            return false;
        };
        let envelope = Envelope::text(
            session.identity(),
            message,
            session.token().expose_secret(),
        );
        tx.send(ClientFrame::Send {
            destination: publish_destination(destination),
            body: envelope,
        })
        .is_ok()
    }

    /// Tear the channel down: cancel the connection task and any pending
    /// reconnect, close the transport, return to Disconnected. Safe to
    /// call any number of times.
    pub fn disconnect(&self) {
        let mut inner = self.lock();
        if let Some(cancel) = inner.cancel.take() {
            cancel.cancel();
        }
        inner.outbound = None;
        inner.topic = None;
        inner.attempt = 0;
        inner.state = ChannelState::Disconnected;
    }

    async fn run(
        &self,
        identity: String,
        cancel: CancellationToken,
        mut outbound_rx: mpsc::UnboundedReceiver<ClientFrame>,
        generation: u64,
    ) {
        let ws_url = format!("{}/ws", self.config.ws_base_url.trim_end_matches('/'));
        let topic = identity_topic(&identity);

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match connect_async(ws_url.as_str()).await {
                Ok((stream, _)) => {
                    {
                        let mut inner = self.lock();
                        if inner.generation != generation {
                            return;
                        }
                        inner.state = ChannelState::Connected;
                        inner.topic = Some(topic.clone());
                        inner.attempt = 0;
                    }
                    let _ = self.events.send(ChannelEvent::Connected);

                    let (mut write, mut read) = stream.split();
                    let mut healthy = true;

                    let subscribe = ClientFrame::Subscribe {
                        destination: topic.clone(),
                    };
                    match serde_json::to_string(&subscribe) {
                        Ok(text) => {
                            if write.send(Message::Text(text)).await.is_err() {
                                healthy = false;
                            }
                        }
                        Err(err) => {
                            warn!("failed to encode subscribe frame: {err}");
                            healthy = false;
                        }
                    }

                    while healthy {
                        tokio::select! {
                            () = cancel.cancelled() => {
                                let _ = write.close().await;
                                self.finalize(generation);
                                return;
                            }
                            frame = outbound_rx.recv() => {
                                match frame.and_then(|f| serde_json::to_string(&f).ok()) {
                                    Some(text) => {
                                        if write.send(Message::Text(text)).await.is_err() {
                                            healthy = false;
                                        }
                                    }
                                    None => healthy = false,
                                }
                            }
                            msg = read.next() => {
                                match msg {
                                    Some(Ok(Message::Text(text))) => self.handle_inbound(&text),
                                    Some(Ok(_)) => {} // Ignore binary, ping, pong.
                                    Some(Err(err)) => {
                                        debug!("notification transport error: {err}");
                                        let _ = self.events.send(
                                            ChannelEvent::TransportError(err.to_string()),
                                        );
                                        healthy = false;
                                    }
                                    None => healthy = false, // Stream ended.
                                }
                            }
                        }
                    }

                    let mut inner = self.lock();
                    if inner.generation != generation {
                        return;
                    }
                    inner.state = ChannelState::Error;
                    inner.topic = None;
                }
                Err(err) => {
                    debug!("notification connect failed: {err}");
                    let _ = self
                        .events
                        .send(ChannelEvent::TransportError(err.to_string()));
                    let mut inner = self.lock();
                    if inner.generation != generation {
                        return;
                    }
                    inner.state = ChannelState::Error;
                }
            }

            if cancel.is_cancelled() {
                break;
            }

            // Bounded reconnect with exponential backoff and jitter.
            let attempt = {
                let mut inner = self.lock();
                if inner.generation != generation {
                    return;
                }
                inner.attempt += 1;
                inner.attempt
            };
            if attempt > self.config.reconnect_max_attempts {
                warn!(
                    attempts = self.config.reconnect_max_attempts,
                    "giving up on notification reconnect"
                );
                let mut inner = self.lock();
                if inner.generation == generation {
                    inner.cancel = None;
                    inner.outbound = None;
                }
                return;
            }
            let delay = backoff_delay(
                attempt,
                self.config.reconnect_base_delay,
                self.config.reconnect_max_delay,
            );
            debug!(attempt, ?delay, "scheduling notification reconnect");
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
            {
                let mut inner = self.lock();
                if inner.generation != generation {
                    return;
                }
                inner.state = ChannelState::Connecting;
            }
        }

        self.finalize(generation);
    }

    /// Parse an inbound broker message and prepend it to the
    /// notification sequence (reverse-chronological display order).
    fn handle_inbound(&self, text: &str) {
        let Ok(frame) = serde_json::from_str::<ServerFrame>(text) else {
            debug!("ignoring unparseable broker message");
            return;
        };
        let notification = Notification {
            destination: frame.destination,
            body: frame.body,
        };
        self.lock().notifications.push_front(notification.clone());
        let _ = self
            .events
            .send(ChannelEvent::Notification(notification));
    }

    /// Reset shared fields after a cancelled task, unless a newer
    /// connection has taken over.
    fn finalize(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        inner.state = ChannelState::Disconnected;
        inner.topic = None;
        inner.outbound = None;
        inner.cancel = None;
        inner.attempt = 0;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Exponential backoff capped at `max`, with ±25% jitter.
fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let doubled = base.saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)));
    let capped = doubled.min(max);
    let jitter = rand::thread_rng().gen_range(0.75..=1.25);
    capped.mul_f64(jitter)
}
