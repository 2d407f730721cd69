//! Real-time notification channel: a per-identity publish/subscribe
//! connection to the message broker over WebSocket.

pub mod channel;
pub mod wire;

pub use channel::{ChannelEvent, ChannelState, NotificationChannel};
pub use wire::{Envelope, Notification};
