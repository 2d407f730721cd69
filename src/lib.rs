//! Session and real-time notification core for the Custodia dashboard.
//!
//! This crate owns the client-side protocol state the dashboard UI builds
//! on: which credential an outgoing request carries, how the client reacts
//! to a server-issued session-invalidation signal, the pub/sub channel that
//! delivers notifications for the signed-in identity, the inventory of a
//! user's active sessions, and the TOTP enrollment and challenge state
//! machines. Rendering and navigation are owned by the embedding UI, which
//! consumes [`SessionEvent`]s and channel events instead.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod mfa;
pub mod notify;
pub mod session;

pub use config::AppConfig;
pub use core::{Core, SessionEvent, SessionEvents};
pub use error::{Error, Result};
pub use session::{Session, SessionScope};
