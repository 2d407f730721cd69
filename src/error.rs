//! Error taxonomy for the session core.
//!
//! Only [`Error::SessionExpired`] crosses component boundaries: it is
//! raised by the invalidation monitor and forces a global state reset.
//! Every other variant is handled at the call site that issued the
//! request and reported to the user without touching shared session
//! state. No operation retries write-type calls; the notification
//! channel reconnect loop is the only retry path in the crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// 406 anywhere: the current credential is no longer valid.
    #[error("session expired")]
    SessionExpired,
    /// 401: locally recoverable, the user may retry.
    #[error("invalid credential")]
    InvalidCredential,
    /// 404 on an MFA or challenge flow: restart the originating flow.
    #[error("challenge context expired")]
    ContextExpired,
    /// 400/409: surfaced verbatim, no retry.
    #[error("validation failed: {0}")]
    Validation(String),
    /// 5xx and unexpected statuses: generic failure, no retry.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    /// An operation was invoked in a state that does not allow it.
    #[error("invalid flow state: {0}")]
    FlowState(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    /// Pub/sub transport failure; bounded by the channel reconnect loop.
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Map an HTTP status plus sanitized body to the taxonomy.
    ///
    /// 406 never reaches this point; the invalidation monitor intercepts
    /// it first. 404 maps to [`Error::Server`] here because only the MFA
    /// flows may interpret it as an expired context.
    pub(crate) fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => Self::InvalidCredential,
            400 | 409 => Self::Validation(message),
            _ => Self::Server { status, message },
        }
    }

    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, Self::Server { status: 404, .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
