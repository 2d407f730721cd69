//! Login-time second-factor verification, distinct from enrollment.
//!
//! The context carries the identity and password proof between the
//! primary credential check and the OTP submission. A rejected code
//! keeps the context for resubmission; a 404 means the server-side
//! challenge expired and the caller must restart the primary login.

use crate::core::Core;
use crate::error::{Error, Result};
use crate::mfa::types::{ChallengeRequest, TokenResponse};
use crate::session::SessionScope;
use secrecy::{ExposeSecret, SecretString};
use std::env::consts;
use std::sync::Arc;
use tracing::info;

/// Carried between the primary credential check and OTP submission.
/// Discarded on success or on an expiry signal from the server.
pub struct MfaChallengeContext {
    identity: String,
    password_proof: SecretString,
}

impl MfaChallengeContext {
    #[must_use]
    pub fn new(identity: String, password_proof: SecretString) -> Self {
        Self {
            identity,
            password_proof,
        }
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }
}

pub struct MfaChallenge {
    core: Arc<Core>,
    context: Option<MfaChallengeContext>,
    scope: SessionScope,
}

impl MfaChallenge {
    #[must_use]
    pub fn new(core: Arc<Core>, context: MfaChallengeContext, scope: SessionScope) -> Self {
        Self {
            core,
            context: Some(context),
            scope,
        }
    }

    /// Whether the carried context is still usable for a submission.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.context.is_some()
    }

    /// Submit the one-time code. On success the issued session is
    /// written to the token store and the context is consumed. 401
    /// retains the context so the user can resubmit; 404 drops it and
    /// surfaces [`Error::ContextExpired`].
    ///
    /// # Errors
    /// `FlowState` once the context is consumed or expired,
    /// `InvalidCredential` for a rejected code, `ContextExpired` when
    /// the challenge lapsed; otherwise per the crate taxonomy.
    pub async fn submit(&mut self, code: &str) -> Result<()> {
        let Some(context) = self.context.as_ref() else {
            return Err(Error::FlowState(
                "challenge already completed or expired".to_string(),
            ));
        };

        let metadata = device_metadata();
        let request = ChallengeRequest {
            email: &context.identity,
            otp: code,
            password: context.password_proof.expose_secret(),
            metadata: &metadata,
        };

        match self
            .core
            .api
            .post_json::<_, TokenResponse>("/v1/auth/mfa/challenge", &request)
            .await
        {
            Ok(response) => {
                let identity = context.identity.clone();
                self.core.install_session(
                    SecretString::from(response.token),
                    self.scope,
                    identity.clone(),
                );
                self.context = None;
                info!(identity, "second factor accepted, signed in");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                self.context = None;
                Err(Error::ContextExpired)
            }
            // InvalidCredential and everything else leave the context in
            // place for a resubmission.
            Err(err) => Err(err),
        }
    }
}

/// Coarse device description sent with the challenge, mirrored into the
/// server's session records.
fn device_metadata() -> String {
    format!("{} {}", consts::OS, consts::ARCH)
}

#[cfg(test)]
mod tests {
    use super::device_metadata;

    #[test]
    fn device_metadata_is_nonempty() {
        assert!(!device_metadata().trim().is_empty());
    }
}
