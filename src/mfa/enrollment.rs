//! TOTP enrollment state machine.
//!
//! `Initial -> AwaitingScan -> AwaitingCode -> Initial(enabled)`. The
//! issued secret material is transient: it lives only while the flow is
//! in progress and is dropped on success or cancel. A rejected code
//! keeps the flow in `AwaitingCode` so the user can retry.

use crate::core::Core;
use crate::error::{Error, Result};
use crate::mfa::is_valid_code;
use crate::mfa::types::{TotpSetupResponse, VerifyRequest};
use std::sync::Arc;
use tracing::info;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EnrollmentState {
    Initial,
    AwaitingScan,
    AwaitingCode,
}

/// Secret material shown to the user while enrolling.
#[derive(Clone, Debug)]
pub struct TotpSecret {
    pub secret: String,
    pub otp_auth_url: String,
    pub qr_url: String,
}

pub struct MfaEnrollment {
    core: Arc<Core>,
    state: EnrollmentState,
    secret: Option<TotpSecret>,
    enabled: bool,
}

impl MfaEnrollment {
    #[must_use]
    pub fn new(core: Arc<Core>, enabled: bool) -> Self {
        Self {
            core,
            state: EnrollmentState::Initial,
            secret: None,
            enabled,
        }
    }

    #[must_use]
    pub fn state(&self) -> EnrollmentState {
        self.state
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Secret material for display, present from `AwaitingScan` until
    /// the flow completes or is cancelled.
    #[must_use]
    pub fn secret(&self) -> Option<&TotpSecret> {
        self.secret.as_ref()
    }

    /// Request secret material and move to `AwaitingScan`.
    ///
    /// # Errors
    /// `FlowState` outside `Initial`; otherwise per the crate taxonomy.
    pub async fn begin(&mut self) -> Result<TotpSecret> {
        if self.state != EnrollmentState::Initial {
            return Err(Error::FlowState(
                "enrollment already in progress".to_string(),
            ));
        }

        let response: TotpSetupResponse = self
            .core
            .api
            .post_empty_json("/v1/auth/mfa/totp/setup")
            .await?;
        let secret = TotpSecret {
            secret: response.secret,
            otp_auth_url: response.otp_auth_url,
            qr_url: response.qr_url,
        };
        self.secret = Some(secret.clone());
        self.state = EnrollmentState::AwaitingScan;
        Ok(secret)
    }

    /// User confirmed scanning the QR code; no network call.
    ///
    /// # Errors
    /// `FlowState` outside `AwaitingScan`.
    pub fn proceed_to_verify(&mut self) -> Result<()> {
        if self.state != EnrollmentState::AwaitingScan {
            return Err(Error::FlowState("nothing to verify yet".to_string()));
        }
        self.state = EnrollmentState::AwaitingCode;
        Ok(())
    }

    /// Submit the verification code. A code that is not exactly six
    /// digits is rejected locally with no network call. 401 keeps the
    /// flow in `AwaitingCode` for a retry; success returns the flow to
    /// `Initial` with MFA enabled and drops the secret material.
    ///
    /// # Errors
    /// `FlowState` outside `AwaitingCode`, `Validation` for a malformed
    /// code, `InvalidCredential` for a rejected one; otherwise per the
    /// crate taxonomy.
    pub async fn submit_code(&mut self, code: &str) -> Result<()> {
        if self.state != EnrollmentState::AwaitingCode {
            return Err(Error::FlowState("no code is expected".to_string()));
        }
        if !is_valid_code(code) {
            return Err(Error::Validation(
                "code must be exactly six digits".to_string(),
            ));
        }

        let request = VerifyRequest { code };
        // Any failure leaves the state untouched so the user can retry.
        self.core
            .api
            .post_json_unit("/v1/auth/mfa/totp/verify", &request)
            .await?;

        self.state = EnrollmentState::Initial;
        self.secret = None;
        self.enabled = true;
        info!("second factor enabled");
        Ok(())
    }

    /// Abandon an in-progress enrollment, dropping the secret material.
    pub fn cancel(&mut self) {
        self.state = EnrollmentState::Initial;
        self.secret = None;
    }

    /// Disable the second factor. Flips the enabled flag in place
    /// without reloading any other state.
    ///
    /// # Errors
    /// `FlowState` when MFA is not enabled; otherwise per the crate
    /// taxonomy.
    pub async fn disable(&mut self) -> Result<()> {
        if !self.enabled {
            return Err(Error::FlowState("second factor is not enabled".to_string()));
        }
        self.core
            .api
            .post_empty("/v1/auth/mfa/totp/disable")
            .await?;
        self.enabled = false;
        info!("second factor disabled");
        Ok(())
    }
}
