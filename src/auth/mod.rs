//! Primary credential check and sign-out. A successful login either
//! yields a session token directly or signals that a second factor is
//! required, handing the caller a challenge context for
//! [`crate::mfa::challenge::MfaChallenge`].

use crate::core::Core;
use crate::error::{Error, Result};
use crate::mfa::challenge::MfaChallengeContext;
use crate::session::SessionScope;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: Option<String>,
    #[serde(default)]
    mfa_required: bool,
}

/// Outcome of the primary credential check.
pub enum LoginOutcome {
    /// A session was issued and written to the token store.
    SignedIn,
    /// The server requires a second factor before issuing a session.
    MfaRequired(MfaChallengeContext),
}

/// # Errors
/// `InvalidCredential` on a rejected password; otherwise per the crate
/// error taxonomy.
pub async fn login(
    core: &Core,
    email: &str,
    password: SecretString,
    scope: SessionScope,
) -> Result<LoginOutcome> {
    let request = LoginRequest {
        email,
        password: password.expose_secret(),
    };
    let response: LoginResponse = core.api.post_json("/v1/auth/login", &request).await?;

    if response.mfa_required {
        info!(identity = email, "second factor required");
        return Ok(LoginOutcome::MfaRequired(MfaChallengeContext::new(
            email.to_string(),
            password,
        )));
    }

    let token = response
        .token
        .ok_or_else(|| Error::Decode("login response carried no token".to_string()))?;
    core.install_session(SecretString::from(token), scope, email.to_string());
    info!(identity = email, "signed in");
    Ok(LoginOutcome::SignedIn)
}

/// Sign out: best-effort server-side session teardown, then an
/// unconditional local clear. A failed revoke call never leaves a stray
/// local token behind.
pub async fn logout(core: &Core) -> Result<()> {
    let result = core.api.post_empty("/v1/auth/logout").await;
    core.sign_out_local();
    // The local clear already happened; a server error is still surfaced.
    match result {
        Err(Error::SessionExpired) | Ok(()) => Ok(()),
        Err(err) => Err(err),
    }
}
