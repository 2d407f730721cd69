//! Request and response payloads for the MFA endpoints. These carry OTP
//! secrets and password proofs, so they must never be logged.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize)]
pub struct TotpSetupResponse {
    pub otp_auth_url: String,
    pub qr_url: String,
    pub secret: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct VerifyRequest<'a> {
    pub code: &'a str,
}

#[derive(Serialize)]
pub struct ChallengeRequest<'a> {
    pub email: &'a str,
    pub otp: &'a str,
    pub password: &'a str,
    pub metadata: &'a str,
}

#[derive(Deserialize)]
pub struct TokenResponse {
    pub token: String,
}
