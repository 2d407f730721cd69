//! TOTP second-factor flows: enrollment (secret issuance, code
//! verification, enable/disable) and the login-time challenge.

pub mod challenge;
pub mod enrollment;
pub mod types;

/// Client-side precondition for enrollment verification: a TOTP code is
/// exactly six ASCII digits. Anything else is rejected locally with no
/// network call.
#[must_use]
pub fn is_valid_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}
