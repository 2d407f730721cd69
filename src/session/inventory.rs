//! Inventory of a user's active sessions: list with "this session"
//! identification and selective revocation.

use crate::core::Core;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A server-reported active session, used only for display and
/// revocation. `is_current` is derived locally by comparing `token`
/// against the held session token.
#[derive(Clone, Debug, Deserialize)]
pub struct SessionRecord {
    pub email: String,
    pub token: String,
    /// ISO-8601 timestamp; lexicographic order is chronological order.
    pub login_time: String,
    pub device_info: String,
    pub ip_address: String,
    pub location: String,
    #[serde(skip)]
    pub is_current: bool,
}

#[derive(Serialize)]
struct RevokeRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct RevokeResponse {
    #[allow(dead_code)]
    message: String,
}

/// Fetch the active sessions, with the record matching the local token
/// first and the rest ordered by recency descending.
///
/// # Errors
/// Fails per the crate error taxonomy; local state is never touched on
/// failure.
pub async fn list(core: &Core) -> Result<Vec<SessionRecord>> {
    let mut records: Vec<SessionRecord> = core.api.get_json("/v1/auth/sessions").await?;
    for record in &mut records {
        record.is_current = core.store.matches_token(&record.token);
    }
    sort_records(&mut records);
    Ok(records)
}

/// Current session first, then recency descending.
fn sort_records(records: &mut [SessionRecord]) {
    records.sort_by(|a, b| {
        b.is_current
            .cmp(&a.is_current)
            .then_with(|| b.login_time.cmp(&a.login_time))
    });
}

/// Revoke a single session by token. Revoking the session this client
/// holds performs a full local sign-out; revoking any other session
/// never touches the token store. No implicit retry.
///
/// # Errors
/// Fails per the crate error taxonomy; on failure local state is left
/// untouched.
pub async fn revoke(core: &Core, token: &str) -> Result<()> {
    let request = RevokeRequest { token };
    let _: RevokeResponse = core
        .api
        .post_json("/v1/auth/sessions/revoke", &request)
        .await?;

    if core.store.matches_token(token) {
        info!("revoked this client's own session, signing out");
        core.sign_out_local();
    }
    Ok(())
}
