//! Runtime configuration for the session core. Values come from the
//! environment with explicit defaults so deployments can repoint the
//! client without rebuilding. The admin credential is optional; when it
//! is absent, admin-plane requests go out without authorization rather
//! than falling back to a user token.

use secrecy::SecretString;
use std::env;
use std::time::Duration;

/// Default request timeout applied to all HTTP calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Base delay for the notification channel reconnect backoff.
pub const RECONNECT_BASE_DELAY: Duration = Duration::from_millis(500);
/// Cap for the reconnect backoff.
pub const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(8);
/// Consecutive reconnect attempts before the channel gives up.
pub const RECONNECT_MAX_ATTEMPTS: u32 = 5;

/// Fixed administrative identity pair, independent of any user session.
#[derive(Clone, Debug)]
pub struct AdminCredential {
    pub id: String,
    pub secret: SecretString,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_base_url: String,
    pub ws_base_url: String,
    pub admin_credential: Option<AdminCredential>,
    pub request_timeout: Duration,
    pub reconnect_base_delay: Duration,
    pub reconnect_max_delay: Duration,
    pub reconnect_max_attempts: u32,
}

impl AppConfig {
    /// Build a config with default timeouts and reconnect policy.
    #[must_use]
    pub fn new(
        api_base_url: String,
        ws_base_url: Option<String>,
        admin_credential: Option<AdminCredential>,
    ) -> Self {
        let api_base_url = normalize_base_url(&api_base_url);
        let ws_base_url = match ws_base_url {
            Some(url) => normalize_base_url(&url),
            None => ws_url_from_api(&api_base_url),
        };
        Self {
            api_base_url,
            ws_base_url,
            admin_credential,
            request_timeout: DEFAULT_TIMEOUT,
            reconnect_base_delay: RECONNECT_BASE_DELAY,
            reconnect_max_delay: RECONNECT_MAX_DELAY,
            reconnect_max_attempts: RECONNECT_MAX_ATTEMPTS,
        }
    }

    /// Load config from `CUSTODIA_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let api_base_url =
            read_env("CUSTODIA_API_URL").unwrap_or_else(|| "http://localhost:8080".to_string());
        let ws_base_url = read_env("CUSTODIA_WS_URL");
        let admin_credential = match (
            read_env("CUSTODIA_ADMIN_ID"),
            read_env("CUSTODIA_ADMIN_SECRET"),
        ) {
            (Some(id), Some(secret)) => Some(AdminCredential {
                id,
                secret: SecretString::from(secret),
            }),
            _ => None,
        };

        Self::new(api_base_url, ws_base_url, admin_credential)
    }
}

fn read_env(name: &str) -> Option<String> {
    let value = env::var(name).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Derive the WebSocket base URL from the HTTP base URL.
fn ws_url_from_api(api_base_url: &str) -> String {
    if api_base_url.starts_with("https://") {
        api_base_url.replacen("https://", "wss://", 1)
    } else {
        api_base_url.replacen("http://", "ws://", 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn new_normalizes_and_derives_ws_url() {
        let config = AppConfig::new("https://api.custodia.dev/".to_string(), None, None);
        assert_eq!(config.api_base_url, "https://api.custodia.dev");
        assert_eq!(config.ws_base_url, "wss://api.custodia.dev");
        assert!(config.admin_credential.is_none());
        assert_eq!(config.request_timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn new_prefers_explicit_ws_url() {
        let config = AppConfig::new(
            "http://localhost:8080".to_string(),
            Some("ws://localhost:9090/".to_string()),
            None,
        );
        assert_eq!(config.ws_base_url, "ws://localhost:9090");
    }

    #[test]
    fn from_env_reads_admin_pair() {
        temp_env::with_vars(
            [
                ("CUSTODIA_API_URL", Some("http://localhost:9999")),
                ("CUSTODIA_WS_URL", None),
                ("CUSTODIA_ADMIN_ID", Some("ops")),
                ("CUSTODIA_ADMIN_SECRET", Some("hunter2")),
            ],
            || {
                let config = AppConfig::from_env();
                assert_eq!(config.api_base_url, "http://localhost:9999");
                assert_eq!(config.ws_base_url, "ws://localhost:9999");
                let admin = config.admin_credential.expect("admin pair");
                assert_eq!(admin.id, "ops");
                assert_eq!(admin.secret.expose_secret(), "hunter2");
            },
        );
    }

    #[test]
    fn from_env_ignores_partial_admin_pair() {
        temp_env::with_vars(
            [
                ("CUSTODIA_API_URL", Some("http://localhost:9999")),
                ("CUSTODIA_ADMIN_ID", Some("ops")),
                ("CUSTODIA_ADMIN_SECRET", None),
            ],
            || {
                let config = AppConfig::from_env();
                assert!(config.admin_credential.is_none());
            },
        );
    }

    #[test]
    fn from_env_treats_blank_as_unset() {
        temp_env::with_vars([("CUSTODIA_API_URL", Some("   "))], || {
            let config = AppConfig::from_env();
            assert_eq!(config.api_base_url, "http://localhost:8080");
        });
    }
}
