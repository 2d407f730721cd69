//! HTTP helper layer shared by every feature client. Centralizes URL
//! building, the request timeout, credential decoration, request ids,
//! span instrumentation, and the mapping from response statuses to the
//! error taxonomy. Every response status passes through the invalidation
//! monitor before any other handling.

pub mod credentials;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::session::monitor::InvalidationMonitor;
use credentials::CredentialRouter;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, info_span};
use ulid::Ulid;

/// Maximum number of error body characters surfaced to the user.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    timeout: Duration,
    router: CredentialRouter,
    monitor: Arc<InvalidationMonitor>,
}

impl ApiClient {
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        config: &AppConfig,
        router: CredentialRouter,
        monitor: Arc<InvalidationMonitor>,
    ) -> Result<Self> {
        let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let http = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            timeout: config.request_timeout,
            router,
            monitor,
        })
    }

    /// # Errors
    /// Fails per the crate error taxonomy.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, None::<&()>).await?;
        response.json::<T>().await.map_err(Error::from)
    }

    /// # Errors
    /// Fails per the crate error taxonomy.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(Method::POST, path, Some(body)).await?;
        response.json::<T>().await.map_err(Error::from)
    }

    /// POST expecting no response body of interest.
    ///
    /// # Errors
    /// Fails per the crate error taxonomy.
    pub async fn post_json_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        self.send(Method::POST, path, Some(body)).await?;
        Ok(())
    }

    /// POST with an empty body, used for sign-out style endpoints.
    ///
    /// # Errors
    /// Fails per the crate error taxonomy.
    pub async fn post_empty(&self, path: &str) -> Result<()> {
        self.send(Method::POST, path, None::<&()>).await?;
        Ok(())
    }

    /// POST with an empty body, parsing a JSON response.
    ///
    /// # Errors
    /// Fails per the crate error taxonomy.
    pub async fn post_empty_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::POST, path, None::<&()>).await?;
        response.json::<T>().await.map_err(Error::from)
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response> {
        let url = self.url(path);
        let span = info_span!(
            "api.request",
            http.method = %method,
            url = %url
        );

        let mut request = self
            .http
            .request(method, &url)
            .timeout(self.timeout)
            .header("x-request-id", Ulid::new().to_string());

        // Credential is resolved from the store at request-build time.
        if let Some(value) = self.router.authorization(path) {
            request = request.header(AUTHORIZATION, value);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().instrument(span).await?;
        let status = response.status();

        if self.monitor.on_status(status.as_u16()) {
            return Err(Error::SessionExpired);
        }
        if status.is_success() {
            return Ok(response);
        }

        let message = sanitize_body(response.text().await.unwrap_or_default());
        debug!(%url, status = status.as_u16(), "request failed");
        Err(Error::from_status(status.as_u16(), message))
    }

    fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", base, path.trim_start_matches('/'))
        }
    }
}

/// Trim and truncate an error body for user-facing messages.
fn sanitize_body(body: String) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "request failed".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
