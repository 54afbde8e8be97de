//! Blocking [`Transport`] over an async `reqwest` client.
//!
//! Each GET runs on a private `current_thread` runtime, except when the
//! caller already sits on a multi-threaded Tokio runtime: there the request
//! is driven on the caller's handle under
//! [`tokio::task::block_in_place`].

use std::time::Duration;

use log::debug;
use reqwest::Client;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

use crate::config::{DEFAULT_TIMEOUT_MS, IngestConfig};

use super::transport::{HttpRequest, HttpResponse, Transport, TransportError};

/// Default user agent for data portal requests.
pub const DEFAULT_USER_AGENT: &str = "civic-ingest/0.1";

/// Error raised while constructing an [`HttpTransport`].
#[derive(Debug, Error)]
pub enum TransportBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Per-attempt timeout, covering connect and body transfer.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpTransportConfig {
    /// Derive transport settings from an ingestion config.
    pub fn from_ingest(config: &IngestConfig) -> Self {
        Self::default().with_timeout(config.timeout())
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Production transport.
///
/// Every response that arrives is returned as an [`HttpResponse`], including
/// error statuses; only missing responses become [`TransportError`]s.
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
    runtime: Runtime,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("timeout", &self.config.timeout)
            .field("user_agent", &self.config.user_agent)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Transport with the default timeout and user agent.
    ///
    /// # Errors
    ///
    /// See [`HttpTransport::with_config`].
    pub fn new() -> Result<Self, TransportBuildError> {
        Self::with_config(HttpTransportConfig::default())
    }

    /// Transport applying `config` to every attempt.
    ///
    /// # Errors
    ///
    /// Returns [`TransportBuildError`] when the client or the private
    /// runtime cannot be created.
    pub fn with_config(config: HttpTransportConfig) -> Result<Self, TransportBuildError> {
        Ok(Self {
            client: portal_client(&config)?,
            runtime: tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(TransportBuildError::Runtime)?,
            config,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    async fn get_async(&self, request: &HttpRequest<'_>) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.get(request.url);
        if let Some(credentials) = request.credentials {
            builder = builder.basic_auth(&credentials.username, Some(&credentials.password));
        }
        let response = builder
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, request.url))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, request.url))?;
        debug!("GET {} -> {status} ({} bytes)", request.url, body.len());
        Ok(HttpResponse::new(status, body.to_vec()))
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout {
                url: url.to_owned(),
                timeout_ms: u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX),
            };
        }
        TransportError::Network {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

fn portal_client(config: &HttpTransportConfig) -> Result<Client, TransportBuildError> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(config.timeout)
        .timeout(config.timeout)
        .build()
        .map_err(TransportBuildError::HttpClient)
}

fn ambient_multi_thread_handle() -> Option<Handle> {
    Handle::try_current()
        .ok()
        .filter(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
}

impl Transport for HttpTransport {
    fn get(&self, request: &HttpRequest<'_>) -> Result<HttpResponse, TransportError> {
        let future = self.get_async(request);
        if let Some(handle) = ambient_multi_thread_handle() {
            return tokio::task::block_in_place(|| handle.block_on(future));
        }
        self.runtime.block_on(future)
    }
}
