//! The single seam between the fetcher and the network.

use thiserror::Error;

use crate::config::Credentials;

/// One authenticated GET request.
#[derive(Debug, Clone, Copy)]
pub struct HttpRequest<'a> {
    /// Fully built request URL.
    pub url: &'a str,
    /// HTTP Basic credentials attached to the request, if any.
    pub credentials: Option<&'a Credentials>,
}

/// A response that reached the client, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Construct a response from its parts.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failures where no response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// Connection, DNS or body-read failure.
    #[error("network error contacting {url}: {message}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// Transport message.
        message: String,
    },
    /// The attempt exceeded its time budget.
    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout {
        /// Fully qualified request URL.
        url: String,
        /// Configured per-attempt timeout in milliseconds.
        timeout_ms: u64,
    },
}

/// Blocking HTTP GET.
///
/// Implementations return `Ok` for every response that arrives, whatever
/// its status; classifying statuses is the fetcher's job.
pub trait Transport {
    /// Perform one GET attempt.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response was received.
    fn get(&self, request: &HttpRequest<'_>) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, request: &HttpRequest<'_>) -> Result<HttpResponse, TransportError> {
        (**self).get(request)
    }
}
