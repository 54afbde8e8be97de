//! Test utilities for the fetch layer.
//!
//! [`StubTransport`] replays scripted outcomes per URL without touching the
//! network and records every request it receives.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use super::transport::{HttpRequest, HttpResponse, Transport, TransportError};

type Outcome = Result<HttpResponse, TransportError>;

/// A request observed by [`StubTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Requested URL.
    pub url: String,
    /// Basic-auth username, when credentials were attached.
    pub username: Option<String>,
}

/// Scripted [`Transport`].
///
/// Outcomes queued for a URL are served in order, one per call. A URL with
/// no outcomes left answers with a network error.
///
/// # Example
///
/// ```
/// use civic_data::fetch::{HttpRequest, Transport, test_support::StubTransport};
///
/// let stub = StubTransport::new();
/// stub.fail_network("https://example.org/x?", 1);
/// stub.respond("https://example.org/x?", 200, "[]");
///
/// let request = HttpRequest { url: "https://example.org/x?", credentials: None };
/// assert!(stub.get(&request).is_err());
/// assert_eq!(stub.get(&request).map(|r| r.body), Ok(b"[]".to_vec()));
/// assert_eq!(stub.calls_to("https://example.org/x?"), 2);
/// ```
#[derive(Debug, Default)]
pub struct StubTransport {
    scripts: RefCell<HashMap<String, VecDeque<Outcome>>>,
    requests: RefCell<Vec<RecordedRequest>>,
}

impl StubTransport {
    /// Create a stub with nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `url`.
    pub fn respond(&self, url: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.push(url, Ok(HttpResponse::new(status, body)));
    }

    /// Queue `count` network failures for `url`.
    pub fn fail_network(&self, url: &str, count: usize) {
        for _ in 0..count {
            self.push(
                url,
                Err(TransportError::Network {
                    url: url.to_owned(),
                    message: "connection reset by peer".to_owned(),
                }),
            );
        }
    }

    /// Queue a timeout for `url`.
    pub fn fail_timeout(&self, url: &str) {
        self.push(
            url,
            Err(TransportError::Timeout {
                url: url.to_owned(),
                timeout_ms: 60_000,
            }),
        );
    }

    /// Number of calls made for `url`.
    pub fn calls_to(&self, url: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|request| request.url == url)
            .count()
    }

    /// Total number of calls.
    pub fn total_calls(&self) -> usize {
        self.requests.borrow().len()
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }

    fn push(&self, url: &str, outcome: Outcome) {
        self.scripts
            .borrow_mut()
            .entry(url.to_owned())
            .or_default()
            .push_back(outcome);
    }
}

impl Transport for StubTransport {
    fn get(&self, request: &HttpRequest<'_>) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(RecordedRequest {
            url: request.url.to_owned(),
            username: request
                .credentials
                .map(|credentials| credentials.username.clone()),
        });
        self.scripts
            .borrow_mut()
            .get_mut(request.url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(TransportError::Network {
                    url: request.url.to_owned(),
                    message: "no scripted response".to_owned(),
                })
            })
    }
}
