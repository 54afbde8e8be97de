use std::thread;

use log::{debug, warn};
use thiserror::Error;

use crate::cache::{CacheKey, FetchCache};
use crate::config::{Credentials, IngestConfig};

use super::retry::{AttemptFailure, RetryPolicy};
use super::transport::{HttpRequest, Transport};

/// Errors surfaced by [`ResilientFetcher`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    /// Every attempt failed.
    #[error("giving up on {url} after {attempts} attempts")]
    Exhausted {
        /// Requested URL.
        url: String,
        /// Attempts made.
        attempts: u32,
        /// Failure observed by the final attempt.
        #[source]
        last_failure: AttemptFailure,
    },
    /// The retry policy declined to retry a failure.
    #[error("request to {url} was rejected")]
    Rejected {
        /// Requested URL.
        url: String,
        /// The non-retryable failure.
        #[source]
        failure: AttemptFailure,
    },
}

/// Where a fetched body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Served from an existing cache entry.
    Cache,
    /// Downloaded during this call.
    Network,
}

/// A body together with its [`Origin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// Raw response body.
    pub body: Vec<u8>,
    /// Where the body came from.
    pub origin: Origin,
}

/// Cache-first GET with bounded retries.
///
/// A successful network body is written to the cache before it is returned;
/// a failed fetch leaves the cache untouched.
///
/// # Examples
/// ```
/// use civic_data::cache::FetchCache;
/// use civic_data::fetch::{ResilientFetcher, test_support::StubTransport};
///
/// let dir = tempfile::tempdir()?;
/// let root = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
///     .map_err(|_| "non-UTF-8 temp dir")?;
/// let transport = StubTransport::new();
/// transport.respond("https://example.org/a.json?", 200, "[]");
/// let fetcher = ResilientFetcher::new(&transport, FetchCache::open(root)?);
///
/// assert_eq!(fetcher.fetch("https://example.org/a.json?", false)?, b"[]");
/// assert_eq!(fetcher.fetch("https://example.org/a.json?", false)?, b"[]");
/// assert_eq!(transport.calls_to("https://example.org/a.json?"), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct ResilientFetcher<T> {
    transport: T,
    cache: FetchCache,
    credentials: Option<Credentials>,
    policy: RetryPolicy,
}

impl<T: Transport> ResilientFetcher<T> {
    /// Fetch through `cache` with the default policy and no credentials.
    pub fn new(transport: T, cache: FetchCache) -> Self {
        Self {
            transport,
            cache,
            credentials: None,
            policy: RetryPolicy::default(),
        }
    }

    /// Take credentials and retry policy from `config`.
    pub fn from_config(transport: T, cache: FetchCache, config: &IngestConfig) -> Self {
        Self {
            transport,
            cache,
            credentials: config.credentials.clone(),
            policy: config.retry,
        }
    }

    /// Attach HTTP Basic credentials to every attempt.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Backing cache.
    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Return the body for `url`, from the cache unless `force_refresh`.
    ///
    /// # Errors
    ///
    /// See [`ResilientFetcher::fetch_with_origin`].
    pub fn fetch(&self, url: &str, force_refresh: bool) -> Result<Vec<u8>, FetchError> {
        self.fetch_with_origin(url, force_refresh)
            .map(|fetched| fetched.body)
    }

    /// Like [`ResilientFetcher::fetch`], also reporting where the body came
    /// from.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Exhausted`] when every attempt fails and
    /// [`FetchError::Rejected`] when the policy refuses to retry a failure.
    /// A downloaded body that cannot be stored is still returned; the
    /// failed write is logged.
    pub fn fetch_with_origin(&self, url: &str, force_refresh: bool) -> Result<Fetched, FetchError> {
        let key = CacheKey::for_url(url);
        if !force_refresh {
            if let Some(body) = self.cache.read(&key) {
                return Ok(Fetched {
                    body,
                    origin: Origin::Cache,
                });
            }
        }

        let body = self.download(url)?;
        if let Err(err) = self.cache.write(&key, &body) {
            warn!("keeping {url} uncached: {err}");
        }
        Ok(Fetched {
            body,
            origin: Origin::Network,
        })
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let attempts = self.policy.attempts();
        let request = HttpRequest {
            url,
            credentials: self.credentials.as_ref(),
        };
        let mut attempt = 1;
        loop {
            debug!("GET {url} (attempt {attempt}/{attempts})");
            let failure = match self.transport.get(&request) {
                Ok(response) if response.is_success() => return Ok(response.body),
                Ok(response) => AttemptFailure::upstream(response.status, &response.body),
                Err(err) => AttemptFailure::Transport(err),
            };
            warn!("attempt {attempt}/{attempts} for {url} failed: {failure}");

            if !self.policy.retry_on.should_retry(&failure) {
                return Err(FetchError::Rejected {
                    url: url.to_owned(),
                    failure,
                });
            }
            if attempt >= attempts {
                return Err(FetchError::Exhausted {
                    url: url.to_owned(),
                    attempts,
                    last_failure: failure,
                });
            }
            let delay = self.policy.backoff.delay(attempt);
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            attempt += 1;
        }
    }
}
