//! Ingestion settings shared by the fetcher and the collector.
//!
//! Loading these from files, environment variables or flags is the caller's
//! concern; [`IngestConfig`] only derives [`Deserialize`] so any serde format
//! can produce one.

use std::fmt;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::Deserialize;

use crate::fetch::RetryPolicy;
use crate::query::AppToken;

/// Records requested per page unless a collection overrides it.
pub const DEFAULT_PAGE_SIZE: u64 = 150_000;

/// Ceiling applied to record counts when debug sampling is switched on.
pub const DEFAULT_DEBUG_RECORD_CEILING: u64 = 100_000;

/// Per-attempt HTTP timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Directory used for cached responses when none is configured.
pub const DEFAULT_CACHE_DIR: &str = ".civic-cache";

/// HTTP Basic credentials.
///
/// The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Pair a username with its password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Settings for one ingestion session.
///
/// # Examples
/// ```
/// use civic_data::config::{Credentials, IngestConfig};
///
/// let config = IngestConfig::default()
///     .with_page_size(50_000)
///     .with_credentials(Credentials::new("analyst", "hunter2"))
///     .with_debug_sampling();
/// assert_eq!(config.page_size, 50_000);
/// assert_eq!(config.debug_record_ceiling, Some(100_000));
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Records requested per page.
    pub page_size: u64,
    /// Upper bound on records collected per dataset, when set.
    pub debug_record_ceiling: Option<u64>,
    /// Credentials attached to every request.
    pub credentials: Option<Credentials>,
    /// Whether page queries carry the application token.
    pub use_token: bool,
    /// Application token injected when `use_token` is set.
    pub app_token: Option<AppToken>,
    /// Retry behaviour of the fetcher.
    pub retry: RetryPolicy,
    /// Per-attempt HTTP timeout in milliseconds.
    pub timeout_ms: u64,
    /// Directory holding cached responses.
    pub cache_dir: Utf8PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            debug_record_ceiling: None,
            credentials: None,
            use_token: false,
            app_token: None,
            retry: RetryPolicy::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            cache_dir: Utf8PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

impl IngestConfig {
    /// Set the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Cap every collection at `ceiling` records.
    #[must_use]
    pub fn with_record_ceiling(mut self, ceiling: u64) -> Self {
        self.debug_record_ceiling = Some(ceiling);
        self
    }

    /// Cap every collection at [`DEFAULT_DEBUG_RECORD_CEILING`] records.
    #[must_use]
    pub fn with_debug_sampling(self) -> Self {
        self.with_record_ceiling(DEFAULT_DEBUG_RECORD_CEILING)
    }

    /// Attach HTTP Basic credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Configure the application token and enable its injection.
    #[must_use]
    pub fn with_app_token(mut self, token: AppToken) -> Self {
        self.app_token = Some(token);
        self.use_token = true;
        self
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the per-attempt timeout, kept to millisecond precision.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, cache_dir: impl Into<Utf8PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Per-attempt timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_match_documented_values() {
        let config = IngestConfig::default();
        assert_eq!(config.page_size, 150_000);
        assert_eq!(config.debug_record_ceiling, None);
        assert!(!config.use_token);
        assert_eq!(config.retry.max_attempts, 6);
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[rstest]
    fn password_is_redacted() {
        let rendered = format!("{:?}", Credentials::new("analyst", "hunter2"));
        assert!(rendered.contains("analyst"));
        assert!(!rendered.contains("hunter2"));
    }

    #[rstest]
    fn app_token_enables_injection() {
        let config = IngestConfig::default().with_app_token(AppToken::new("t"));
        assert!(config.use_token);
        assert_eq!(config.app_token, Some(AppToken::new("t")));
    }

    #[rstest]
    fn sub_second_timeouts_are_kept() {
        let config = IngestConfig::default().with_timeout(Duration::from_millis(500));
        assert_eq!(config.timeout_ms, 500);
        assert_eq!(config.timeout(), Duration::from_millis(500));
    }

    #[rstest]
    fn deserializes_partial_documents() {
        let config: IngestConfig = serde_json::from_str(
            r#"{
                "page_size": 10,
                "credentials": {"username": "u", "password": "p"},
                "retry": {"max_attempts": 2, "backoff": {"kind": "fixed", "delay_ms": 5}}
            }"#,
        )
        .expect("config should parse");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.credentials, Some(Credentials::new("u", "p")));
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.cache_dir, Utf8PathBuf::from(DEFAULT_CACHE_DIR));
    }
}
