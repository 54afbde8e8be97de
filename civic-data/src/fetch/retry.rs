//! Retry classification and pacing for the resilient fetcher.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use super::transport::TransportError;

/// Attempts made per fetch unless configured otherwise.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;

/// Longest upstream body kept on an [`AttemptFailure`].
const BODY_PREVIEW_LIMIT: usize = 512;

/// What a single failed attempt observed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AttemptFailure {
    /// No response arrived.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The server answered with a non-success status.
    #[error("upstream returned HTTP {status}: {body}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Leading part of the response body, lossily decoded.
        body: String,
    },
}

impl AttemptFailure {
    /// Build an upstream failure, keeping a bounded preview of `body`.
    pub fn upstream(status: u16, body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body);
        let body = match text.char_indices().nth(BODY_PREVIEW_LIMIT) {
            Some((cut, _)) => format!("{}…", &text[..cut]),
            None => text.into_owned(),
        };
        Self::Upstream { status, body }
    }

    /// Whether the failure is one a later attempt can plausibly fix:
    /// transport trouble, 5xx, 408 or 429.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Upstream { status, .. } => *status >= 500 || matches!(status, 408 | 429),
        }
    }
}

/// Which failures trigger another attempt.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryOn {
    /// Retry every failure, whatever its status.
    #[default]
    AnyFailure,
    /// Retry only [`AttemptFailure::is_transient`] failures.
    TransientOnly,
    /// Retry when the predicate returns `true`.
    #[serde(skip)]
    Custom(fn(&AttemptFailure) -> bool),
}

impl RetryOn {
    /// Decide whether `failure` warrants another attempt.
    pub fn should_retry(&self, failure: &AttemptFailure) -> bool {
        match self {
            Self::AnyFailure => true,
            Self::TransientOnly => failure.is_transient(),
            Self::Custom(predicate) => predicate(failure),
        }
    }
}

/// Pause inserted between attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Retry immediately.
    #[default]
    None,
    /// Wait the same time before every retry.
    Fixed {
        /// Delay in milliseconds.
        delay_ms: u64,
    },
    /// Double the delay after every retry, up to `max_ms`.
    Exponential {
        /// Delay before the first retry, in milliseconds.
        initial_ms: u64,
        /// Upper bound on any single delay, in milliseconds.
        max_ms: u64,
    },
}

impl Backoff {
    /// Delay to wait after the `failed_attempts`-th failure (1-based).
    pub fn delay(&self, failed_attempts: u32) -> Duration {
        match *self {
            Self::None => Duration::ZERO,
            Self::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Self::Exponential { initial_ms, max_ms } => {
                let shift = failed_attempts.saturating_sub(1).min(63);
                let factor = 1_u64.checked_shl(shift).unwrap_or(u64::MAX);
                Duration::from_millis(initial_ms.saturating_mul(factor).min(max_ms))
            }
        }
    }
}

/// Bounded retry behaviour for one fetch.
///
/// # Examples
/// ```
/// use civic_data::fetch::{Backoff, RetryOn, RetryPolicy};
///
/// let policy = RetryPolicy::default()
///     .with_max_attempts(3)
///     .with_retry_on(RetryOn::TransientOnly)
///     .with_backoff(Backoff::Fixed { delay_ms: 250 });
/// assert_eq!(policy.attempts(), 3);
/// ```
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Failures that trigger another attempt.
    pub retry_on: RetryOn,
    /// Pause between attempts.
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_on: RetryOn::default(),
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    /// Set the attempt budget.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the retry predicate.
    #[must_use]
    pub fn with_retry_on(mut self, retry_on: RetryOn) -> Self {
        self.retry_on = retry_on;
        self
    }

    /// Set the pause between attempts.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Effective attempt budget, never below one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn network() -> AttemptFailure {
        AttemptFailure::Transport(TransportError::Network {
            url: "https://example.org".to_owned(),
            message: "connection reset".to_owned(),
        })
    }

    #[rstest]
    #[case(500, true)]
    #[case(503, true)]
    #[case(429, true)]
    #[case(408, true)]
    #[case(400, false)]
    #[case(403, false)]
    #[case(404, false)]
    fn statuses_classify_as_transient(#[case] status: u16, #[case] transient: bool) {
        assert_eq!(AttemptFailure::upstream(status, b"").is_transient(), transient);
    }

    #[rstest]
    fn transport_failures_are_transient() {
        assert!(network().is_transient());
    }

    #[rstest]
    fn default_policy_retries_everything() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts(), 6);
        assert!(policy.retry_on.should_retry(&AttemptFailure::upstream(404, b"")));
        assert!(policy.retry_on.should_retry(&network()));
    }

    #[rstest]
    fn custom_predicate_is_consulted() {
        fn only_server_errors(failure: &AttemptFailure) -> bool {
            matches!(failure, AttemptFailure::Upstream { status, .. } if *status >= 500)
        }
        let retry_on = RetryOn::Custom(only_server_errors);
        assert!(retry_on.should_retry(&AttemptFailure::upstream(502, b"")));
        assert!(!retry_on.should_retry(&network()));
    }

    #[rstest]
    fn zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::default().with_max_attempts(0).attempts(), 1);
    }

    #[rstest]
    #[case(Backoff::None, 3, 0)]
    #[case(Backoff::Fixed { delay_ms: 200 }, 4, 200)]
    #[case(Backoff::Exponential { initial_ms: 100, max_ms: 1_000 }, 1, 100)]
    #[case(Backoff::Exponential { initial_ms: 100, max_ms: 1_000 }, 3, 400)]
    #[case(Backoff::Exponential { initial_ms: 100, max_ms: 1_000 }, 5, 1_000)]
    #[case(Backoff::Exponential { initial_ms: 100, max_ms: 1_000 }, 90, 1_000)]
    fn backoff_delays(#[case] backoff: Backoff, #[case] failures: u32, #[case] expected_ms: u64) {
        assert_eq!(backoff.delay(failures), Duration::from_millis(expected_ms));
    }

    #[rstest]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(2_000);
        let AttemptFailure::Upstream { body: preview, .. } =
            AttemptFailure::upstream(500, body.as_bytes())
        else {
            panic!("expected upstream failure");
        };
        assert_eq!(preview.chars().count(), BODY_PREVIEW_LIMIT + 1);
    }

    #[rstest]
    fn policy_deserializes_with_defaults() {
        let policy: RetryPolicy =
            serde_json::from_str(r#"{"retry_on": "transient_only"}"#).expect("policy parses");
        assert_eq!(policy.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert!(matches!(policy.retry_on, RetryOn::TransientOnly));
        assert_eq!(policy.backoff, Backoff::None);
    }
}
