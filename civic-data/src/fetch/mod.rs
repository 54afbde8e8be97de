//! Cache-first HTTP GET with bounded retries.
//!
//! [`ResilientFetcher`] consults the [`FetchCache`](crate::cache::FetchCache)
//! before touching the network, retries failed attempts according to a
//! [`RetryPolicy`], and stores successful bodies. The network itself sits
//! behind the synchronous [`Transport`] trait: [`HttpTransport`] is the
//! production implementation and [`test_support::StubTransport`] the
//! scripted one.

mod fetcher;
mod http;
mod retry;
mod transport;

#[doc(hidden)]
pub mod test_support;

pub use fetcher::{FetchError, Fetched, Origin, ResilientFetcher};
pub use http::{DEFAULT_USER_AGENT, HttpTransport, HttpTransportConfig, TransportBuildError};
pub use retry::{AttemptFailure, Backoff, DEFAULT_MAX_ATTEMPTS, RetryOn, RetryPolicy};
pub use transport::{HttpRequest, HttpResponse, Transport, TransportError};
