//! Data access and ingestion for civic open-data portals.
//!
//! Responsibilities:
//! - Build deterministic query URLs for offset-paginated endpoints.
//! - Fetch them through a content-addressed response cache with bounded
//!   retries.
//! - Collect complete datasets with the count-then-page protocol.
//! - Normalize raw records into typed, geometry-bearing tables.
//!
//! Boundaries:
//! - Do not load configuration or credentials from files or the
//!   environment; callers hand in an [`IngestConfig`].
//! - Do not persist tables; callers own what happens after normalization.
//!
//! Invariants:
//! - A cache entry is either absent or holds a complete response body.
//! - A collection never holds more records than the endpoint reported.
//! - No global mutable state.

#![forbid(unsafe_code)]

pub mod cache;
pub mod collect;
pub mod config;
pub mod datasets;
pub mod fetch;
pub mod normalize;
pub mod query;

pub use cache::{CacheError, CacheKey, FetchCache};
pub use collect::{CollectError, CollectionRequest, PaginatedCollector, SetupError};
pub use config::{Credentials, IngestConfig};
pub use datasets::{DatasetSpec, IngestError, ingest};
pub use fetch::{
    Backoff, FetchError, HttpTransport, ResilientFetcher, RetryOn, RetryPolicy, Transport,
};
pub use query::{AppToken, QueryError, QuerySpec, build_query};
