//! Facade crate for the civic open-data ingestion engine.
//!
//! This crate re-exports the core record and table types and, behind the
//! default `http` feature, the cached, paginated ingestion pipeline.

#![forbid(unsafe_code)]

pub use civic_core::{
    Cell, FieldValue, NormalizeError, Normalizer, RawRecord, Table, TableError, WGS84,
};

#[cfg(feature = "http")]
pub use civic_data::{
    AppToken, Backoff, CacheError, CacheKey, CollectError, CollectionRequest, Credentials,
    DatasetSpec, FetchCache, FetchError, HttpTransport, IngestConfig, IngestError,
    PaginatedCollector, QueryError, QuerySpec, ResilientFetcher, RetryOn, RetryPolicy,
    SetupError, Transport, build_query, ingest,
};

#[cfg(feature = "http")]
pub use civic_data::normalize::{
    ComplaintsNormalizer, RentSeriesNormalizer, TreeNormalizer, ZipBoundaryNormalizer,
};
