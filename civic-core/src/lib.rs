//! Core domain types for civic open-data ingestion.
//!
//! Remote sources deliver untyped rows ([`RawRecord`]) whose values belong to
//! a small closed set of scalars ([`FieldValue`]). Dataset-specific
//! [`Normalizer`] implementations turn those rows into typed,
//! geometry-bearing [`Table`] values.
//!
//! This crate performs no I/O; fetching, caching and pagination live in
//! `civic-data`.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod normalizer;
pub mod record;
pub mod table;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use normalizer::{NormalizeError, Normalizer};
pub use record::{FieldValue, RawRecord};
pub use table::{Cell, Table, TableError, WGS84};
