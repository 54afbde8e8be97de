//! Dataset-specific conversion from raw rows to typed tables.
//!
//! The ingestion engine hands the complete record sequence of one dataset to
//! a [`Normalizer`] and makes no assumptions about its internals beyond the
//! [`RawRecord`] to [`Table`] contract.

use thiserror::Error;

use crate::{RawRecord, Table, TableError};

/// Errors reported while normalizing a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum NormalizeError {
    /// A required field was missing or held an unusable value.
    #[error("record {index}: field `{field}` {problem}")]
    Field {
        /// Position of the offending record in the input sequence.
        index: usize,
        /// Source field name.
        field: String,
        /// Short description of what was wrong.
        problem: String,
    },
    /// An embedded geometry payload could not be decoded.
    #[error("record {index}: invalid geometry: {message}")]
    Geometry {
        /// Position of the offending record in the input sequence.
        index: usize,
        /// Decoder message.
        message: String,
    },
    /// The normalizer produced a malformed row.
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Convert the raw rows of one dataset into a typed table.
///
/// Records are moved into the normalizer; the caller keeps no copy.
///
/// # Examples
///
/// ```
/// use civic_core::{Cell, NormalizeError, Normalizer, RawRecord, Table};
///
/// struct Boroughs;
///
/// impl Normalizer for Boroughs {
///     fn name(&self) -> &str {
///         "boroughs"
///     }
///
///     fn normalize(&self, records: Vec<RawRecord>) -> Result<Table, NormalizeError> {
///         let mut table = Table::new(["borough"]);
///         for record in &records {
///             table.push_row(vec![Cell::from(record.text("borough"))])?;
///         }
///         Ok(table)
///     }
/// }
///
/// let rows = vec![[("borough", "BRONX")].into_iter().collect::<RawRecord>()];
/// let table = Boroughs.normalize(rows)?;
/// assert_eq!(table.len(), 1);
/// # Ok::<(), NormalizeError>(())
/// ```
pub trait Normalizer {
    /// Short dataset name used in log messages.
    fn name(&self) -> &str;

    /// Produce the cleaned table for `records`.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError`] when a record cannot be represented in the
    /// output schema.
    fn normalize(&self, records: Vec<RawRecord>) -> Result<Table, NormalizeError>;
}

impl<N: Normalizer + ?Sized> Normalizer for &N {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn normalize(&self, records: Vec<RawRecord>) -> Result<Table, NormalizeError> {
        (**self).normalize(records)
    }
}
