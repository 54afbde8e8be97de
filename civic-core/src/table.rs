//! Typed, geometry-bearing tables produced by normalizers.

use geo::Geometry;
use thiserror::Error;

/// Identifier for longitude/latitude coordinates on the WGS84 datum.
pub const WGS84: &str = "EPSG:4326";

/// A typed cell within a [`Table`] row.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cell {
    /// Missing or unusable source value.
    Null,
    /// Free-form text.
    Text(String),
    /// Whole number.
    Integer(i64),
    /// Floating-point measurement.
    Float(f64),
    /// Spatial feature in the table's coordinate reference system.
    Geometry(Geometry<f64>),
}

impl Cell {
    /// Return `true` for [`Cell::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the geometry of a [`Cell::Geometry`] cell.
    #[must_use]
    pub const fn as_geometry(&self) -> Option<&Geometry<f64>> {
        match self {
            Self::Geometry(geometry) => Some(geometry),
            _ => None,
        }
    }
}

impl From<Option<&str>> for Cell {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Self::Null, |text| Self::Text(text.to_owned()))
    }
}

impl From<Option<i64>> for Cell {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::Null, Self::Integer)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Null, Self::Float)
    }
}

impl From<Option<Geometry<f64>>> for Cell {
    fn from(value: Option<Geometry<f64>>) -> Self {
        value.map_or(Self::Null, Self::Geometry)
    }
}

/// Errors raised while assembling a [`Table`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// A row did not provide exactly one cell per column.
    #[error("row has {actual} cells but the table has {expected} columns")]
    RowWidth {
        /// Number of declared columns.
        expected: usize,
        /// Number of cells supplied.
        actual: usize,
    },
}

/// Column-oriented description with row-major storage.
///
/// Every row holds exactly one cell per column; [`Table::push_row`] enforces
/// this.
///
/// # Examples
///
/// ```
/// use civic_core::{Cell, Table};
///
/// # fn main() -> Result<(), civic_core::TableError> {
/// let mut table = Table::new(["zipcode", "population"]);
/// table.push_row(vec![Cell::Text("11201".into()), Cell::Integer(62_823)])?;
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.column_index("population"), Some(1));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
    crs: Option<String>,
}

impl Table {
    /// Create an empty table with the given column names.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            crs: None,
        }
    }

    /// Record the coordinate reference system of geometry columns.
    #[must_use]
    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    /// Append a row.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::RowWidth`] when the row length differs from the
    /// column count.
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of `name` among the columns.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// All rows in insertion order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Cell at `row` within column `name`.
    #[must_use]
    pub fn cell(&self, row: usize, name: &str) -> Option<&Cell> {
        let column = self.column_index(name)?;
        self.rows.get(row)?.get(column)
    }

    /// Coordinate reference system, when the table carries geometry.
    #[must_use]
    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Return `true` when the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Geometry, Point};
    use rstest::rstest;

    #[rstest]
    fn rejects_rows_of_the_wrong_width() {
        let mut table = Table::new(["a", "b"]);
        let err = table
            .push_row(vec![Cell::Null])
            .expect_err("short row must be rejected");
        assert_eq!(
            err,
            TableError::RowWidth {
                expected: 2,
                actual: 1
            }
        );
        assert!(table.is_empty());
    }

    #[rstest]
    fn looks_up_cells_by_column_name() {
        let mut table = Table::new(["id", "geometry"]).with_crs(WGS84);
        let point = Geometry::Point(Point::new(-73.95, 40.7));
        table
            .push_row(vec![Cell::Integer(1), Cell::Geometry(point.clone())])
            .expect("row fits");
        assert_eq!(table.cell(0, "id"), Some(&Cell::Integer(1)));
        assert_eq!(
            table.cell(0, "geometry").and_then(Cell::as_geometry),
            Some(&point)
        );
        assert_eq!(table.cell(1, "id"), None);
        assert_eq!(table.cell(0, "missing"), None);
        assert_eq!(table.crs(), Some(WGS84));
    }

    #[rstest]
    fn optional_values_become_null_cells() {
        assert_eq!(Cell::from(None::<i64>), Cell::Null);
        assert_eq!(Cell::from(Some("x")), Cell::Text("x".to_owned()));
        assert_eq!(Cell::from(Some(2.5)), Cell::Float(2.5));
    }
}
