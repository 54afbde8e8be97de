//! Dataset normalizers.
//!
//! Each normalizer turns the raw records of one dataset into a typed
//! [`Table`](civic_core::Table): source columns are renamed, numbers parsed,
//! and coordinates turned into [`geo`] geometries on WGS84. Missing or
//! unparsable values become [`Cell::Null`](civic_core::Cell::Null); only a
//! missing identifier or an undecodable geometry payload fails a dataset.

mod complaints;
mod fields;
mod geometry;
mod rent_series;
mod trees;
mod zip_boundaries;

pub use complaints::{COMPLAINT_COLUMNS, ComplaintsNormalizer};
pub use geometry::{GeometryError, decode_geojson, in_wgs84_range, wgs84_point};
pub use rent_series::{RENT_SERIES_COLUMNS, RentSeriesNormalizer};
pub use trees::{TREE_COLUMNS, TreeNormalizer};
pub use zip_boundaries::{ZIP_BOUNDARY_COLUMNS, ZipBoundaryNormalizer};
