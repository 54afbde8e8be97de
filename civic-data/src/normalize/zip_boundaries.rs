use civic_core::{NormalizeError, Normalizer, RawRecord, Table, WGS84};

use super::fields;

/// Output columns, in order.
pub const ZIP_BOUNDARY_COLUMNS: [&str; 4] = ["zipcode", "label", "population", "geometry"];

/// Cleans modified zip-code tabulation areas into polygon features.
///
/// The `the_geom` column holds a GeoJSON `Polygon` or `MultiPolygon`.
/// Undecodable geometries fail the dataset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipBoundaryNormalizer;

impl Normalizer for ZipBoundaryNormalizer {
    fn name(&self) -> &str {
        "zip_boundaries"
    }

    fn normalize(&self, records: Vec<RawRecord>) -> Result<Table, NormalizeError> {
        let mut table = Table::new(ZIP_BOUNDARY_COLUMNS).with_crs(WGS84);
        for (index, record) in records.into_iter().enumerate() {
            table.push_row(vec![
                fields::code(&record, "modzcta"),
                fields::text(&record, "label"),
                fields::integer(&record, "pop_est"),
                fields::geojson(&record, index, "the_geom")?,
            ])?;
        }
        Ok(table)
    }
}
