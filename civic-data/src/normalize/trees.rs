use civic_core::{Cell, NormalizeError, Normalizer, RawRecord, Table, WGS84};

use super::fields;

/// Output columns, in order.
pub const TREE_COLUMNS: [&str; 7] = [
    "id",
    "created_at",
    "diameter",
    "health",
    "species",
    "zipcode",
    "geometry",
];

/// Cleans the street-tree census into point features.
///
/// `tree_dbh` (trunk diameter at breast height, in inches) becomes the
/// floating-point `diameter` column.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeNormalizer;

impl Normalizer for TreeNormalizer {
    fn name(&self) -> &str {
        "street_trees"
    }

    fn normalize(&self, records: Vec<RawRecord>) -> Result<Table, NormalizeError> {
        let mut table = Table::new(TREE_COLUMNS).with_crs(WGS84);
        for (index, record) in records.into_iter().enumerate() {
            let id = fields::required_id(&record, index, "tree_id")?;
            table.push_row(vec![
                Cell::Integer(id),
                fields::text(&record, "created_at"),
                fields::float(&record, "tree_dbh"),
                fields::text(&record, "health"),
                fields::text(&record, "spc_common"),
                fields::code(&record, "zipcode"),
                fields::point(&record, "longitude", "latitude"),
            ])?;
        }
        Ok(table)
    }
}
