use civic_core::{Cell, NormalizeError, Normalizer, RawRecord, Table, WGS84};

use super::fields;

/// Output columns, in order.
pub const COMPLAINT_COLUMNS: [&str; 7] = [
    "id",
    "created_at",
    "complaint_type",
    "descriptor",
    "zipcode",
    "borough",
    "geometry",
];

/// Cleans 311 service requests into point features.
///
/// `unique_key` is required; every other column degrades to null.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplaintsNormalizer;

impl Normalizer for ComplaintsNormalizer {
    fn name(&self) -> &str {
        "complaints_311"
    }

    fn normalize(&self, records: Vec<RawRecord>) -> Result<Table, NormalizeError> {
        let mut table = Table::new(COMPLAINT_COLUMNS).with_crs(WGS84);
        for (index, record) in records.into_iter().enumerate() {
            let id = fields::required_id(&record, index, "unique_key")?;
            table.push_row(vec![
                Cell::Integer(id),
                fields::text(&record, "created_date"),
                fields::text(&record, "complaint_type"),
                fields::text(&record, "descriptor"),
                fields::code(&record, "incident_zip"),
                fields::text(&record, "borough"),
                fields::point(&record, "longitude", "latitude"),
            ])?;
        }
        Ok(table)
    }
}
