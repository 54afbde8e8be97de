use civic_core::{Cell, FieldValue, NormalizeError, Normalizer, RawRecord, Table};

use super::fields;

/// Output columns, in order.
pub const RENT_SERIES_COLUMNS: [&str; 5] = ["area", "borough", "area_type", "month", "rent"];

const AREA_FIELD: &str = "areaName";

/// Reshapes a wide monthly rent series into one row per area and month.
///
/// Input rows carry `areaName`, `Borough`, `areaType` and one column per
/// month named `YYYY-MM`. Output rows follow input order, then month order.
/// Months without a usable figure are kept with a null `rent`. Columns that
/// are neither descriptors nor months are ignored. The table has no
/// geometry and therefore no CRS.
///
/// # Examples
/// ```
/// use civic_core::{Cell, Normalizer, RawRecord};
/// use civic_data::normalize::RentSeriesNormalizer;
///
/// let record: RawRecord = [
///     ("areaName", "Astoria"),
///     ("Borough", "Queens"),
///     ("areaType", "neighborhood"),
///     ("2024-01", "2650"),
///     ("2024-02", "2700"),
/// ]
/// .into_iter()
/// .collect();
/// let table = RentSeriesNormalizer.normalize(vec![record])?;
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.cell(1, "rent"), Some(&Cell::Float(2700.0)));
/// # Ok::<(), civic_core::NormalizeError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RentSeriesNormalizer;

impl Normalizer for RentSeriesNormalizer {
    fn name(&self) -> &str {
        "rent_series"
    }

    fn normalize(&self, records: Vec<RawRecord>) -> Result<Table, NormalizeError> {
        let mut table = Table::new(RENT_SERIES_COLUMNS);
        for (index, record) in records.into_iter().enumerate() {
            let area = record
                .text(AREA_FIELD)
                .ok_or_else(|| NormalizeError::Field {
                    index,
                    field: AREA_FIELD.to_owned(),
                    problem: "is missing".to_owned(),
                })?
                .to_owned();
            let borough = fields::text(&record, "Borough");
            let area_type = fields::text(&record, "areaType");
            for (month, value) in record.iter().filter(|(name, _)| is_month(name)) {
                table.push_row(vec![
                    Cell::Text(area.clone()),
                    borough.clone(),
                    area_type.clone(),
                    Cell::Text(month.clone()),
                    Cell::from(FieldValue::as_f64(value)),
                ])?;
            }
        }
        Ok(table)
    }
}

/// `YYYY-MM` with a month between 01 and 12.
fn is_month(name: &str) -> bool {
    let Some((year, month)) = name.split_once('-') else {
        return false;
    };
    year.len() == 4
        && month.len() == 2
        && year.bytes().all(|byte| byte.is_ascii_digit())
        && matches!(month.parse::<u8>(), Ok(1..=12))
}
