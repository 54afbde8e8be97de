//! Test-only helpers shared by unit and behaviour tests.

use crate::{Cell, FieldValue, NormalizeError, Normalizer, RawRecord, Table};

/// Normalizer that copies selected fields into text columns.
///
/// Missing or blank fields become [`Cell::Null`]; numbers are rendered with
/// their `Display` form.
#[derive(Debug, Clone, Default)]
pub struct TextColumnsNormalizer {
    columns: Vec<String>,
}

impl TextColumnsNormalizer {
    /// Keep `columns`, in the given order.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

impl Normalizer for TextColumnsNormalizer {
    fn name(&self) -> &str {
        "text-columns"
    }

    fn normalize(&self, records: Vec<RawRecord>) -> Result<Table, NormalizeError> {
        let mut table = Table::new(self.columns.iter().cloned());
        for record in records {
            let row = self
                .columns
                .iter()
                .map(|column| match record.get(column) {
                    Some(FieldValue::Number(number)) => Cell::Text(number.to_string()),
                    Some(value) => Cell::from(value.as_text()),
                    None => Cell::Null,
                })
                .collect();
            table.push_row(row)?;
        }
        Ok(table)
    }
}

/// Build a [`RawRecord`] from string pairs.
pub fn text_record<'a, I>(pairs: I) -> RawRecord
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_requested_columns_in_order() {
        let mut record = text_record([("b", "two"), ("a", "one")]);
        record.insert("n", FieldValue::Number(3.0));
        let table = TextColumnsNormalizer::new(["b", "a", "n", "z"])
            .normalize(vec![record])
            .expect("normalize");
        assert_eq!(table.columns(), ["b", "a", "n", "z"]);
        assert_eq!(table.cell(0, "b"), Some(&Cell::Text("two".into())));
        assert_eq!(table.cell(0, "n"), Some(&Cell::Text("3".into())));
        assert_eq!(table.cell(0, "z"), Some(&Cell::Null));
    }
}
