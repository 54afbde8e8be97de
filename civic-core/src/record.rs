//! Untyped rows as delivered by a remote source.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

/// A single scalar value within a [`RawRecord`].
///
/// Remote sources are free to deliver arbitrary JSON, but the ingestion
/// engine narrows every value to one of these variants before handing rows
/// to a normalizer. Anything richer (booleans, nested objects) is carried as
/// [`FieldValue::Text`].
///
/// # Examples
///
/// ```
/// use civic_core::FieldValue;
///
/// let value = FieldValue::from("42");
/// assert_eq!(value.as_i64(), Some(42));
/// assert!(FieldValue::Null.is_null());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum FieldValue {
    /// Textual value, including numbers the source chose to quote.
    Text(String),
    /// Numeric value delivered as a JSON number.
    Number(f64),
    /// Explicit absence of a value.
    Null,
}

impl FieldValue {
    /// Return `true` for [`FieldValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the text of a [`FieldValue::Text`] value.
    ///
    /// Blank strings are reported as `None` so callers treat them like nulls.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            Self::Number(_) | Self::Null => None,
        }
    }

    /// Interpret the value as a finite floating-point number.
    ///
    /// Quoted numbers are parsed; non-finite results are rejected.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(number) => *number,
            Self::Text(_) => self.as_text()?.parse::<f64>().ok()?,
            Self::Null => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Interpret the value as a signed integer.
    ///
    /// Numbers with a fractional part are rejected rather than truncated.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Text(_) => {
                let text = self.as_text()?;
                text.parse::<i64>().ok().or_else(|| {
                    let parsed = text.parse::<f64>().ok()?;
                    whole_number(parsed)
                })
            }
            Self::Number(number) => whole_number(*number),
            Self::Null => None,
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "range and fraction are checked before the cast"
)]
fn whole_number(value: f64) -> Option<i64> {
    // i64::MAX is not representable as f64; the exclusive bound keeps the cast exact.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (value.is_finite() && value.fract() == 0.0 && value >= -LIMIT && value < LIMIT)
        .then_some(value as i64)
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl<T> From<Option<T>> for FieldValue
where
    T: Into<Self>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
            Self::Null => f.write_str("null"),
        }
    }
}

/// One untyped row keyed by source field name.
///
/// Fields are kept in name order so two records with the same content
/// compare and print identically regardless of the order the source used.
///
/// # Examples
///
/// ```
/// use civic_core::{FieldValue, RawRecord};
///
/// let record: RawRecord = [("tree_id", FieldValue::from("180683"))]
///     .into_iter()
///     .collect();
/// assert_eq!(record.integer("tree_id"), Some(180_683));
/// assert!(record.get("missing").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RawRecord(BTreeMap<String, FieldValue>);

impl RawRecord {
    /// Create an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert or replace a field, returning the previous value.
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.0.insert(field.into(), value.into())
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// Non-blank text stored under `field`.
    #[must_use]
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    /// Finite number stored under `field`, parsing quoted numbers.
    #[must_use]
    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_f64)
    }

    /// Whole number stored under `field`, parsing quoted numbers.
    #[must_use]
    pub fn integer(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(FieldValue::as_i64)
    }

    /// Number of fields present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return `true` when the record carries no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over fields in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, FieldValue> {
        self.0.iter()
    }

    /// Iterate over field names in name order.
    pub fn fields(&self) -> btree_map::Keys<'_, String, FieldValue> {
        self.0.keys()
    }
}

impl<K, V> FromIterator<(K, V)> for RawRecord
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl IntoIterator for RawRecord {
    type Item = (String, FieldValue);
    type IntoIter = btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a RawRecord {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = btree_map::Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(FieldValue::from("12"), Some(12))]
    #[case(FieldValue::from(" 12 "), Some(12))]
    #[case(FieldValue::from("12.0"), Some(12))]
    #[case(FieldValue::from("12.5"), None)]
    #[case(FieldValue::Number(7.0), Some(7))]
    #[case(FieldValue::Number(7.25), None)]
    #[case(FieldValue::Number(f64::NAN), None)]
    #[case(FieldValue::from(""), None)]
    #[case(FieldValue::Null, None)]
    fn integers_are_parsed_without_truncation(
        #[case] value: FieldValue,
        #[case] expected: Option<i64>,
    ) {
        assert_eq!(value.as_i64(), expected);
    }

    #[rstest]
    #[case(FieldValue::from("40.5"), Some(40.5))]
    #[case(FieldValue::Number(-73.9), Some(-73.9))]
    #[case(FieldValue::from("inf"), None)]
    #[case(FieldValue::from("n/a"), None)]
    #[case(FieldValue::Null, None)]
    fn floats_reject_non_finite_and_garbage(
        #[case] value: FieldValue,
        #[case] expected: Option<f64>,
    ) {
        assert_eq!(value.as_f64(), expected);
    }

    #[rstest]
    fn blank_text_reads_as_missing() {
        let record: RawRecord = [("borough", "   ")].into_iter().collect();
        assert_eq!(record.text("borough"), None);
        assert_eq!(record.len(), 1);
    }

    #[rstest]
    fn optional_values_convert_to_null() {
        let mut record = RawRecord::new();
        record.insert("descriptor", None::<String>);
        record.insert("borough", Some("QUEENS"));
        assert_eq!(record.get("descriptor"), Some(&FieldValue::Null));
        assert_eq!(record.text("borough"), Some("QUEENS"));
    }

    #[rstest]
    fn records_compare_independently_of_insertion_order() {
        let left: RawRecord = [("a", "1"), ("b", "2")].into_iter().collect();
        let right: RawRecord = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(left, right);
        let names: Vec<&String> = left.fields().collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[cfg(feature = "serde")]
    #[rstest]
    fn deserialises_scalar_json_rows() {
        let row: RawRecord =
            serde_json::from_str(r#"{"zip": "11201", "dbh": 14.5, "health": null}"#)
                .expect("scalar row should deserialise");
        assert_eq!(row.text("zip"), Some("11201"));
        assert_eq!(row.number("dbh"), Some(14.5));
        assert_eq!(row.get("health"), Some(&FieldValue::Null));
    }
}
