//! Decoding of count and page response bodies.

use civic_core::{FieldValue, RawRecord};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a count response could not be read.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CountProblem {
    /// The body is not JSON.
    #[error("body is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
    /// The body is not an array holding at least one object.
    #[error("expected a one-row array of objects")]
    MissingRow,
    /// The row lacks the count key.
    #[error("row has no `{key}` field")]
    MissingKey {
        /// Expected result key.
        key: String,
    },
    /// The count value is not a non-negative integer.
    #[error("`{key}` is not a non-negative integer: {value}")]
    NotAnInteger {
        /// Result key.
        key: String,
        /// Offending value as JSON.
        value: String,
    },
}

/// Read the record count stored under `key` in a one-row result.
///
/// Counts may arrive as JSON numbers or as numeric strings.
pub(crate) fn parse_count(body: &[u8], key: &str) -> Result<u64, CountProblem> {
    let rows: Vec<Map<String, Value>> = serde_json::from_slice(body).map_err(|err| {
        if err.is_data() {
            CountProblem::MissingRow
        } else {
            CountProblem::Json(err)
        }
    })?;
    let row = rows.first().ok_or(CountProblem::MissingRow)?;
    let value = row.get(key).ok_or_else(|| CountProblem::MissingKey {
        key: key.to_owned(),
    })?;
    let count = match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    };
    count.ok_or_else(|| CountProblem::NotAnInteger {
        key: key.to_owned(),
        value: value.to_string(),
    })
}

/// Decode a page body: a JSON array of flat objects.
pub(crate) fn parse_page(body: &[u8]) -> Result<Vec<RawRecord>, serde_json::Error> {
    let rows: Vec<Map<String, Value>> = serde_json::from_slice(body)?;
    Ok(rows.into_iter().map(record_from_object).collect())
}

fn record_from_object(object: Map<String, Value>) -> RawRecord {
    object
        .into_iter()
        .map(|(name, value)| (name, field_value(value)))
        .collect()
}

fn field_value(value: Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::String(text) => FieldValue::Text(text),
        Value::Number(number) => number.as_f64().map_or(FieldValue::Null, FieldValue::Number),
        Value::Bool(flag) => FieldValue::Text(flag.to_string()),
        nested @ (Value::Array(_) | Value::Object(_)) => FieldValue::Text(nested.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(br#"[{"count_tree_id":"683788"}]"#, 683_788)]
    #[case(br#"[{"count_tree_id":42}]"#, 42)]
    #[case(br#"[{"count_tree_id":" 7 "}]"#, 7)]
    fn counts_accept_numbers_and_numeric_strings(#[case] body: &[u8], #[case] expected: u64) {
        assert_eq!(parse_count(body, "count_tree_id").expect("count parses"), expected);
    }

    #[rstest]
    fn empty_count_result_is_missing_row() {
        assert!(matches!(
            parse_count(b"[]", "count_x"),
            Err(CountProblem::MissingRow)
        ));
        assert!(matches!(
            parse_count(br#"{"count_x": 1}"#, "count_x"),
            Err(CountProblem::MissingRow)
        ));
    }

    #[rstest]
    fn missing_key_is_reported() {
        assert!(matches!(
            parse_count(br#"[{"count":"3"}]"#, "count_x"),
            Err(CountProblem::MissingKey { key }) if key == "count_x"
        ));
    }

    #[rstest]
    #[case(br#"[{"count_x":"many"}]"#)]
    #[case(br#"[{"count_x":-1}]"#)]
    #[case(br#"[{"count_x":1.5}]"#)]
    #[case(br#"[{"count_x":null}]"#)]
    fn non_integer_counts_are_rejected(#[case] body: &[u8]) {
        assert!(matches!(
            parse_count(body, "count_x"),
            Err(CountProblem::NotAnInteger { .. })
        ));
    }

    #[rstest]
    fn truncated_json_is_a_json_problem() {
        assert!(matches!(
            parse_count(br#"[{"count_x":"#, "count_x"),
            Err(CountProblem::Json(_))
        ));
    }

    #[rstest]
    fn page_values_map_onto_field_values() {
        let body = br#"[{
            "tree_id": "180683",
            "tree_dbh": 3,
            "stump": false,
            "problems": null,
            "the_geom": {"type": "Point", "coordinates": [-73.84, 40.72]}
        }]"#;
        let records = parse_page(body).expect("page parses");
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.get("tree_id"), Some(&FieldValue::from("180683")));
        assert_eq!(record.get("tree_dbh"), Some(&FieldValue::Number(3.0)));
        assert_eq!(record.get("stump"), Some(&FieldValue::from("false")));
        assert_eq!(record.get("problems"), Some(&FieldValue::Null));
        assert_eq!(
            record.get("the_geom"),
            Some(&FieldValue::from(
                r#"{"coordinates":[-73.84,40.72],"type":"Point"}"#
            ))
        );
    }

    #[rstest]
    fn empty_page_parses_to_no_records() {
        assert!(parse_page(b"[]").expect("page parses").is_empty());
    }

    #[rstest]
    #[case(b"not json")]
    #[case(b"[1, 2]")]
    #[case(br#"{"error": true}"#)]
    fn malformed_pages_fail(#[case] body: &[u8]) {
        assert!(parse_page(body).is_err());
    }
}
