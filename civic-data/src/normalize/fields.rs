//! Column extraction shared by the dataset normalizers.

use civic_core::{Cell, FieldValue, NormalizeError, RawRecord};
use geo::Geometry;
use log::warn;

use super::geometry::{decode_geojson, wgs84_point};

/// Required integer identifier.
pub(crate) fn required_id(
    record: &RawRecord,
    index: usize,
    field: &str,
) -> Result<i64, NormalizeError> {
    match record.get(field) {
        None | Some(FieldValue::Null) => Err(field_error(index, field, "is missing")),
        Some(value) => value
            .as_i64()
            .ok_or_else(|| field_error(index, field, &format!("is not an integer: {value}"))),
    }
}

fn field_error(index: usize, field: &str, problem: &str) -> NormalizeError {
    NormalizeError::Field {
        index,
        field: field.to_owned(),
        problem: problem.to_owned(),
    }
}

pub(crate) fn text(record: &RawRecord, field: &str) -> Cell {
    Cell::from(record.text(field))
}

/// Identifier-like text that some sources deliver as bare numbers, such as
/// zip codes.
pub(crate) fn code(record: &RawRecord, field: &str) -> Cell {
    match record.get(field) {
        Some(FieldValue::Number(_)) => record
            .integer(field)
            .map_or(Cell::Null, |number| Cell::Text(number.to_string())),
        _ => text(record, field),
    }
}

pub(crate) fn float(record: &RawRecord, field: &str) -> Cell {
    Cell::from(record.number(field))
}

pub(crate) fn integer(record: &RawRecord, field: &str) -> Cell {
    Cell::from(record.integer(field))
}

/// Point geometry from separate longitude and latitude columns.
pub(crate) fn point(record: &RawRecord, longitude: &str, latitude: &str) -> Cell {
    let point = record
        .number(longitude)
        .zip(record.number(latitude))
        .and_then(|(lon, lat)| wgs84_point(lon, lat));
    Cell::from(point.map(Geometry::Point))
}

/// Geometry from an embedded GeoJSON object.
///
/// A missing payload or one outside WGS84 yields a null cell; an
/// undecodable payload is an error.
pub(crate) fn geojson(
    record: &RawRecord,
    index: usize,
    field: &str,
) -> Result<Cell, NormalizeError> {
    let Some(payload) = record.text(field) else {
        return Ok(Cell::Null);
    };
    let geometry = decode_geojson(payload).map_err(|err| NormalizeError::Geometry {
        index,
        message: err.to_string(),
    })?;
    if geometry.is_none() {
        warn!("record {index}: `{field}` lies outside WGS84; keeping a null geometry");
    }
    Ok(Cell::from(geometry))
}
