//! Geometry decoding for normalizers.
//!
//! Point datasets carry longitude/latitude columns; boundary datasets embed
//! GeoJSON geometry objects that arrive as compact JSON text.

use geo::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while decoding an embedded geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The payload is not a supported GeoJSON geometry object.
    #[error("not a GeoJSON Point, Polygon or MultiPolygon: {0}")]
    Json(#[from] serde_json::Error),
    /// A position has fewer than two ordinates.
    #[error("position with {0} ordinates")]
    ShortPosition(usize),
    /// A polygon has no exterior ring.
    #[error("polygon without rings")]
    EmptyPolygon,
}

type Position = Vec<f64>;
type Ring = Vec<Position>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonGeometry {
    Point { coordinates: Position },
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
}

/// Whether a longitude/latitude pair lies on the WGS84 globe.
pub fn in_wgs84_range(coord: Coord<f64>) -> bool {
    coord.x.is_finite()
        && coord.y.is_finite()
        && (-180.0..=180.0).contains(&coord.x)
        && (-90.0..=90.0).contains(&coord.y)
}

/// Build a point from longitude and latitude, rejecting out-of-range pairs.
///
/// # Examples
/// ```
/// use civic_data::normalize::wgs84_point;
///
/// assert!(wgs84_point(-73.98, 40.75).is_some());
/// assert!(wgs84_point(40.75, -173.98).is_none());
/// ```
pub fn wgs84_point(longitude: f64, latitude: f64) -> Option<Point<f64>> {
    let coord = Coord {
        x: longitude,
        y: latitude,
    };
    in_wgs84_range(coord).then(|| Point(coord))
}

/// Decode a GeoJSON `Point`, `Polygon` or `MultiPolygon` object.
///
/// Ordinates beyond the second (elevation) are ignored. Returns `Ok(None)`
/// when any coordinate lies outside the WGS84 range.
///
/// # Errors
///
/// Returns [`GeometryError`] for malformed or unsupported payloads.
pub fn decode_geojson(text: &str) -> Result<Option<Geometry<f64>>, GeometryError> {
    let geometry = match serde_json::from_str::<GeoJsonGeometry>(text)? {
        GeoJsonGeometry::Point { coordinates } => Geometry::Point(Point(coord(&coordinates)?)),
        GeoJsonGeometry::Polygon { coordinates } => Geometry::Polygon(polygon(coordinates)?),
        GeoJsonGeometry::MultiPolygon { coordinates } => Geometry::MultiPolygon(MultiPolygon(
            coordinates
                .into_iter()
                .map(polygon)
                .collect::<Result<_, _>>()?,
        )),
    };
    Ok(within_wgs84(&geometry).then_some(geometry))
}

fn coord(position: &[f64]) -> Result<Coord<f64>, GeometryError> {
    match position {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        short => Err(GeometryError::ShortPosition(short.len())),
    }
}

fn ring(positions: Ring) -> Result<LineString<f64>, GeometryError> {
    positions
        .iter()
        .map(|position| coord(position))
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn polygon(rings: Vec<Ring>) -> Result<Polygon<f64>, GeometryError> {
    let mut rings = rings.into_iter();
    let exterior = ring(rings.next().ok_or(GeometryError::EmptyPolygon)?)?;
    let interiors = rings.map(ring).collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn within_wgs84(geometry: &Geometry<f64>) -> bool {
    use geo::CoordsIter;
    geometry.coords_iter().all(in_wgs84_range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;
    use rstest::rstest;

    #[rstest]
    #[case(-73.98, 40.75, true)]
    #[case(180.0, -90.0, true)]
    #[case(-180.1, 0.0, false)]
    #[case(0.0, 90.5, false)]
    #[case(f64::NAN, 0.0, false)]
    fn point_range_check(#[case] lon: f64, #[case] lat: f64, #[case] valid: bool) {
        assert_eq!(wgs84_point(lon, lat).is_some(), valid);
    }

    #[rstest]
    fn decodes_points_ignoring_elevation() {
        let geometry = decode_geojson(r#"{"type":"Point","coordinates":[-73.9,40.7,12.0]}"#)
            .expect("decodes")
            .expect("in range");
        assert_eq!(geometry, Geometry::Point(Point::new(-73.9, 40.7)));
    }

    #[rstest]
    fn decodes_polygons_with_holes() {
        let text = r#"{"type":"Polygon","coordinates":[
            [[0,0],[4,0],[4,4],[0,4],[0,0]],
            [[1,1],[2,1],[2,2],[1,2],[1,1]]
        ]}"#;
        let Some(Geometry::Polygon(polygon)) = decode_geojson(text).expect("decodes") else {
            panic!("expected a polygon");
        };
        assert_eq!(polygon.interiors().len(), 1);
        assert!((polygon.unsigned_area() - 15.0).abs() < 1e-9);
    }

    #[rstest]
    fn decodes_multipolygons() {
        let text = r#"{"type":"MultiPolygon","coordinates":[
            [[[0,0],[1,0],[1,1],[0,0]]],
            [[[2,2],[3,2],[3,3],[2,2]]]
        ]}"#;
        let Some(Geometry::MultiPolygon(multi)) = decode_geojson(text).expect("decodes") else {
            panic!("expected a multipolygon");
        };
        assert_eq!(multi.0.len(), 2);
    }

    #[rstest]
    fn out_of_range_geometries_are_dropped() {
        let text = r#"{"type":"Polygon","coordinates":[[[0,0],[200,0],[0,1],[0,0]]]}"#;
        assert_eq!(decode_geojson(text).expect("decodes"), None);
    }

    #[rstest]
    #[case(r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#)]
    #[case(r#"{"type":"Point","coordinates":[1]}"#)]
    #[case(r#"{"type":"Polygon","coordinates":[]}"#)]
    #[case("not json")]
    fn malformed_payloads_fail(#[case] text: &str) {
        assert!(decode_geojson(text).is_err());
    }
}
