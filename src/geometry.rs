//! WKT parsing and planar projection helpers.
//!
//! All source geometries arrive as WGS84 WKT strings. Area is only meaningful
//! after projecting to a planar CRS in meters, so the feature builder goes
//! through [`web_mercator`] before calling [`area_km2`].

use anyhow::{Context, Result, anyhow};
use geo::{Area, Coord, Geometry, MapCoords, MultiLineString, MultiPolygon};
use wkt::TryFromWkt;

/// WGS84 spherical radius used by the EPSG:3857 forward projection, meters.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Parses a WKT `POLYGON` or `MULTIPOLYGON` into a [`MultiPolygon`].
///
/// Plain polygons are promoted to a single-element multipolygon. Any other
/// geometry type, or unparseable WKT, is a data-integrity error.
pub fn parse_wkt_polygon(raw: &str) -> Result<MultiPolygon<f64>> {
    let geometry = Geometry::<f64>::try_from_wkt_str(raw.trim())
        .map_err(|e| anyhow!("invalid WKT geometry: {e}"))?;
    match geometry {
        Geometry::MultiPolygon(mp) => Ok(mp),
        Geometry::Polygon(p) => Ok(MultiPolygon(vec![p])),
        other => Err(anyhow!(
            "expected POLYGON or MULTIPOLYGON, got {}",
            geometry_name(&other)
        )),
    }
}

/// Parses a WKT `LINESTRING` or `MULTILINESTRING` into a [`MultiLineString`].
pub fn parse_wkt_line(raw: &str) -> Result<MultiLineString<f64>> {
    let geometry = Geometry::<f64>::try_from_wkt_str(raw.trim())
        .map_err(|e| anyhow!("invalid WKT geometry: {e}"))?;
    match geometry {
        Geometry::MultiLineString(ml) => Ok(ml),
        Geometry::LineString(l) => Ok(MultiLineString(vec![l])),
        other => Err(anyhow!(
            "expected LINESTRING or MULTILINESTRING, got {}",
            geometry_name(&other)
        )),
    }
}

/// Forward spherical-mercator (EPSG:3857) projection of a WGS84 multipolygon.
/// Output coordinates are in meters.
pub fn web_mercator(boundary: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    boundary.map_coords(|Coord { x, y }| Coord {
        x: EARTH_RADIUS_M * x.to_radians(),
        y: EARTH_RADIUS_M * (std::f64::consts::FRAC_PI_4 + y.to_radians() / 2.0).tan().ln(),
    })
}

/// Projected area of a WGS84 boundary in square kilometers.
///
/// # Errors
///
/// Returns an error when the polygon is degenerate (zero or non-finite area),
/// since every density feature divides by this value.
pub fn area_km2(name: &str, boundary: &MultiPolygon<f64>) -> Result<f64> {
    let area = web_mercator(boundary).unsigned_area() / 1e6;
    if !area.is_finite() || area <= 0.0 {
        return Err(anyhow!("degenerate boundary polygon (area {area} km^2)"))
            .with_context(|| format!("neighborhood {name:?}"));
    }
    Ok(area)
}

fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "POINT",
        Geometry::Line(_) | Geometry::LineString(_) => "LINESTRING",
        Geometry::MultiPoint(_) => "MULTIPOINT",
        Geometry::MultiLineString(_) => "MULTILINESTRING",
        Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => "POLYGON",
        Geometry::MultiPolygon(_) => "MULTIPOLYGON",
        Geometry::GeometryCollection(_) => "GEOMETRYCOLLECTION",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_polygon_promotes_to_multipolygon() {
        let mp = parse_wkt_polygon("POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))").unwrap();
        assert_eq!(mp.0.len(), 1);
    }

    #[test]
    fn test_parse_multipolygon() {
        let mp = parse_wkt_polygon(
            "MULTIPOLYGON (((0 0, 1 0, 1 1, 0 1, 0 0)), ((2 2, 3 2, 3 3, 2 3, 2 2)))",
        )
        .unwrap();
        assert_eq!(mp.0.len(), 2);
    }

    #[test]
    fn test_parse_polygon_rejects_garbage() {
        assert!(parse_wkt_polygon("POLYGON ((not wkt").is_err());
    }

    #[test]
    fn test_parse_polygon_rejects_wrong_type() {
        assert!(parse_wkt_polygon("POINT (1 2)").is_err());
    }

    #[test]
    fn test_parse_line_promotes_to_multilinestring() {
        let ml = parse_wkt_line("LINESTRING (0 0, 1 1, 2 0)").unwrap();
        assert_eq!(ml.0.len(), 1);
        assert_eq!(ml.0[0].0.len(), 3);
    }

    #[test]
    fn test_area_is_positive_for_valid_polygon() {
        // Roughly a city-block-scale square near the SF latitude band
        let mp = parse_wkt_polygon(
            "POLYGON ((-122.45 37.75, -122.44 37.75, -122.44 37.76, -122.45 37.76, -122.45 37.75))",
        )
        .unwrap();
        let area = area_km2("test", &mp).unwrap();
        assert!(area > 0.0);
        // One hundredth of a degree at mercator scale: a couple of km^2
        assert!(area < 10.0);
    }

    #[test]
    fn test_area_rejects_degenerate_polygon() {
        let mp = parse_wkt_polygon("POLYGON ((0 0, 1 1, 2 2, 0 0))").unwrap();
        assert!(area_km2("degenerate", &mp).is_err());
    }

    #[test]
    fn test_web_mercator_is_monotonic_in_latitude() {
        let mp = parse_wkt_polygon("POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))").unwrap();
        let projected = web_mercator(&mp);
        let exterior = projected.0[0].exterior();
        let ys: Vec<f64> = exterior.coords().map(|c| c.y).collect();
        assert!(ys.iter().any(|&y| y > 0.0));
        assert!(ys.iter().all(|&y| y.is_finite()));
    }
}
