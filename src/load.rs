//! CSV loaders for the three data.sfgov.org exports.
//!
//! Each loader checks that the required columns exist up front, then
//! deserializes row structs with serde. Rows missing required values are
//! excluded where the dataset allows it; malformed geometry always aborts.

use std::path::Path;

use anyhow::{Context, Result, bail};
use geo::Point;
use serde::Deserialize;
use tracing::{debug, info};

use crate::geometry::{parse_wkt_line, parse_wkt_polygon};
use crate::types::{Neighborhood, Route, Stop};

#[derive(Debug, Deserialize)]
struct RawStop {
    #[serde(rename = "STOPID")]
    stop_id: Option<String>,
    #[serde(rename = "STOPNAME")]
    stop_name: Option<String>,
    #[serde(rename = "LATITUDE")]
    latitude: Option<f64>,
    #[serde(rename = "LONGITUDE")]
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawNeighborhood {
    #[serde(rename = "nhood")]
    name: Option<String>,
    #[serde(rename = "the_geom")]
    the_geom: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRoute {
    #[serde(rename = "ROUTE_NAME")]
    route_name: Option<String>,
    #[serde(rename = "DIRECTION")]
    direction: Option<String>,
    #[serde(rename = "SERVICE_CA")]
    service_category: Option<String>,
    #[serde(rename = "shape")]
    shape: Option<String>,
}

/// Loads Muni stops, keeping id, name, and WGS84 position.
///
/// Rows missing any required field are excluded, matching the source data's
/// sparse exports.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_stops(path: impl AsRef<Path>) -> Result<Vec<Stop>> {
    let mut reader = open_csv(
        path.as_ref(),
        &["STOPID", "STOPNAME", "LATITUDE", "LONGITUDE"],
    )?;

    let mut stops = Vec::new();
    let mut excluded = 0usize;
    for row in reader.deserialize() {
        let row: RawStop = row.context("malformed stop row")?;
        match (row.stop_id, row.stop_name, row.latitude, row.longitude) {
            (Some(stop_id), Some(name), Some(lat), Some(lon)) => stops.push(Stop {
                stop_id,
                name,
                location: Point::new(lon, lat),
            }),
            _ => excluded += 1,
        }
    }

    info!(loaded = stops.len(), excluded, "Stops loaded");
    Ok(stops)
}

/// Loads neighborhood boundaries from the WKT geometry column.
///
/// A missing or unparseable boundary is a data-integrity error: neighborhoods
/// are the join key for the whole analysis and must never be silently lost.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_neighborhoods(path: impl AsRef<Path>) -> Result<Vec<Neighborhood>> {
    let mut reader = open_csv(path.as_ref(), &["nhood", "the_geom"])?;

    let mut neighborhoods = Vec::new();
    for row in reader.deserialize() {
        let row: RawNeighborhood = row.context("malformed neighborhood row")?;
        let (Some(name), Some(geom)) = (row.name, row.the_geom) else {
            bail!("neighborhood row missing name or geometry");
        };
        let boundary = parse_wkt_polygon(&geom)
            .with_context(|| format!("neighborhood {name:?} boundary"))?;
        neighborhoods.push(Neighborhood { name, boundary });
    }

    info!(loaded = neighborhoods.len(), "Neighborhoods loaded");
    Ok(neighborhoods)
}

/// Loads route patterns with their service category and shape.
///
/// Rows without a shape are excluded; a shape that fails to parse aborts.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_routes(path: impl AsRef<Path>) -> Result<Vec<Route>> {
    let mut reader = open_csv(
        path.as_ref(),
        &["ROUTE_NAME", "DIRECTION", "SERVICE_CA", "shape"],
    )?;

    let mut routes = Vec::new();
    let mut excluded = 0usize;
    for row in reader.deserialize() {
        let row: RawRoute = row.context("malformed route row")?;
        let Some(geom) = row.shape else {
            excluded += 1;
            continue;
        };
        let name = row.route_name.unwrap_or_default();
        let shape =
            parse_wkt_line(&geom).with_context(|| format!("route {name:?} shape"))?;
        routes.push(Route {
            name,
            direction: row.direction.unwrap_or_default(),
            service_category: row.service_category.unwrap_or_default(),
            shape,
        });
    }

    info!(loaded = routes.len(), excluded, "Routes loaded");
    Ok(routes)
}

/// Opens a CSV reader and verifies the required columns are present.
fn open_csv(path: &Path, required: &[&str]) -> Result<csv::Reader<std::fs::File>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("reading headers of {}", path.display()))?;
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            bail!("{} is missing required column {column:?}", path.display());
        }
    }
    debug!(path = %path.display(), columns = ?headers, "CSV opened");

    Ok(reader)
}
