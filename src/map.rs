//! Interactive map generation.
//!
//! Produces a self-contained HTML file: neighborhoods as tier-colored GeoJSON
//! polygons with hover tooltips, and transit stops as clustered circle
//! markers. Rendering happens client-side with Leaflet; this module only
//! assembles the data and the page.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use serde_json::json;
use tracing::info;

use crate::types::{Anomaly, AssignedStop, FeatureRow, Neighborhood};

/// Map viewport: San Francisco city center.
const MAP_CENTER: (f64, f64) = (37.76, -122.44);
const MAP_ZOOM: u8 = 12;

/// Writes the interactive neighborhood map.
///
/// Neighborhoods missing from the feature table are skipped; the pipeline's
/// cardinality invariant means that never happens in a normal run.
#[tracing::instrument(skip_all, fields(neighborhoods = neighborhoods.len(), stops = stops.len()))]
pub fn write_map(
    path: impl AsRef<Path>,
    rows: &[FeatureRow],
    neighborhoods: &[Neighborhood],
    stops: &[AssignedStop],
) -> Result<()> {
    let path = path.as_ref();

    let by_name: BTreeMap<&str, &FeatureRow> = rows
        .iter()
        .map(|r| (r.neighborhood.as_str(), r))
        .collect();

    let mut features = Vec::new();
    for neighborhood in neighborhoods {
        let Some(row) = by_name.get(neighborhood.name.as_str()) else {
            continue;
        };

        let (r, g, b) = row.tier.color_rgb();
        let anomaly_note = match row.anomaly {
            Anomaly::Normal => String::new(),
            flagged => format!(" ANOMALY: {}", flagged.as_str()),
        };
        let tooltip = format!(
            "{}: {} ({} stops, {} routes){}",
            row.neighborhood, row.tier.as_str(), row.stop_count, row.route_diversity, anomaly_note
        );

        let mut properties = JsonObject::new();
        properties.insert("name".to_string(), JsonValue::from(row.neighborhood.clone()));
        properties.insert("tier".to_string(), JsonValue::from(row.tier.as_str()));
        properties.insert(
            "color".to_string(),
            JsonValue::from(format!("#{r:02X}{g:02X}{b:02X}")),
        );
        properties.insert("tooltip".to_string(), JsonValue::from(tooltip));

        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::from(&neighborhood.boundary))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    let markers: Vec<JsonValue> = stops
        .iter()
        .map(|assigned| {
            json!({
                "lat": assigned.stop.location.y(),
                "lon": assigned.stop.location.x(),
                "name": assigned.stop.name,
            })
        })
        .collect();

    let html = MAP_TEMPLATE
        .replace("__CENTER__", &format!("[{}, {}]", MAP_CENTER.0, MAP_CENTER.1))
        .replace("__ZOOM__", &MAP_ZOOM.to_string())
        .replace("__NEIGHBORHOODS__", &serde_json::to_string(&collection)?)
        .replace("__STOPS__", &serde_json::to_string(&markers)?);

    fs::write(path, html).with_context(|| format!("writing {}", path.display()))?;

    info!(path = %path.display(), "Interactive map written");
    Ok(())
}

static MAP_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>sf transit access by neighborhood</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.css">
<link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.Default.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<script src="https://unpkg.com/leaflet.markercluster@1.5.3/dist/leaflet.markercluster.js"></script>
<style>html, body, #map { height: 100%; margin: 0; }</style>
</head>
<body>
<div id="map"></div>
<script>
var map = L.map('map').setView(__CENTER__, __ZOOM__);
L.tileLayer('https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png', {
  attribution: '&copy; OpenStreetMap contributors &copy; CARTO'
}).addTo(map);

var neighborhoodData = __NEIGHBORHOODS__;
var neighborhoods = L.geoJSON(neighborhoodData, {
  style: function (feature) {
    return {
      fillColor: feature.properties.color,
      color: '#333',
      weight: 1,
      fillOpacity: 0.5
    };
  },
  onEachFeature: function (feature, layer) {
    layer.bindTooltip(feature.properties.tooltip);
  }
}).addTo(map);

var stopData = __STOPS__;
var stopMarkers = L.markerClusterGroup();
stopData.forEach(function (stop) {
  stopMarkers.addLayer(
    L.circleMarker([stop.lat, stop.lon], {
      radius: 2,
      color: '#1565C0',
      fill: true,
      fillOpacity: 0.6
    }).bindPopup(stop.name)
  );
});
map.addLayer(stopMarkers);

L.control.layers(null, {
  'neighborhoods': neighborhoods,
  'transit stops': stopMarkers
}).addTo(map);
</script>
</body>
</html>
"#;
