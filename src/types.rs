//! Domain types shared across the pipeline.

use geo::{MultiLineString, MultiPolygon, Point};
use serde::Serialize;

/// A single Muni transit stop (WGS84 lon/lat).
#[derive(Debug, Clone)]
pub struct Stop {
    pub stop_id: String,
    pub name: String,
    pub location: Point<f64>,
}

/// A named neighborhood boundary (WGS84).
///
/// Polygons loaded as plain `POLYGON` WKT are promoted to a single-element
/// multipolygon so downstream code handles one shape.
#[derive(Debug, Clone)]
pub struct Neighborhood {
    pub name: String,
    pub boundary: MultiPolygon<f64>,
}

/// A Muni route pattern (WGS84). The shape may be multi-part.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    pub direction: String,
    pub service_category: String,
    pub shape: MultiLineString<f64>,
}

/// A stop together with the neighborhood that contains it.
///
/// Stops outside every neighborhood never become an `AssignedStop`.
#[derive(Debug, Clone)]
pub struct AssignedStop {
    pub stop: Stop,
    pub neighborhood: String,
}

/// One (neighborhood, route) intersection record.
///
/// Multiplicity is preserved here; distinct-route counting happens in the
/// feature builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAssignment {
    pub neighborhood: String,
    pub route: String,
    pub service_category: String,
}

/// Access tier derived from cluster rank (0 = best cluster).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Excellent,
    Good,
    Moderate,
    Poor,
}

impl Tier {
    pub const ALL: [Self; 4] = [Self::Excellent, Self::Good, Self::Moderate, Self::Poor];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Moderate => "moderate",
            Self::Poor => "poor",
        }
    }

    /// Fixed presentation palette, shared by the bar chart and the map.
    pub fn color_rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Excellent => (0x4C, 0xAF, 0x50),
            Self::Good => (0x8B, 0xC3, 0x4A),
            Self::Moderate => (0xFF, 0xC1, 0x07),
            Self::Poor => (0xF4, 0x43, 0x36),
        }
    }
}

/// IQR outlier flag on the composite transit score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Anomaly {
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "unusually high")]
    UnusuallyHigh,
    #[serde(rename = "unusually low")]
    UnusuallyLow,
}

impl Anomaly {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::UnusuallyHigh => "unusually high",
            Self::UnusuallyLow => "unusually low",
        }
    }
}

/// One fully-enriched row of the final feature table.
///
/// Built by the clusterer from [`NeighborhoodFeatures`], then the anomaly
/// detector fills in the `anomaly` flag. Every loaded neighborhood appears
/// exactly once, zero-filled when it has no stops or routes.
///
/// [`NeighborhoodFeatures`]: crate::analysis::features::NeighborhoodFeatures
#[derive(Debug, Clone, Serialize)]
pub struct FeatureRow {
    pub neighborhood: String,
    pub stop_count: u32,
    pub route_diversity: u32,
    pub area_km2: f64,
    pub stop_density: f64,
    pub routes_per_km2: f64,
    pub cluster: usize,
    pub transit_score: f64,
    pub cluster_rank: usize,
    pub tier: Tier,
    pub anomaly: Anomaly,
}
