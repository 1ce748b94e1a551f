//! Per-neighborhood transit access features.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, ensure};
use serde::Serialize;
use tracing::info;

use crate::geometry::area_km2;
use crate::types::{AssignedStop, Neighborhood, RouteAssignment};

/// Raw features for one neighborhood, before clustering.
#[derive(Debug, Clone, Serialize)]
pub struct NeighborhoodFeatures {
    pub neighborhood: String,
    pub stop_count: u32,
    pub route_diversity: u32,
    pub area_km2: f64,
    pub stop_density: f64,
    pub routes_per_km2: f64,
}

/// Builds the feature table, one row per loaded neighborhood.
///
/// Neighborhoods with no stops or routes are zero-filled, never dropped: the
/// final table must account for every neighborhood. Counts come from the
/// spatial assignment, route_diversity collapses repeated route names to a
/// distinct count, and densities divide by the projected area.
///
/// # Errors
///
/// Fails on degenerate boundary polygons or non-finite derived densities,
/// both of which signal broken source data.
#[tracing::instrument(skip_all, fields(neighborhoods = neighborhoods.len()))]
pub fn compute_features(
    assigned_stops: &[AssignedStop],
    route_assignments: &[RouteAssignment],
    neighborhoods: &[Neighborhood],
) -> Result<Vec<NeighborhoodFeatures>> {
    let mut stop_counts: BTreeMap<&str, u32> = BTreeMap::new();
    for assigned in assigned_stops {
        *stop_counts.entry(assigned.neighborhood.as_str()).or_default() += 1;
    }

    let mut distinct_routes: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for assignment in route_assignments {
        distinct_routes
            .entry(assignment.neighborhood.as_str())
            .or_default()
            .insert(assignment.route.as_str());
    }

    let mut rows = Vec::with_capacity(neighborhoods.len());
    for neighborhood in neighborhoods {
        let name = neighborhood.name.as_str();
        let area = area_km2(name, &neighborhood.boundary)?;
        let stop_count = stop_counts.get(name).copied().unwrap_or(0);
        let route_diversity = distinct_routes.get(name).map_or(0, |set| set.len() as u32);

        let stop_density = f64::from(stop_count) / area;
        let routes_per_km2 = f64::from(route_diversity) / area;
        ensure!(
            stop_density.is_finite() && routes_per_km2.is_finite(),
            "non-finite density for neighborhood {name:?} (area {area} km^2)"
        );

        rows.push(NeighborhoodFeatures {
            neighborhood: neighborhood.name.clone(),
            stop_count,
            route_diversity,
            area_km2: area,
            stop_density,
            routes_per_km2,
        });
    }

    info!(rows = rows.len(), "Feature table computed");
    Ok(rows)
}
