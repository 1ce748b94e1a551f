//! Spatial assignment of stops and routes to neighborhoods.
//!
//! Builds an R-tree over neighborhood boundaries once, then answers
//! point-in-polygon lookups for stops and intersection queries for routes.
//! The envelope prefilter keeps the exact geometry tests to the handful of
//! candidates whose bounding boxes actually overlap.

use geo::{BoundingRect, Contains, Intersects, MultiPolygon, Point};
use rstar::{AABB, RTree, RTreeObject};
use tracing::{debug, info};

use crate::types::{AssignedStop, Neighborhood, Route, RouteAssignment, Stop};

/// A neighborhood boundary stored in the R-tree with its name.
struct NeighborhoodEntry {
    name: String,
    envelope: AABB<[f64; 2]>,
    boundary: MultiPolygon<f64>,
}

impl RTreeObject for NeighborhoodEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built spatial index over neighborhood boundaries.
///
/// Constructed once per run; all assignment queries go through it.
pub struct NeighborhoodIndex {
    tree: RTree<NeighborhoodEntry>,
}

impl NeighborhoodIndex {
    pub fn build(neighborhoods: &[Neighborhood]) -> Self {
        let entries = neighborhoods
            .iter()
            .map(|n| NeighborhoodEntry {
                name: n.name.clone(),
                envelope: boundary_envelope(&n.boundary),
                boundary: n.boundary.clone(),
            })
            .collect();
        let tree = RTree::bulk_load(entries);
        debug!(size = tree.size(), "Neighborhood spatial index built");
        Self { tree }
    }

    /// Finds the neighborhood strictly containing a point.
    ///
    /// Neighborhoods are expected to partition the city without overlap, so
    /// the first containing polygon wins.
    fn containing(&self, point: Point<f64>) -> Option<&str> {
        let query = AABB::from_point([point.x(), point.y()]);
        self.tree
            .locate_in_envelope_intersecting(&query)
            .find(|entry| entry.boundary.contains(&point))
            .map(|entry| entry.name.as_str())
    }

    /// All neighborhoods whose boundary shares at least one point with the
    /// route shape. A shape that only touches a boundary still counts.
    fn crossed_by<'a>(&'a self, route: &'a Route) -> impl Iterator<Item = &'a str> {
        let query = route
            .shape
            .bounding_rect()
            .map_or_else(
                || AABB::from_point([0.0, 0.0]),
                |rect| {
                    AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    )
                },
            );
        self.tree
            .locate_in_envelope_intersecting(&query)
            .filter(|entry| route.shape.intersects(&entry.boundary))
            .map(|entry| entry.name.as_str())
    }
}

/// Maps each stop to the neighborhood containing it.
///
/// Stops outside every boundary are dropped, not kept as unassigned.
#[tracing::instrument(skip_all, fields(stops = stops.len()))]
pub fn assign_stops(stops: Vec<Stop>, index: &NeighborhoodIndex) -> Vec<AssignedStop> {
    let total = stops.len();
    let assigned: Vec<AssignedStop> = stops
        .into_iter()
        .filter_map(|stop| {
            index
                .containing(stop.location)
                .map(|name| name.to_string())
                .map(|neighborhood| AssignedStop { stop, neighborhood })
        })
        .collect();

    let dropped = total - assigned.len();
    if dropped > 0 {
        debug!(dropped, "Stops outside every neighborhood were dropped");
    }
    info!(assigned = assigned.len(), dropped, "Stops assigned");
    assigned
}

/// Produces one record per (neighborhood, route) intersecting pair.
///
/// Multiplicity is preserved: a route name appearing in several patterns
/// yields several records. Distinct-route collapsing happens in the feature
/// builder.
#[tracing::instrument(skip_all, fields(routes = routes.len()))]
pub fn assign_routes(routes: &[Route], index: &NeighborhoodIndex) -> Vec<RouteAssignment> {
    let mut assignments = Vec::new();
    for route in routes {
        for neighborhood in index.crossed_by(route) {
            assignments.push(RouteAssignment {
                neighborhood: neighborhood.to_string(),
                route: route.name.clone(),
                service_category: route.service_category.clone(),
            });
        }
    }

    info!(records = assignments.len(), "Route assignments computed");
    assignments
}

fn boundary_envelope(boundary: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    boundary.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{parse_wkt_line, parse_wkt_polygon};

    fn square(name: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> Neighborhood {
        let wkt = format!(
            "POLYGON (({x0} {y0}, {x1} {y0}, {x1} {y1}, {x0} {y1}, {x0} {y0}))"
        );
        Neighborhood {
            name: name.to_string(),
            boundary: parse_wkt_polygon(&wkt).unwrap(),
        }
    }

    fn stop(id: &str, lon: f64, lat: f64) -> Stop {
        Stop {
            stop_id: id.to_string(),
            name: format!("stop {id}"),
            location: Point::new(lon, lat),
        }
    }

    fn route(name: &str, wkt: &str) -> Route {
        Route {
            name: name.to_string(),
            direction: "IB".to_string(),
            service_category: "Local".to_string(),
            shape: parse_wkt_line(wkt).unwrap(),
        }
    }

    #[test]
    fn test_assign_stops_point_in_polygon() {
        let neighborhoods = vec![square("West", 0.0, 0.0, 1.0, 1.0), square("East", 1.0, 0.0, 2.0, 1.0)];
        let index = NeighborhoodIndex::build(&neighborhoods);

        let assigned = assign_stops(
            vec![stop("a", 0.5, 0.5), stop("b", 1.5, 0.5)],
            &index,
        );

        assert_eq!(assigned.len(), 2);
        assert_eq!(assigned[0].neighborhood, "West");
        assert_eq!(assigned[1].neighborhood, "East");
    }

    #[test]
    fn test_assign_stops_drops_outside_points() {
        let neighborhoods = vec![square("Only", 0.0, 0.0, 1.0, 1.0)];
        let index = NeighborhoodIndex::build(&neighborhoods);

        let assigned = assign_stops(
            vec![stop("inside", 0.5, 0.5), stop("outside", 5.0, 5.0)],
            &index,
        );

        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].stop.stop_id, "inside");
    }

    #[test]
    fn test_assign_routes_one_record_per_crossed_neighborhood() {
        let neighborhoods = vec![
            square("West", 0.0, 0.0, 1.0, 1.0),
            square("East", 1.0, 0.0, 2.0, 1.0),
            square("Far", 10.0, 10.0, 11.0, 11.0),
        ];
        let index = NeighborhoodIndex::build(&neighborhoods);

        let crosstown = route("crosstown", "LINESTRING (0.2 0.5, 1.8 0.5)");
        let assignments = assign_routes(&[crosstown], &index);

        let mut touched: Vec<&str> =
            assignments.iter().map(|a| a.neighborhood.as_str()).collect();
        touched.sort_unstable();
        assert_eq!(touched, vec!["East", "West"]);
    }

    #[test]
    fn test_assign_routes_boundary_touch_counts() {
        let neighborhoods = vec![square("Edge", 0.0, 0.0, 1.0, 1.0)];
        let index = NeighborhoodIndex::build(&neighborhoods);

        // Runs exactly along the eastern boundary without entering
        let grazing = route("grazing", "LINESTRING (1.0 0.0, 1.0 1.0)");
        let assignments = assign_routes(&[grazing], &index);

        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].neighborhood, "Edge");
    }

    #[test]
    fn test_assign_routes_preserves_multiplicity() {
        let neighborhoods = vec![square("Only", 0.0, 0.0, 1.0, 1.0)];
        let index = NeighborhoodIndex::build(&neighborhoods);

        // Same route name twice, one per direction, both crossing
        let inbound = route("14 MISSION", "LINESTRING (0.1 0.5, 0.9 0.5)");
        let outbound = route("14 MISSION", "LINESTRING (0.9 0.4, 0.1 0.4)");
        let assignments = assign_routes(&[inbound, outbound], &index);

        assert_eq!(assignments.len(), 2);
    }
}
