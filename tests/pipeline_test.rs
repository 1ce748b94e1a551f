//! End-to-end pipeline test over synthetic CSV exports.

use std::fs;
use std::path::PathBuf;

use transit_access::analysis::anomaly::detect_anomalies;
use transit_access::analysis::cluster::cluster_neighborhoods;
use transit_access::analysis::features::compute_features;
use transit_access::assign::{NeighborhoodIndex, assign_routes, assign_stops};
use transit_access::load::{load_neighborhoods, load_routes, load_stops};
use transit_access::output::write_feature_table;
use transit_access::types::Anomaly;

fn fixture_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("transit_access_pipeline_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Three adjacent square neighborhoods around the SF longitude band.
/// Downtown is dense, Outer is sparse, Quiet has no service at all.
fn write_fixtures(dir: &PathBuf) -> (PathBuf, PathBuf, PathBuf) {
    let neighborhoods = dir.join("neighborhoods.csv");
    fs::write(
        &neighborhoods,
        "nhood,the_geom\n\
         Downtown,\"POLYGON ((-122.42 37.74, -122.40 37.74, -122.40 37.76, -122.42 37.76, -122.42 37.74))\"\n\
         Outer,\"POLYGON ((-122.44 37.74, -122.42 37.74, -122.42 37.76, -122.44 37.76, -122.44 37.74))\"\n\
         Quiet,\"POLYGON ((-122.46 37.74, -122.44 37.74, -122.44 37.76, -122.46 37.76, -122.46 37.74))\"\n",
    )
    .unwrap();

    let stops = dir.join("stops.csv");
    let mut stop_rows = String::from("STOPID,STOPNAME,LATITUDE,LONGITUDE\n");
    // Eight stops inside Downtown
    for i in 0..8 {
        let lon = -122.418 + f64::from(i) * 0.002;
        stop_rows.push_str(&format!("{},Downtown stop {i},37.75,{lon}\n", 1000 + i));
    }
    // Two stops inside Outer
    stop_rows.push_str("2000,Outer stop 0,37.75,-122.435\n");
    stop_rows.push_str("2001,Outer stop 1,37.75,-122.425\n");
    // One stop far outside every polygon: must be dropped
    stop_rows.push_str("3000,Ocean stop,37.75,-123.50\n");
    fs::write(&stops, stop_rows).unwrap();

    let routes = dir.join("routes.csv");
    fs::write(
        &routes,
        "ROUTE_NAME,DIRECTION,SERVICE_CA,shape\n\
         10 CROSSTOWN,IB,Frequent Local,\"LINESTRING (-122.435 37.75, -122.405 37.75)\"\n\
         10 CROSSTOWN,OB,Frequent Local,\"LINESTRING (-122.405 37.752, -122.435 37.752)\"\n\
         20 DOWNTOWN,IB,Rapid,\"LINESTRING (-122.415 37.745, -122.405 37.755)\"\n",
    )
    .unwrap();

    (stops, neighborhoods, routes)
}

#[test]
fn test_full_pipeline() {
    let dir = fixture_dir();
    let (stops_path, neighborhoods_path, routes_path) = write_fixtures(&dir);

    let stops = load_stops(&stops_path).unwrap();
    let neighborhoods = load_neighborhoods(&neighborhoods_path).unwrap();
    let routes = load_routes(&routes_path).unwrap();
    assert_eq!(stops.len(), 11);
    assert_eq!(neighborhoods.len(), 3);
    assert_eq!(routes.len(), 3);

    let index = NeighborhoodIndex::build(&neighborhoods);
    let assigned_stops = assign_stops(stops, &index);
    let route_assignments = assign_routes(&routes, &index);

    // The ocean stop is outside every polygon and must be gone
    assert_eq!(assigned_stops.len(), 10);
    assert!(assigned_stops.iter().all(|s| s.stop.stop_id != "3000"));

    let features = compute_features(&assigned_stops, &route_assignments, &neighborhoods).unwrap();

    // Cardinality invariant: every neighborhood exactly once, in load order
    let names: Vec<&str> = features.iter().map(|f| f.neighborhood.as_str()).collect();
    assert_eq!(names, vec!["Downtown", "Outer", "Quiet"]);

    let downtown = &features[0];
    let outer = &features[1];
    let quiet = &features[2];
    assert_eq!(downtown.stop_count, 8);
    // Crosstown (both directions) and the downtown rapid: 2 distinct routes
    assert_eq!(downtown.route_diversity, 2);
    assert_eq!(outer.stop_count, 2);
    assert_eq!(outer.route_diversity, 1);
    // Quiet is zero-filled, never dropped
    assert_eq!(quiet.stop_count, 0);
    assert_eq!(quiet.route_diversity, 0);
    for f in &features {
        assert!(f.area_km2 > 0.0);
    }

    let mut rows = cluster_neighborhoods(&features, 2).unwrap();
    detect_anomalies(&mut rows);

    assert_eq!(rows.len(), 3);
    let score = |name: &str| {
        rows.iter()
            .find(|r| r.neighborhood == name)
            .unwrap()
            .transit_score
    };
    assert!(score("Downtown") > score("Outer"));
    assert!(score("Outer") > score("Quiet"));

    // Re-running clustering yields the identical assignment
    let again = cluster_neighborhoods(&features, 2).unwrap();
    for (a, b) in rows.iter().zip(&again) {
        assert_eq!(a.cluster, b.cluster);
        assert_eq!(a.cluster_rank, b.cluster_rank);
        assert_eq!(a.tier, b.tier);
    }

    // With three tightly grouped scores nothing should be flagged
    let flagged = rows.iter().filter(|r| r.anomaly != Anomaly::Normal).count();
    assert!(flagged <= 1);

    let table_path = dir.join("transit_features.csv");
    write_feature_table(&table_path, &rows).unwrap();
    let table = fs::read_to_string(&table_path).unwrap();
    assert_eq!(table.lines().count(), 4);
    assert!(table.contains("Quiet"));

    fs::remove_dir_all(&dir).unwrap();
}
