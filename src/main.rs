//! Entry point for the SF transit access analysis.
//!
//! Single-pass batch pipeline over three static data.sfgov.org exports:
//! loads stops, neighborhoods, and routes, assigns stops and routes to
//! neighborhoods spatially, builds per-neighborhood features, clusters them
//! into access tiers, flags score outliers, and renders the output artifacts.
//! No arguments; directories come from the environment.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use transit_access::analysis::anomaly::detect_anomalies;
use transit_access::analysis::cluster::{
    DEFAULT_K, ELBOW_RANGE, cluster_neighborhoods, sweep_inertia,
};
use transit_access::analysis::features::compute_features;
use transit_access::assign::{NeighborhoodIndex, assign_routes, assign_stops};
use transit_access::chart::{plot_elbow, plot_transit_scores};
use transit_access::load::{load_neighborhoods, load_routes, load_stops};
use transit_access::map::write_map;
use transit_access::output::{RunSummary, write_feature_table, write_summary};

const STOPS_FILE: &str = "Muni_Stops_20260223.csv";
const NEIGHBORHOODS_FILE: &str = "Analysis_Neighborhoods_20260223.csv";
const ROUTES_FILE: &str = "Muni_Simple_Routes_20260223.csv";

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/transit_access.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_access.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let data_dir = PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));
    let output_dir =
        PathBuf::from(std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "output".to_string()));

    run(&data_dir, &output_dir)
}

/// Runs the whole pipeline. All computation happens before any artifact is
/// written, so a failing run leaves no output behind.
#[tracing::instrument(skip_all, fields(data_dir = %data_dir.display(), output_dir = %output_dir.display()))]
fn run(data_dir: &Path, output_dir: &Path) -> Result<()> {
    let started = Instant::now();

    info!("Loading data");
    let stops = load_stops(data_dir.join(STOPS_FILE))?;
    let neighborhoods = load_neighborhoods(data_dir.join(NEIGHBORHOODS_FILE))?;
    let routes = load_routes(data_dir.join(ROUTES_FILE))?;

    info!("Assigning stops and routes to neighborhoods");
    let index = NeighborhoodIndex::build(&neighborhoods);
    let assigned_stops = assign_stops(stops, &index);
    let route_assignments = assign_routes(&routes, &index);

    info!("Running analysis");
    let features = compute_features(&assigned_stops, &route_assignments, &neighborhoods)?;
    let elbow_curve = sweep_inertia(&features, ELBOW_RANGE);
    let mut rows = cluster_neighborhoods(&features, DEFAULT_K)?;
    detect_anomalies(&mut rows);

    info!("Writing output artifacts");
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;
    let summary = RunSummary::new(
        &rows,
        DEFAULT_K,
        assigned_stops.len(),
        route_assignments.len(),
    );
    write_feature_table(output_dir.join("transit_features.csv"), &rows)?;
    write_summary(output_dir.join("run_summary.json"), &summary)?;
    plot_transit_scores(output_dir.join("transit_scores.png"), &rows)?;
    plot_elbow(output_dir.join("elbow_plot.png"), &elbow_curve)?;
    write_map(
        output_dir.join("transit_map.html"),
        &rows,
        &neighborhoods,
        &assigned_stops,
    )?;

    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        neighborhoods = rows.len(),
        "Analysis complete"
    );
    Ok(())
}
