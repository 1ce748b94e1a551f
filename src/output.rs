//! Output artifacts: the feature-table CSV and the run-summary JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::info;

use crate::types::{Anomaly, FeatureRow};

/// One flagged outlier in the run summary.
#[derive(Debug, Serialize)]
pub struct AnomalyNote {
    pub neighborhood: String,
    pub anomaly: Anomaly,
    pub transit_score: f64,
}

/// Machine-readable run summary written next to the charts.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub k: usize,
    pub neighborhoods: usize,
    pub stops_assigned: usize,
    pub route_assignments: usize,
    pub tier_counts: BTreeMap<&'static str, usize>,
    pub anomalies: Vec<AnomalyNote>,
}

impl RunSummary {
    pub fn new(
        rows: &[FeatureRow],
        k: usize,
        stops_assigned: usize,
        route_assignments: usize,
    ) -> Self {
        let mut tier_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for row in rows {
            *tier_counts.entry(row.tier.as_str()).or_default() += 1;
        }

        let anomalies = rows
            .iter()
            .filter(|r| r.anomaly != Anomaly::Normal)
            .map(|r| AnomalyNote {
                neighborhood: r.neighborhood.clone(),
                anomaly: r.anomaly,
                transit_score: r.transit_score,
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            k,
            neighborhoods: rows.len(),
            stops_assigned,
            route_assignments,
            tier_counts,
            anomalies,
        }
    }
}

/// Writes the full feature table as CSV, one row per neighborhood.
pub fn write_feature_table(path: impl AsRef<Path>, rows: &[FeatureRow]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "Feature table written");
    Ok(())
}

/// Writes the run summary as pretty-printed JSON.
pub fn write_summary(path: impl AsRef<Path>, summary: &RunSummary) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;

    info!(path = %path.display(), "Run summary written");
    Ok(())
}
