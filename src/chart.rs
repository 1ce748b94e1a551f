//! Chart rendering: the ranked transit-score bar chart and the elbow
//! diagnostic, both PNG via plotters.

use std::path::Path;

use anyhow::{Context, Result};
use plotters::prelude::*;
use tracing::{info, warn};

use crate::types::{FeatureRow, Tier};

const ELBOW_BLUE: RGBColor = RGBColor(0x21, 0x96, 0xF3);

fn tier_color(tier: Tier) -> RGBColor {
    let (r, g, b) = tier.color_rgb();
    RGBColor(r, g, b)
}

/// Renders the horizontal bar chart of neighborhoods ranked ascending by
/// transit score, colored by tier.
#[tracing::instrument(skip(path, rows), fields(rows = rows.len()))]
pub fn plot_transit_scores(path: impl AsRef<Path>, rows: &[FeatureRow]) -> Result<()> {
    let path = path.as_ref();
    if rows.is_empty() {
        warn!("No rows to chart, skipping bar chart");
        return Ok(());
    }

    let mut sorted: Vec<&FeatureRow> = rows.iter().collect();
    sorted.sort_by(|a, b| a.transit_score.total_cmp(&b.transit_score));

    let n = sorted.len() as i32;
    let x_max = sorted
        .iter()
        .map(|r| r.transit_score)
        .fold(0.0, f64::max)
        .max(1.0)
        * 1.05;
    let names: Vec<&str> = sorted.iter().map(|r| r.neighborhood.as_str()).collect();

    let height = (sorted.len() as u32 * 22 + 160).max(400);
    let root = BitMapBackend::new(path, (1000, height)).into_drawing_area();
    root.fill(&WHITE)
        .with_context(|| format!("rendering {}", path.display()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "sf neighborhoods ranked by transit access",
            ("sans-serif", 24),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(220)
        .build_cartesian_2d(0.0..x_max, (0..n).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc("transit score")
        .y_labels(sorted.len())
        .y_label_formatter(&|segment| match segment {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => names
                .get(*i as usize)
                .map(|s| (*s).to_string())
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        })
        .draw()?;

    for tier in Tier::ALL {
        let color = tier_color(tier);
        chart
            .draw_series(
                sorted
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| r.tier == tier)
                    .map(|(i, r)| {
                        let i = i as i32;
                        Rectangle::new(
                            [
                                (0.0, SegmentValue::Exact(i)),
                                (r.transit_score, SegmentValue::Exact(i + 1)),
                            ],
                            color.filled(),
                        )
                    }),
            )?
            .label(tier.as_str())
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
            });
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .draw()?;

    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "Transit score chart written");
    Ok(())
}

/// Renders the inertia-vs-k elbow curve.
#[tracing::instrument(skip(path, curve), fields(points = curve.len()))]
pub fn plot_elbow(path: impl AsRef<Path>, curve: &[(usize, f64)]) -> Result<()> {
    let path = path.as_ref();
    if curve.is_empty() {
        warn!("Empty elbow sweep, skipping elbow chart");
        return Ok(());
    }

    let k_min = curve[0].0 as f64;
    let k_max = curve[curve.len() - 1].0 as f64;
    let y_max = curve
        .iter()
        .map(|(_, inertia)| *inertia)
        .fold(0.0, f64::max)
        .max(1.0)
        * 1.1;

    let root = BitMapBackend::new(path, (640, 420)).into_drawing_area();
    root.fill(&WHITE)
        .with_context(|| format!("rendering {}", path.display()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("elbow method for optimal k", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((k_min - 0.5)..(k_max + 0.5), 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("number of clusters (k)")
        .y_desc("inertia")
        .draw()?;

    chart.draw_series(LineSeries::new(
        curve.iter().map(|(k, inertia)| (*k as f64, *inertia)),
        &ELBOW_BLUE,
    ))?;
    chart.draw_series(
        curve
            .iter()
            .map(|(k, inertia)| Circle::new((*k as f64, *inertia), 4, ELBOW_BLUE.filled())),
    )?;

    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "Elbow chart written");
    Ok(())
}
