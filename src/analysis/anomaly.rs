//! IQR-based outlier flagging on the composite transit score.

use tracing::info;

use crate::analysis::stats::quantile;
use crate::types::{Anomaly, FeatureRow};

const IQR_FENCE: f64 = 1.5;

/// Flags neighborhoods whose transit score falls strictly outside the Tukey
/// fences (Q1 − 1.5·IQR, Q3 + 1.5·IQR).
///
/// A robust rule with no normality assumption. Degrades gracefully: when all
/// scores are equal the IQR is zero, the fences collapse onto the scores, and
/// the strict comparisons flag nothing.
#[tracing::instrument(skip_all, fields(rows = rows.len()))]
pub fn detect_anomalies(rows: &mut [FeatureRow]) {
    if rows.is_empty() {
        return;
    }

    let mut scores: Vec<f64> = rows.iter().map(|r| r.transit_score).collect();
    scores.sort_by(f64::total_cmp);
    let q1 = quantile(&scores, 0.25);
    let q3 = quantile(&scores, 0.75);
    let iqr = q3 - q1;
    let lower = q1 - IQR_FENCE * iqr;
    let upper = q3 + IQR_FENCE * iqr;

    let mut flagged = 0usize;
    for row in rows.iter_mut() {
        row.anomaly = if row.transit_score > upper {
            Anomaly::UnusuallyHigh
        } else if row.transit_score < lower {
            Anomaly::UnusuallyLow
        } else {
            Anomaly::Normal
        };
        if row.anomaly != Anomaly::Normal {
            flagged += 1;
            info!(
                neighborhood = %row.neighborhood,
                anomaly = row.anomaly.as_str(),
                score = row.transit_score,
                "Transit score outlier"
            );
        }
    }

    info!(flagged, lower, upper, "Anomaly detection complete");
}
