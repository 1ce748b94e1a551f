//! K-means clustering of the neighborhood feature table into access tiers.
//!
//! Features are z-scored before fitting because the raw columns differ by
//! orders of magnitude (counts vs per-km2 densities). The fit is fully
//! deterministic: fixed seed, fixed number of k-means++ restarts, best
//! inertia wins.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use anyhow::{Result, anyhow, bail};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::analysis::features::NeighborhoodFeatures;
use crate::analysis::stats::standardize_columns;
use crate::analysis::tier::{MAX_TIERS, tier_for_rank};
use crate::types::{Anomaly, FeatureRow};

/// Default number of clusters; one per named tier.
pub const DEFAULT_K: usize = 4;

/// Diagnostic k sweep for the elbow chart.
pub const ELBOW_RANGE: RangeInclusive<usize> = 2..=8;

const SEED: u64 = 42;
const N_INIT: usize = 10;
const MAX_ITER: usize = 300;

/// Composite-score weights. Density of service outweighs raw counts.
const WEIGHT_STOP_DENSITY: f64 = 0.4;
const WEIGHT_ROUTES_PER_KM2: f64 = 0.3;
const WEIGHT_STOP_COUNT: f64 = 0.2;
const WEIGHT_ROUTE_DIVERSITY: f64 = 0.1;

/// Fixed-weight composite transit access score over the raw features.
pub fn transit_score(features: &NeighborhoodFeatures) -> f64 {
    features.stop_density * WEIGHT_STOP_DENSITY
        + features.routes_per_km2 * WEIGHT_ROUTES_PER_KM2
        + f64::from(features.stop_count) * WEIGHT_STOP_COUNT
        + f64::from(features.route_diversity) * WEIGHT_ROUTE_DIVERSITY
}

/// Clusters the feature table into `k` groups and derives score, rank, and
/// tier for every neighborhood.
///
/// Cluster labels are arbitrary; `cluster_rank` reorders them by mean
/// transit score descending so rank 0 is always the best-served group, and
/// the tier name follows the rank.
///
/// # Errors
///
/// Rejects degenerate configurations before fitting: `k < 2`, `k` beyond the
/// tier-name table, or fewer distinct feature vectors than `k`.
#[tracing::instrument(skip(features), fields(rows = features.len(), k))]
pub fn cluster_neighborhoods(
    features: &[NeighborhoodFeatures],
    k: usize,
) -> Result<Vec<FeatureRow>> {
    let matrix = feature_matrix(features);
    validate_k(k, distinct_rows(&matrix))?;

    let scaled = standardize_rows(&matrix);
    let fit = fit_kmeans(&scaled, k, SEED, N_INIT, MAX_ITER);
    debug!(inertia = fit.inertia, "K-means converged");

    let scores: Vec<f64> = features.iter().map(transit_score).collect();
    let rank_of_cluster = rank_clusters(&fit.labels, &scores, k);

    let mut rows = Vec::with_capacity(features.len());
    for (i, f) in features.iter().enumerate() {
        let cluster = fit.labels[i];
        let cluster_rank = rank_of_cluster[cluster];
        let tier = tier_for_rank(cluster_rank)
            .ok_or_else(|| anyhow!("no tier name for cluster rank {cluster_rank}"))?;
        rows.push(FeatureRow {
            neighborhood: f.neighborhood.clone(),
            stop_count: f.stop_count,
            route_diversity: f.route_diversity,
            area_km2: f.area_km2,
            stop_density: f.stop_density,
            routes_per_km2: f.routes_per_km2,
            cluster,
            transit_score: scores[i],
            cluster_rank,
            tier,
            anomaly: Anomaly::Normal,
        });
    }

    info!(rows = rows.len(), k, "Neighborhoods clustered into tiers");
    Ok(rows)
}

/// Inertia per k over the diagnostic sweep range, for the elbow chart.
///
/// Informational only; never feeds back into cluster selection. Sweep values
/// the dataset cannot support (more clusters than distinct rows) are skipped.
#[tracing::instrument(skip(features), fields(rows = features.len()))]
pub fn sweep_inertia(
    features: &[NeighborhoodFeatures],
    range: RangeInclusive<usize>,
) -> Vec<(usize, f64)> {
    let matrix = feature_matrix(features);
    let distinct = distinct_rows(&matrix);
    let scaled = standardize_rows(&matrix);

    let mut curve = Vec::new();
    for k in range {
        if k < 2 || k > distinct {
            continue;
        }
        let fit = fit_kmeans(&scaled, k, SEED, N_INIT, MAX_ITER);
        curve.push((k, fit.inertia));
    }

    debug!(points = curve.len(), "Elbow sweep complete");
    curve
}

/// Feature matrix columns, in order: stop_count, stop_density,
/// route_diversity, routes_per_km2.
fn feature_matrix(features: &[NeighborhoodFeatures]) -> Vec<Vec<f64>> {
    features
        .iter()
        .map(|f| {
            vec![
                f64::from(f.stop_count),
                f.stop_density,
                f64::from(f.route_diversity),
                f.routes_per_km2,
            ]
        })
        .collect()
}

fn standardize_rows(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    if matrix.is_empty() {
        return Vec::new();
    }
    let width = matrix[0].len();
    let columns: Vec<Vec<f64>> = (0..width)
        .map(|c| matrix.iter().map(|row| row[c]).collect())
        .collect();
    let standardized = standardize_columns(&columns);

    (0..matrix.len())
        .map(|r| standardized.iter().map(|col| col[r]).collect())
        .collect()
}

fn distinct_rows(matrix: &[Vec<f64>]) -> usize {
    let mut seen: HashSet<Vec<u64>> = HashSet::new();
    for row in matrix {
        seen.insert(row.iter().map(|v| v.to_bits()).collect());
    }
    seen.len()
}

fn validate_k(k: usize, distinct: usize) -> Result<()> {
    if k < 2 {
        bail!("k must be at least 2, got {k}");
    }
    if k > MAX_TIERS {
        bail!("k must be at most {MAX_TIERS} (one cluster per tier name), got {k}");
    }
    if distinct < k {
        bail!("cannot form {k} clusters from {distinct} distinct feature vectors");
    }
    Ok(())
}

/// Maps each cluster label to its rank by mean transit score, descending.
/// Rank 0 is the best-served cluster. Ties and empty clusters break by label
/// so the mapping stays deterministic.
fn rank_clusters(labels: &[usize], scores: &[f64], k: usize) -> Vec<usize> {
    let mut sums = vec![0.0f64; k];
    let mut counts = vec![0usize; k];
    for (label, score) in labels.iter().zip(scores) {
        sums[*label] += score;
        counts[*label] += 1;
    }

    let means: Vec<f64> = (0..k)
        .map(|c| {
            if counts[c] == 0 {
                f64::NEG_INFINITY
            } else {
                sums[c] / counts[c] as f64
            }
        })
        .collect();

    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| means[b].total_cmp(&means[a]).then(a.cmp(&b)));

    let mut rank_of_cluster = vec![0usize; k];
    for (rank, cluster) in order.into_iter().enumerate() {
        rank_of_cluster[cluster] = rank;
    }
    rank_of_cluster
}

struct KMeansFit {
    labels: Vec<usize>,
    inertia: f64,
}

/// Seeded k-means: `n_init` k-means++ initializations, Lloyd iterations,
/// keep the run with the lowest inertia.
fn fit_kmeans(data: &[Vec<f64>], k: usize, seed: u64, n_init: usize, max_iter: usize) -> KMeansFit {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut best: Option<KMeansFit> = None;

    for _ in 0..n_init {
        let centers = kmeans_pp_init(data, k, &mut rng);
        let fit = lloyd(data, centers, max_iter);
        if best.as_ref().is_none_or(|b| fit.inertia < b.inertia) {
            best = Some(fit);
        }
    }

    // n_init >= 1 and data is non-empty by validation, so a fit always exists
    best.unwrap_or(KMeansFit {
        labels: vec![0; data.len()],
        inertia: 0.0,
    })
}

/// K-means++ seeding: first center uniform, the rest sampled proportionally
/// to squared distance from the nearest chosen center.
fn kmeans_pp_init(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centers: Vec<Vec<f64>> = Vec::with_capacity(k);
    let first = rng.gen_range(0..data.len());
    centers.push(data[first].clone());

    let mut dists: Vec<f64> = data.iter().map(|p| sq_dist(p, &centers[0])).collect();
    while centers.len() < k {
        let total: f64 = dists.iter().sum();
        let chosen = if total <= 0.0 {
            // All remaining points coincide with a center; any pick works
            rng.gen_range(0..data.len())
        } else {
            let mut target = rng.r#gen::<f64>() * total;
            let mut index = data.len() - 1;
            for (i, d) in dists.iter().enumerate() {
                target -= d;
                if target <= 0.0 {
                    index = i;
                    break;
                }
            }
            index
        };

        let center = data[chosen].clone();
        for (i, p) in data.iter().enumerate() {
            let d = sq_dist(p, &center);
            if d < dists[i] {
                dists[i] = d;
            }
        }
        centers.push(center);
    }

    centers
}

fn lloyd(data: &[Vec<f64>], mut centers: Vec<Vec<f64>>, max_iter: usize) -> KMeansFit {
    let k = centers.len();
    let width = centers[0].len();
    let mut labels = vec![usize::MAX; data.len()];

    for _ in 0..max_iter {
        let mut changed = false;
        for (i, point) in data.iter().enumerate() {
            let nearest = nearest_center(point, &centers);
            if labels[i] != nearest {
                labels[i] = nearest;
                changed = true;
            }
        }

        let mut sums = vec![vec![0.0f64; width]; k];
        let mut counts = vec![0usize; k];
        for (point, &label) in data.iter().zip(&labels) {
            for (d, v) in point.iter().enumerate() {
                sums[label][d] += v;
            }
            counts[label] += 1;
        }
        for c in 0..k {
            // Empty clusters keep their previous center
            if counts[c] > 0 {
                for d in 0..width {
                    centers[c][d] = sums[c][d] / counts[c] as f64;
                }
            }
        }

        if !changed {
            break;
        }
    }

    let inertia = data
        .iter()
        .zip(&labels)
        .map(|(point, &label)| sq_dist(point, &centers[label]))
        .sum();

    KMeansFit { labels, inertia }
}

fn nearest_center(point: &[f64], centers: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (c, center) in centers.iter().enumerate() {
        let d = sq_dist(point, center);
        if d < best_dist {
            best_dist = d;
            best = c;
        }
    }
    best
}

fn sq_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}
