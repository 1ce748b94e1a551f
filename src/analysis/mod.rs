//! Feature engineering, clustering, and anomaly detection.
//!
//! The analytical core of the pipeline: turns spatial assignments into a
//! per-neighborhood feature table, clusters it into access tiers, and flags
//! statistical outliers.

pub mod anomaly;
pub mod cluster;
pub mod features;
pub mod stats;
pub mod tier;
