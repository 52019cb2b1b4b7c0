//! Semantic archetype assignment.
//!
//! Cluster indices are arbitrary (they depend on initialization order),
//! so labels come from where each centroid sits in standardized feature
//! space on the (MaxDrawdown, ResetVelocity) axes. A centroid above the
//! season mean on MaxDrawdown has shallower-than-average losses; above
//! the mean on ResetVelocity it recovers faster than average.

use pacelab_core::domain::profile::feature;
use pacelab_core::domain::Archetype;

use crate::cluster::{squared_distance, Clustering};

/// Label one standardized centroid by its quadrant.
pub fn label_centroid(centroid: &[f64; feature::COUNT]) -> Archetype {
    let shallow = centroid[feature::MAX_DRAWDOWN] >= 0.0;
    let fast = centroid[feature::RESET_VELOCITY] >= 0.0;
    match (shallow, fast) {
        (true, true) => Archetype::EntropyKing,
        (false, true) => Archetype::ElasticAggressor,
        (true, false) => Archetype::SteadyOperator,
        (false, false) => Archetype::BrittlePerformer,
    }
}

/// Archetype per cluster index, in centroid order.
pub fn label_clusters(clustering: &Clustering) -> Vec<Archetype> {
    clustering.centroids.iter().map(label_centroid).collect()
}

/// Assignment confidence for one row: `1 - d_own / (d_own + d_next)`,
/// where `d_next` is the distance to the nearest *other* centroid.
/// Clipped to [0, 1]; a single-cluster fit is always 1.0.
pub fn assignment_confidence(
    row: &[f64; feature::COUNT],
    cluster: usize,
    clustering: &Clustering,
) -> f64 {
    if clustering.centroids.len() < 2 {
        return 1.0;
    }
    let d_own = squared_distance(row, &clustering.centroids[cluster]).sqrt();
    let d_next = clustering
        .centroids
        .iter()
        .enumerate()
        .filter(|(c, _)| *c != cluster)
        .map(|(_, centroid)| squared_distance(row, centroid).sqrt())
        .fold(f64::INFINITY, f64::min);

    let total = d_own + d_next;
    if total <= 1e-12 {
        // Row coincides with two centroids at once.
        return 1.0;
    }
    (1.0 - d_own / total).clamp(0.0, 1.0)
}
