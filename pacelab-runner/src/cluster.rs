//! Deterministic k-means over standardized season features.
//!
//! Seeds are derived via BLAKE3 from the master seed and the
//! (attempt, restart) pair, so results are identical across runs and
//! independent of thread scheduling. Each attempt runs a batch of
//! restarts and keeps the converged run with the lowest inertia; if no
//! restart converges the attempt is retried with fresh sub-seeds, up to
//! a bounded retry limit.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pacelab_core::domain::profile::feature;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("no feature rows to cluster")]
    EmptyInput,
    #[error("k-means failed to converge after {attempts} attempts of {restarts} restarts")]
    NonConvergence { attempts: u32, restarts: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Number of archetypes. Clamped to the driver count at fit time.
    pub k: usize,
    /// Independent initializations per attempt; lowest inertia wins.
    pub restarts: u32,
    /// Lloyd iteration cap per restart.
    pub max_iterations: u32,
    /// Master seed for the BLAKE3 sub-seed derivation.
    pub seed: u64,
    /// Whole-batch retries before giving up with `NonConvergence`.
    pub retry_limit: u32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            k: 4,
            restarts: 10,
            max_iterations: 100,
            seed: 42,
            retry_limit: 3,
        }
    }
}

/// Derives per-(attempt, restart) sub-seeds from the master seed.
///
/// Hash-based derivation keeps every restart's RNG stream independent of
/// the order restarts are evaluated in.
#[derive(Debug, Clone)]
pub struct ClusterSeeds {
    master_seed: u64,
}

impl ClusterSeeds {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn sub_seed(&self, attempt: u32, restart: u32) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(&attempt.to_le_bytes());
        hasher.update(&restart.to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn rng_for(&self, attempt: u32, restart: u32) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(attempt, restart))
    }
}

/// A converged clustering of the feature rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clustering {
    /// Cluster index per input row.
    pub assignments: Vec<usize>,
    pub centroids: Vec<[f64; feature::COUNT]>,
    /// Sum of squared distances from each row to its centroid.
    pub inertia: f64,
    /// Effective cluster count after clamping to the row count.
    pub k: usize,
}

pub struct KMeans<'a> {
    config: &'a ClusterConfig,
    seeds: ClusterSeeds,
}

impl<'a> KMeans<'a> {
    pub fn new(config: &'a ClusterConfig) -> Self {
        let seeds = ClusterSeeds::new(config.seed);
        Self { config, seeds }
    }

    /// Cluster the rows, retrying the full restart batch on
    /// non-convergence up to the configured limit.
    pub fn fit(&self, rows: &[[f64; feature::COUNT]]) -> Result<Clustering, ClusterError> {
        if rows.is_empty() {
            return Err(ClusterError::EmptyInput);
        }
        let k = self.config.k.min(rows.len()).max(1);

        for attempt in 0..self.config.retry_limit {
            let mut best: Option<Clustering> = None;
            for restart in 0..self.config.restarts {
                let mut rng = self.seeds.rng_for(attempt, restart);
                if let Some(run) = self.lloyd(rows, k, &mut rng) {
                    let better = best
                        .as_ref()
                        .map(|b| run.inertia < b.inertia)
                        .unwrap_or(true);
                    if better {
                        best = Some(run);
                    }
                }
            }
            if let Some(clustering) = best {
                return Ok(clustering);
            }
        }

        Err(ClusterError::NonConvergence {
            attempts: self.config.retry_limit,
            restarts: self.config.restarts,
        })
    }

    /// One Lloyd run from a random distinct-point initialization.
    /// Returns `None` if assignments are still moving at the iteration cap.
    fn lloyd(
        &self,
        rows: &[[f64; feature::COUNT]],
        k: usize,
        rng: &mut StdRng,
    ) -> Option<Clustering> {
        let mut centroids: Vec<[f64; feature::COUNT]> = sample(rng, rows.len(), k)
            .into_iter()
            .map(|i| rows[i])
            .collect();
        let mut assignments = vec![0usize; rows.len()];

        for _ in 0..self.config.max_iterations {
            let mut changed = false;
            for (i, row) in rows.iter().enumerate() {
                let nearest = nearest_centroid(row, &centroids);
                if assignments[i] != nearest {
                    assignments[i] = nearest;
                    changed = true;
                }
            }

            recompute_centroids(rows, &assignments, &mut centroids);
            fill_empty_clusters(rows, &mut assignments, &mut centroids);

            if !changed {
                let inertia = inertia(rows, &assignments, &centroids);
                return Some(Clustering {
                    assignments,
                    centroids,
                    inertia,
                    k,
                });
            }
        }
        None
    }
}

pub(crate) fn squared_distance(a: &[f64; feature::COUNT], b: &[f64; feature::COUNT]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

fn nearest_centroid(row: &[f64; feature::COUNT], centroids: &[[f64; feature::COUNT]]) -> usize {
    let mut best = 0usize;
    let mut best_dist = f64::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let dist = squared_distance(row, centroid);
        if dist < best_dist {
            best = c;
            best_dist = dist;
        }
    }
    best
}

fn recompute_centroids(
    rows: &[[f64; feature::COUNT]],
    assignments: &[usize],
    centroids: &mut [[f64; feature::COUNT]],
) {
    let k = centroids.len();
    let mut sums = vec![[0.0_f64; feature::COUNT]; k];
    let mut counts = vec![0usize; k];
    for (row, &c) in rows.iter().zip(assignments.iter()) {
        counts[c] += 1;
        for (s, v) in sums[c].iter_mut().zip(row.iter()) {
            *s += v;
        }
    }
    for c in 0..k {
        if counts[c] > 0 {
            for (dst, s) in centroids[c].iter_mut().zip(sums[c].iter()) {
                *dst = s / counts[c] as f64;
            }
        }
    }
}

/// Reseat each empty cluster on the point farthest from its current
/// centroid, so every cluster stays populated.
fn fill_empty_clusters(
    rows: &[[f64; feature::COUNT]],
    assignments: &mut [usize],
    centroids: &mut [[f64; feature::COUNT]],
) {
    let k = centroids.len();
    let mut counts = vec![0usize; k];
    for &c in assignments.iter() {
        counts[c] += 1;
    }

    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }
        let mut farthest = 0usize;
        let mut farthest_dist = -1.0_f64;
        for (i, row) in rows.iter().enumerate() {
            // Only steal from clusters that keep at least one member.
            if counts[assignments[i]] <= 1 {
                continue;
            }
            let dist = squared_distance(row, &centroids[assignments[i]]);
            if dist > farthest_dist {
                farthest = i;
                farthest_dist = dist;
            }
        }
        if farthest_dist >= 0.0 {
            counts[assignments[farthest]] -= 1;
            assignments[farthest] = empty;
            counts[empty] = 1;
            centroids[empty] = rows[farthest];
        }
    }
}

fn inertia(
    rows: &[[f64; feature::COUNT]],
    assignments: &[usize],
    centroids: &[[f64; feature::COUNT]],
) -> f64 {
    rows.iter()
        .zip(assignments.iter())
        .map(|(row, &c)| squared_distance(row, &centroids[c]))
        .sum()
}
