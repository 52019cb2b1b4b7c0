//! Season feature assembly.
//!
//! Aggregates per-race profiles into one vector per driver, normalizes
//! the category resilience scores against the season-wide distribution,
//! and standardizes every column for clustering. Features arrive in
//! incompatible units (seconds, seconds per lap, ratios), so clustering
//! always runs on the standardized copy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use pacelab_core::domain::profile::feature;
use pacelab_core::domain::{DriverId, DriverRaceProfile, RecoveryShape};

/// Neutral category score for a driver with zero episodes in a category:
/// the midpoint of the normalized [0, 1] range, deliberately neither
/// rewarding nor penalizing absence of evidence.
pub const NEUTRAL_CATEGORY_SCORE: f64 = 0.5;

/// One driver's season aggregate, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverAggregate {
    pub driver: DriverId,
    pub races: usize,
    /// Mean per-race MaxDrawdown, seconds.
    pub max_drawdown: f64,
    pub reset_velocity: Option<f64>,
    pub restart_delta: Option<f64>,
    pub major_incident: Option<f64>,
    pub traffic: Option<f64>,
    pub operational: Option<f64>,
    pub recovery_curvature: Option<f64>,
    pub dominant_shape: RecoveryShape,
    pub sustained_impairments: usize,
}

/// Feature matrix over all drivers in a fixed, deterministic order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub drivers: Vec<DriverId>,
    /// Physical-unit features with category scores normalized to [0, 1].
    pub raw: Vec<[f64; feature::COUNT]>,
    /// Zero-mean, unit-variance copy used for clustering. Zero-variance
    /// columns standardize to 0.
    pub standardized: Vec<[f64; feature::COUNT]>,
}

/// Fold race profiles into per-driver aggregates, ordered by driver id.
///
/// Means are taken over the races where a value exists; a metric missing
/// in every race stays `None` and gets its documented default later.
pub fn aggregate_drivers(profiles: &[DriverRaceProfile]) -> Vec<DriverAggregate> {
    #[derive(Default)]
    struct Acc {
        races: usize,
        max_drawdown: Vec<f64>,
        reset_velocity: Vec<f64>,
        restart_delta: Vec<f64>,
        major_incident: Vec<f64>,
        traffic: Vec<f64>,
        operational: Vec<f64>,
        recovery_curvature: Vec<f64>,
        shapes: BTreeMap<RecoveryShape, usize>,
        sustained: usize,
    }

    let mut by_driver: BTreeMap<DriverId, Acc> = BTreeMap::new();
    for p in profiles {
        let acc = by_driver.entry(p.driver.clone()).or_default();
        acc.races += 1;
        acc.max_drawdown.push(p.max_drawdown);
        if let Some(v) = p.reset_velocity {
            acc.reset_velocity.push(v);
        }
        if let Some(v) = p.restart_delta {
            acc.restart_delta.push(v);
        }
        if let Some(v) = p.major_incident_resilience {
            acc.major_incident.push(v);
        }
        if let Some(v) = p.traffic_resilience {
            acc.traffic.push(v);
        }
        if let Some(v) = p.operational_resilience {
            acc.operational.push(v);
        }
        if let Some(v) = p.recovery_curvature {
            acc.recovery_curvature.push(v);
        }
        if p.dominant_shape != RecoveryShape::None {
            *acc.shapes.entry(p.dominant_shape).or_insert(0) += 1;
        }
        acc.sustained += p.unresolved_count;
    }

    by_driver
        .into_iter()
        .map(|(driver, acc)| DriverAggregate {
            driver,
            races: acc.races,
            max_drawdown: mean(&acc.max_drawdown).unwrap_or(0.0),
            reset_velocity: mean(&acc.reset_velocity),
            restart_delta: mean(&acc.restart_delta),
            major_incident: mean(&acc.major_incident),
            traffic: mean(&acc.traffic),
            operational: mean(&acc.operational),
            recovery_curvature: mean(&acc.recovery_curvature),
            dominant_shape: dominant(&acc.shapes),
            sustained_impairments: acc.sustained,
        })
        .collect()
}

/// Build the season feature matrix from driver aggregates.
///
/// Layout per `domain::profile::feature`: max_drawdown, reset_velocity,
/// restart_delta, the three normalized category scores, and recovery
/// curvature. Missing reset velocity, restart delta, and curvature
/// default to 0.0 (no demonstrated recovery, no restarts, no shape).
pub fn build_feature_matrix(aggregates: &[DriverAggregate]) -> FeatureMatrix {
    let drivers: Vec<DriverId> = aggregates.iter().map(|a| a.driver.clone()).collect();

    let major = normalize_category(aggregates.iter().map(|a| a.major_incident).collect());
    let traffic = normalize_category(aggregates.iter().map(|a| a.traffic).collect());
    let operational = normalize_category(aggregates.iter().map(|a| a.operational).collect());

    let mut raw = Vec::with_capacity(aggregates.len());
    for (i, a) in aggregates.iter().enumerate() {
        let mut row = [0.0_f64; feature::COUNT];
        row[feature::MAX_DRAWDOWN] = a.max_drawdown;
        row[feature::RESET_VELOCITY] = a.reset_velocity.unwrap_or(0.0);
        row[feature::RESTART_DELTA] = a.restart_delta.unwrap_or(0.0);
        row[feature::MAJOR_INCIDENT] = major[i];
        row[feature::TRAFFIC] = traffic[i];
        row[feature::OPERATIONAL] = operational[i];
        row[feature::RECOVERY_CURVATURE] = a.recovery_curvature.unwrap_or(0.0);
        raw.push(row);
    }

    let standardized = standardize(&raw);

    FeatureMatrix {
        drivers,
        raw,
        standardized,
    }
}

/// Min-max normalize a category column to [0, 1] across the drivers that
/// have data; drivers without data (and degenerate spreads) get the
/// neutral score.
fn normalize_category(values: Vec<Option<f64>>) -> Vec<f64> {
    let present: Vec<f64> = values.iter().filter_map(|v| *v).collect();
    let (min, max) = match (
        present.iter().cloned().reduce(f64::min),
        present.iter().cloned().reduce(f64::max),
    ) {
        (Some(min), Some(max)) => (min, max),
        _ => return vec![NEUTRAL_CATEGORY_SCORE; values.len()],
    };
    let spread = max - min;

    values
        .into_iter()
        .map(|v| match v {
            Some(v) if spread > 1e-12 => (v - min) / spread,
            Some(_) => NEUTRAL_CATEGORY_SCORE,
            None => NEUTRAL_CATEGORY_SCORE,
        })
        .collect()
}

/// Column-wise z-score. Columns with (near) zero variance map to 0.
pub fn standardize(rows: &[[f64; feature::COUNT]]) -> Vec<[f64; feature::COUNT]> {
    if rows.is_empty() {
        return Vec::new();
    }
    let n = rows.len() as f64;
    let mut out = vec![[0.0_f64; feature::COUNT]; rows.len()];

    for col in 0..feature::COUNT {
        let mean = rows.iter().map(|r| r[col]).sum::<f64>() / n;
        let variance = rows.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        for (i, row) in rows.iter().enumerate() {
            out[i][col] = if std > 1e-12 { (row[col] - mean) / std } else { 0.0 };
        }
    }
    out
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn dominant(shapes: &BTreeMap<RecoveryShape, usize>) -> RecoveryShape {
    let mut best = RecoveryShape::None;
    let mut best_count = 0usize;
    for shape in [RecoveryShape::V, RecoveryShape::Linear, RecoveryShape::U] {
        let count = shapes.get(&shape).copied().unwrap_or(0);
        if count > best_count {
            best = shape;
            best_count = count;
        }
    }
    best
}
