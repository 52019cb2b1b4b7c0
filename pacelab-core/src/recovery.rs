//! Recovery analysis: reset velocity, curvature, shape, restart deltas,
//! and per-race profile assembly.
//!
//! Only resolved episodes contribute to velocity statistics. Unresolved
//! episodes still count toward MaxDrawdown and are flagged as sustained
//! impairment; a zero-length recovery window invalidates the velocity
//! measurement but keeps the episode.

use std::collections::BTreeMap;

use crate::config::AnalysisConfig;
use crate::domain::{
    DataQualityFlag, DisruptionLabel, DrawdownEpisode, DriverRaceProfile, RaceId,
    RecoveryMetrics, RecoveryShape,
};
use crate::drawdown::DrawdownScan;
use crate::equity::EquityCurve;

pub struct RecoveryAnalyzer<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> RecoveryAnalyzer<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Recovery measurements for one resolved episode. Returns `None` for
    /// unresolved episodes, which have no recovery window to measure.
    pub fn metrics_for(
        &self,
        episode: &DrawdownEpisode,
        curve: &EquityCurve,
    ) -> Option<RecoveryMetrics> {
        let recovery_lap = episode.recovery_lap?;
        let trough = episode.trough_lap;
        let span = recovery_lap.saturating_sub(trough);

        if span == 0 {
            return Some(RecoveryMetrics {
                reset_velocity: None,
                recovery_curvature: 0.0,
                recovery_shape: RecoveryShape::Linear,
            });
        }

        let equity = &curve.equity;
        let trough_eq = equity[trough as usize];
        let recovery_eq = equity[recovery_lap as usize];
        let total = recovery_eq - trough_eq;
        let reset_velocity = total / span as f64;

        let (curvature, shape) = if total.abs() < 1e-12 {
            (0.0, RecoveryShape::Linear)
        } else {
            let third = span as f64 / 3.0;
            let first_cut = interpolate(equity, trough as f64 + third);
            let last_cut = interpolate(equity, trough as f64 + 2.0 * third);
            let frac_first = (first_cut - trough_eq) / total;
            let frac_last = (recovery_eq - last_cut) / total;
            let curvature = frac_first - frac_last;

            let snap = self.config.shape_snap_fraction;
            let shape = if frac_first >= snap {
                RecoveryShape::V
            } else if frac_last >= snap {
                RecoveryShape::U
            } else {
                RecoveryShape::Linear
            };
            (curvature, shape)
        };

        Some(RecoveryMetrics {
            reset_velocity: Some(reset_velocity),
            recovery_curvature: curvature,
            recovery_shape: shape,
        })
    }

    /// Mean delta on the first green lap after each safety-car period.
    /// `None` when the race had no restart for this driver.
    pub fn restart_delta(&self, curve: &EquityCurve) -> Option<f64> {
        let mut deltas = Vec::new();
        for i in 1..curve.laps.len() {
            if curve.laps[i - 1].safety_car && !curve.laps[i].safety_car {
                deltas.push(curve.deltas[i]);
            }
        }
        if deltas.is_empty() {
            None
        } else {
            Some(deltas.iter().sum::<f64>() / deltas.len() as f64)
        }
    }

    /// Roll a driver's labeled episodes into a per-race profile.
    ///
    /// Category resilience fields hold raw mean reset velocities; season
    /// normalization happens in the reduce phase once all races exist.
    pub fn profile(
        &self,
        race_id: &RaceId,
        curve: &EquityCurve,
        scan: &DrawdownScan,
    ) -> DriverRaceProfile {
        let mut velocities = Vec::new();
        let mut curvatures = Vec::new();
        let mut by_label: BTreeMap<DisruptionLabel, Vec<f64>> = BTreeMap::new();
        let mut shape_counts: BTreeMap<RecoveryShape, usize> = BTreeMap::new();
        let mut quality_flags = Vec::new();
        let mut unresolved = 0usize;

        for episode in &scan.episodes {
            if episode.label == DisruptionLabel::Unclassified {
                quality_flags.push(DataQualityFlag::UnclassifiedDisruption {
                    driver: curve.driver.clone(),
                    peak_lap: episode.peak_lap,
                });
            }

            let Some(metrics) = self.metrics_for(episode, curve) else {
                unresolved += 1;
                quality_flags.push(DataQualityFlag::SustainedImpairment {
                    driver: curve.driver.clone(),
                    trough_lap: episode.trough_lap,
                });
                continue;
            };

            match metrics.reset_velocity {
                Some(v) => {
                    velocities.push(v);
                    curvatures.push(metrics.recovery_curvature);
                    by_label.entry(episode.label).or_default().push(v);
                    *shape_counts.entry(metrics.recovery_shape).or_insert(0) += 1;
                }
                None => {
                    quality_flags.push(DataQualityFlag::InvalidRecoveryWindow {
                        driver: curve.driver.clone(),
                        trough_lap: episode.trough_lap,
                    });
                }
            }
        }

        let mean = |v: &Vec<f64>| -> Option<f64> {
            if v.is_empty() {
                None
            } else {
                Some(v.iter().sum::<f64>() / v.len() as f64)
            }
        };
        let category = |label: DisruptionLabel| by_label.get(&label).and_then(mean);

        DriverRaceProfile {
            driver: curve.driver.clone(),
            race_id: race_id.clone(),
            max_drawdown: scan.max_drawdown,
            reset_velocity: mean(&velocities),
            restart_delta: self.restart_delta(curve),
            major_incident_resilience: category(DisruptionLabel::MajorIncident),
            traffic_resilience: category(DisruptionLabel::Traffic),
            operational_resilience: category(DisruptionLabel::Operational),
            recovery_curvature: mean(&curvatures),
            dominant_shape: dominant_shape(&shape_counts),
            episode_count: scan.episodes.len(),
            unresolved_count: unresolved,
            quality_flags,
        }
    }
}

/// Most frequent recovery shape; ties break toward the faster shape
/// (V over Linear over U) so the result is deterministic.
fn dominant_shape(counts: &BTreeMap<RecoveryShape, usize>) -> RecoveryShape {
    let mut best = RecoveryShape::None;
    let mut best_count = 0usize;
    for shape in [RecoveryShape::V, RecoveryShape::Linear, RecoveryShape::U] {
        let count = counts.get(&shape).copied().unwrap_or(0);
        if count > best_count {
            best = shape;
            best_count = count;
        }
    }
    best
}

/// Linear interpolation of the equity sequence at a fractional lap index.
fn interpolate(equity: &[f64], position: f64) -> f64 {
    let lo = position.floor() as usize;
    let hi = (position.ceil() as usize).min(equity.len() - 1);
    if lo >= hi {
        return equity[lo.min(equity.len() - 1)];
    }
    let frac = position - lo as f64;
    equity[lo] * (1.0 - frac) + equity[hi] * frac
}
