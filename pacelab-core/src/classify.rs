//! Disruption classification.
//!
//! Each episode gets exactly one label from an ordered list of named
//! rules, evaluated in fixed sequence with first match winning:
//! MajorIncident, then Operational, then Traffic. Episodes no rule can
//! explain keep the Unclassified label and a quality flag.

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::domain::{DisruptionLabel, DrawdownEpisode, LapRecord};
use crate::equity::EquityCurve;

/// One named classification predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassifierRule {
    /// Telemetry anomaly in the window, or depth reached within the
    /// sharp-loss lap span.
    MajorIncident,
    /// Pit stop or safety car in the window.
    Operational,
    /// Small deltas while following another car for the whole window.
    Traffic,
}

/// Lap window an episode is judged on: every lap in
/// `[peak_lap, trough_lap]` with its delta.
pub struct EpisodeWindow<'a> {
    pub laps: Vec<&'a LapRecord>,
    pub deltas: Vec<f64>,
    pub span_laps: u32,
}

impl ClassifierRule {
    pub fn matches(&self, window: &EpisodeWindow, config: &AnalysisConfig, threshold_s: f64) -> bool {
        match self {
            ClassifierRule::MajorIncident => {
                window.laps.iter().any(|l| l.telemetry_anomaly)
                    || window.span_laps <= config.sharp_loss_max_laps
            }
            ClassifierRule::Operational => window.laps.iter().any(|l| l.pit || l.safety_car),
            ClassifierRule::Traffic => {
                if window.laps.is_empty() {
                    return false;
                }
                let mean_abs =
                    window.deltas.iter().map(|d| d.abs()).sum::<f64>() / window.deltas.len() as f64;
                mean_abs < threshold_s
                    && window
                        .laps
                        .iter()
                        .all(|l| l.in_traffic(config.clear_air_gap_s))
            }
        }
    }

    pub fn label(&self) -> DisruptionLabel {
        match self {
            ClassifierRule::MajorIncident => DisruptionLabel::MajorIncident,
            ClassifierRule::Operational => DisruptionLabel::Operational,
            ClassifierRule::Traffic => DisruptionLabel::Traffic,
        }
    }
}

pub struct DisruptionClassifier<'a> {
    config: &'a AnalysisConfig,
    rules: [ClassifierRule; 3],
}

impl<'a> DisruptionClassifier<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self {
            config,
            rules: [
                ClassifierRule::MajorIncident,
                ClassifierRule::Operational,
                ClassifierRule::Traffic,
            ],
        }
    }

    /// Label one episode against its curve. Pure and deterministic.
    pub fn classify(
        &self,
        episode: &DrawdownEpisode,
        curve: &EquityCurve,
        traffic_threshold_s: f64,
    ) -> DisruptionLabel {
        let window = Self::window(episode, curve);
        for rule in &self.rules {
            if rule.matches(&window, self.config, traffic_threshold_s) {
                return rule.label();
            }
        }
        DisruptionLabel::Unclassified
    }

    fn window<'c>(episode: &DrawdownEpisode, curve: &'c EquityCurve) -> EpisodeWindow<'c> {
        let start = episode.peak_lap.max(1);
        let mut laps = Vec::new();
        let mut deltas = Vec::new();
        for t in start..=episode.trough_lap {
            if let Some(lap) = curve.lap_at(t) {
                laps.push(lap);
                deltas.push(curve.deltas[t as usize - 1]);
            }
        }
        EpisodeWindow {
            laps,
            deltas,
            span_laps: episode.trough_lap - episode.peak_lap,
        }
    }
}
