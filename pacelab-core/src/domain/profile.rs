//! Per-race and per-season driver profiles.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::episode::RecoveryShape;
use super::lap::{DriverId, RaceId};

/// Identity of one race within a season.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceMeta {
    pub race_id: RaceId,
    pub date: NaiveDate,
}

/// Non-fatal data-sparsity markers attached to analysis output.
///
/// These replace thrown failures for everything except malformed input:
/// downstream consumers see what degraded and where, and nothing is
/// silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityFlag {
    /// A stint had too few laps for a reliable benchmark; the race-level
    /// median was used for its laps instead.
    BenchmarkFallback { driver: DriverId, stint: u32 },
    /// A resolved episode had a zero-length recovery window; it counts
    /// toward MaxDrawdown but not toward velocity statistics.
    InvalidRecoveryWindow { driver: DriverId, trough_lap: u32 },
    /// An episode was still open at race end.
    SustainedImpairment { driver: DriverId, trough_lap: u32 },
    /// No classification rule matched an episode.
    UnclassifiedDisruption { driver: DriverId, peak_lap: u32 },
}

/// Per-driver, per-race resilience profile.
///
/// Category resilience fields hold *raw* mean reset velocities (s/lap);
/// normalization to [0, 1] needs the season-wide distribution and happens
/// in the season reduce. `None` means the driver had no resolved episode
/// in that category this race.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverRaceProfile {
    pub driver: DriverId,
    pub race_id: RaceId,
    /// Worst equity shortfall from the running peak, in seconds (<= 0).
    pub max_drawdown: f64,
    /// Mean reset velocity across all resolved episodes, s/lap.
    pub reset_velocity: Option<f64>,
    /// Mean delta on the first green lap after each safety-car period.
    pub restart_delta: Option<f64>,
    pub major_incident_resilience: Option<f64>,
    pub traffic_resilience: Option<f64>,
    pub operational_resilience: Option<f64>,
    /// Mean recovery curvature across resolved episodes.
    pub recovery_curvature: Option<f64>,
    /// Most frequent recovery shape across resolved episodes.
    pub dominant_shape: RecoveryShape,
    pub episode_count: usize,
    pub unresolved_count: usize,
    pub quality_flags: Vec<DataQualityFlag>,
}

/// Semantic resilience archetype, assigned from centroid position on the
/// (MaxDrawdown, ResetVelocity) axes — never from the raw cluster index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    /// Shallow drawdowns, fast recovery.
    EntropyKing,
    /// Deep drawdowns, but fast recovery.
    ElasticAggressor,
    /// Shallow-to-moderate drawdowns, slow recovery.
    SteadyOperator,
    /// Deep drawdowns, slow recovery.
    BrittlePerformer,
}

impl Archetype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::EntropyKing => "Entropy King",
            Archetype::ElasticAggressor => "Elastic Aggressor",
            Archetype::SteadyOperator => "Steady Operator",
            Archetype::BrittlePerformer => "Brittle Performer",
        }
    }
}

/// Season-aggregated driver profile with cluster assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverSeasonProfile {
    pub driver: DriverId,
    pub races: usize,
    /// `[max_drawdown, reset_velocity, restart_delta, major_incident,
    /// traffic, operational, recovery_curvature]` — category scores already
    /// normalized to [0, 1] against the season-wide distribution.
    pub features: [f64; 7],
    pub cluster: usize,
    pub archetype: Archetype,
    /// `1 - d_own / (d_own + d_next)`, clipped to [0, 1].
    pub confidence: f64,
    pub dominant_shape: RecoveryShape,
    pub sustained_impairments: usize,
}

/// Named accessors for the season feature layout.
pub mod feature {
    pub const MAX_DRAWDOWN: usize = 0;
    pub const RESET_VELOCITY: usize = 1;
    pub const RESTART_DELTA: usize = 2;
    pub const MAJOR_INCIDENT: usize = 3;
    pub const TRAFFIC: usize = 4;
    pub const OPERATIONAL: usize = 5;
    pub const RECOVERY_CURVATURE: usize = 6;
    pub const COUNT: usize = 7;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archetype_labels() {
        assert_eq!(Archetype::EntropyKing.as_str(), "Entropy King");
        assert_eq!(Archetype::BrittlePerformer.as_str(), "Brittle Performer");
    }

    #[test]
    fn quality_flag_serialization() {
        let flag = DataQualityFlag::BenchmarkFallback {
            driver: "HAM".into(),
            stint: 2,
        };
        let json = serde_json::to_string(&flag).unwrap();
        assert!(json.contains("benchmark_fallback"));
        let deser: DataQualityFlag = serde_json::from_str(&json).unwrap();
        assert_eq!(flag, deser);
    }

    #[test]
    fn season_profile_roundtrip() {
        let profile = DriverSeasonProfile {
            driver: "NOR".into(),
            races: 22,
            features: [-24.0, 0.6, 0.1, 0.5, 0.7, 0.5, 0.2],
            cluster: 1,
            archetype: Archetype::ElasticAggressor,
            confidence: 0.81,
            dominant_shape: RecoveryShape::V,
            sustained_impairments: 1,
        };
        let json = serde_json::to_string(&profile).unwrap();
        let deser: DriverSeasonProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(deser.archetype, Archetype::ElasticAggressor);
        assert_eq!(deser.features, profile.features);
    }
}
