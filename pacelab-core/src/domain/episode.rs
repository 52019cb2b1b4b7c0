//! Drawdown episodes and recovery metrics.

use serde::{Deserialize, Serialize};

/// Likely cause of a drawdown episode, assigned by the classifier.
///
/// Rule priority is MajorIncident > Operational > Traffic; anything the
/// rules cannot explain is retained as Unclassified rather than dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DisruptionLabel {
    MajorIncident,
    Operational,
    Traffic,
    Unclassified,
}

/// Qualitative pattern of a recovery: fast snap-back, steady climb,
/// or a slow start with a late surge. `None` when the driver has no
/// resolved episode to shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecoveryShape {
    V,
    Linear,
    U,
    None,
}

/// One peak-to-trough loss episode on an equity curve.
///
/// Lap fields index the equity sequence (lap 0 is the pre-race origin).
/// Invariants: `depth <= 0`, `trough_lap >= peak_lap`; when `recovery_lap`
/// is set, `recovery_lap > trough_lap` and the equity at recovery is at
/// least the pre-episode peak.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawdownEpisode {
    pub peak_lap: u32,
    pub trough_lap: u32,
    /// Lap on which equity regained the pre-episode peak; `None` means the
    /// episode was still open at race end (sustained impairment).
    pub recovery_lap: Option<u32>,
    /// Trough equity minus peak equity, in seconds.
    pub depth: f64,
    pub label: DisruptionLabel,
}

impl DrawdownEpisode {
    pub fn is_resolved(&self) -> bool {
        self.recovery_lap.is_some()
    }

    /// Laps from trough to recovery; `None` while unresolved.
    pub fn recovery_span(&self) -> Option<u32> {
        self.recovery_lap.map(|r| r.saturating_sub(self.trough_lap))
    }
}

/// Recovery measurements for a single resolved episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryMetrics {
    /// Equity regained per lap between trough and recovery, in s/lap.
    /// `None` when the recovery window has zero length.
    pub reset_velocity: Option<f64>,
    /// First-third minus final-third fraction of the total regain, in [-1, 1].
    /// Positive values indicate front-loaded (V-shaped) recovery.
    pub recovery_curvature: f64,
    pub recovery_shape: RecoveryShape,
}
