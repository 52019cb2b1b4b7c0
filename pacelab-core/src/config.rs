//! Analysis configuration.
//!
//! Every threshold the pipeline uses lives here as a named, documented
//! field. Components take the config by reference; there are no
//! module-level constants to mutate.

use serde::{Deserialize, Serialize};

/// Thresholds for the per-race pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    /// Equity shortfall from the running peak that opens a drawdown
    /// episode, in seconds. Filters lap-time noise without fragmenting
    /// real dips into micro-episodes.
    pub noise_floor_s: f64,

    /// Peak-to-trough span (laps) at or under which the loss counts as
    /// sudden, satisfying the MajorIncident sharp-loss rule.
    pub sharp_loss_max_laps: u32,

    /// Interval to the car ahead at or above which a lap is clear air.
    pub clear_air_gap_s: f64,

    /// Percentile of |delta| on small-gap laps used to calibrate the
    /// per-race traffic threshold, in (0, 1).
    pub traffic_delta_percentile: f64,

    /// Clamp applied to the calibrated traffic threshold, seconds.
    pub traffic_threshold_bounds_s: (f64, f64),

    /// Minimum small-gap laps needed before calibration is trusted.
    pub min_traffic_samples: usize,

    /// Threshold used when calibration has too few samples, seconds.
    pub fallback_traffic_threshold_s: f64,

    /// Stints shorter than this get the race-level benchmark fallback.
    pub min_stint_laps: usize,

    /// Fraction of the total regain inside the first (or final) third of
    /// the recovery window at or above which the shape is V (or U).
    pub shape_snap_fraction: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            noise_floor_s: 0.1,
            sharp_loss_max_laps: 2,
            clear_air_gap_s: 2.0,
            traffic_delta_percentile: 0.75,
            traffic_threshold_bounds_s: (0.2, 3.0),
            min_traffic_samples: 10,
            fallback_traffic_threshold_s: 1.3,
            min_stint_laps: 5,
            shape_snap_fraction: 0.5,
        }
    }
}

impl AnalysisConfig {
    /// Reject configurations that would make the pipeline degenerate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.noise_floor_s > 0.0) {
            return Err(ConfigError::NonPositive("noise_floor_s"));
        }
        if !(self.clear_air_gap_s > 0.0) {
            return Err(ConfigError::NonPositive("clear_air_gap_s"));
        }
        if !(self.traffic_delta_percentile > 0.0 && self.traffic_delta_percentile < 1.0) {
            return Err(ConfigError::OutOfRange("traffic_delta_percentile"));
        }
        let (lo, hi) = self.traffic_threshold_bounds_s;
        if !(lo > 0.0 && hi > lo) {
            return Err(ConfigError::OutOfRange("traffic_threshold_bounds_s"));
        }
        if !(self.shape_snap_fraction > 1.0 / 3.0 && self.shape_snap_fraction <= 1.0) {
            return Err(ConfigError::OutOfRange("shape_snap_fraction"));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("config field {0} must be positive")]
    NonPositive(&'static str),
    #[error("config field {0} is out of range")]
    OutOfRange(&'static str),
}
