//! LapRecord — the fundamental telemetry unit.

use serde::{Deserialize, Serialize};

/// Driver identifier (three-letter abbreviation, e.g. "VER").
pub type DriverId = String;

/// Race identifier (e.g. "2025_australian_gp").
pub type RaceId = String;

/// Tire compound fitted for a lap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Compound {
    Soft,
    Medium,
    Hard,
    Intermediate,
    Wet,
}

/// One lap for one driver. Immutable once ingested.
///
/// `gap_to_ahead_s` is the interval to the car ahead at the end of the lap;
/// `None` means the leader or no reliable interval (treated as clear air).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LapRecord {
    pub driver: DriverId,
    pub lap_number: u32,
    pub stint: u32,
    pub compound: Compound,
    pub tire_age: u32,
    pub lap_time_s: f64,
    pub pit: bool,
    pub safety_car: bool,
    pub gap_to_ahead_s: Option<f64>,
    pub telemetry_anomaly: bool,
}

impl LapRecord {
    /// Basic sanity check: positive finite lap time, 1-based lap number,
    /// non-negative finite gap when present.
    pub fn is_sane(&self) -> bool {
        self.lap_number >= 1
            && self.lap_time_s.is_finite()
            && self.lap_time_s > 0.0
            && self
                .gap_to_ahead_s
                .map_or(true, |g| g.is_finite() && g >= 0.0)
    }

    /// True if the lap ran under green-flag conditions outside the pits.
    pub fn is_clean(&self) -> bool {
        !self.pit && !self.safety_car
    }

    /// True if the car was following another within `gap_cutoff_s`.
    ///
    /// A missing interval counts as clear air, never as traffic.
    pub fn in_traffic(&self, gap_cutoff_s: f64) -> bool {
        self.gap_to_ahead_s.map_or(false, |g| g < gap_cutoff_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_lap() -> LapRecord {
        LapRecord {
            driver: "VER".into(),
            lap_number: 12,
            stint: 1,
            compound: Compound::Medium,
            tire_age: 11,
            lap_time_s: 82.417,
            pit: false,
            safety_car: false,
            gap_to_ahead_s: Some(1.8),
            telemetry_anomaly: false,
        }
    }

    #[test]
    fn lap_is_sane() {
        assert!(sample_lap().is_sane());
    }

    #[test]
    fn lap_detects_bad_time() {
        let mut lap = sample_lap();
        lap.lap_time_s = 0.0;
        assert!(!lap.is_sane());
        lap.lap_time_s = f64::NAN;
        assert!(!lap.is_sane());
    }

    #[test]
    fn lap_detects_bad_gap() {
        let mut lap = sample_lap();
        lap.gap_to_ahead_s = Some(-0.5);
        assert!(!lap.is_sane());
    }

    #[test]
    fn missing_gap_is_clear_air() {
        let mut lap = sample_lap();
        lap.gap_to_ahead_s = None;
        assert!(lap.is_sane());
        assert!(!lap.in_traffic(2.0));
    }

    #[test]
    fn traffic_cutoff_is_exclusive() {
        let lap = sample_lap(); // gap 1.8
        assert!(lap.in_traffic(2.0));
        assert!(!lap.in_traffic(1.8));
    }

    #[test]
    fn lap_serialization_roundtrip() {
        let lap = sample_lap();
        let json = serde_json::to_string(&lap).unwrap();
        let deser: LapRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(lap.driver, deser.driver);
        assert_eq!(lap.lap_number, deser.lap_number);
        assert_eq!(lap.lap_time_s, deser.lap_time_s);
        assert_eq!(lap.compound, deser.compound);
    }
}
