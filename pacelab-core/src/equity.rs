//! Equity curve construction and traffic-threshold calibration.
//!
//! Equity is the cumulative sum of negated pace deviations from the
//! benchmark: a performance account balance. Losing time to the expected
//! pace draws the balance down; beating it pays the balance back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::benchmark::{percentile, race_level_benchmark, BenchmarkProvider};
use crate::config::AnalysisConfig;
use crate::domain::{DataQualityFlag, DriverId, LapRecord};

/// Equity sequence for one driver.
///
/// `equity` has one more point than `laps`: index 0 is the pre-race
/// origin (always 0.0) and index `t` is the balance after the driver's
/// t-th completed lap. With contiguous 1-based lap numbering the curve
/// index equals the lap number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityCurve {
    pub driver: DriverId,
    pub laps: Vec<LapRecord>,
    /// Signed `lap_time - benchmark` per lap; negative = faster than expected.
    pub deltas: Vec<f64>,
    pub equity: Vec<f64>,
}

impl EquityCurve {
    /// Number of completed laps.
    pub fn lap_count(&self) -> usize {
        self.laps.len()
    }

    /// Lap record behind equity index `t` (t >= 1).
    pub fn lap_at(&self, t: u32) -> Option<&LapRecord> {
        if t == 0 {
            return None;
        }
        self.laps.get(t as usize - 1)
    }
}

/// Per-race output of the builder: one curve per driver plus the
/// calibrated traffic threshold shared by all of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceEquity {
    pub curves: BTreeMap<DriverId, EquityCurve>,
    /// Calibrated |delta| magnitude below which a slow lap is attributable
    /// to following another car rather than genuine pace loss.
    pub traffic_threshold_s: f64,
    pub quality_flags: Vec<DataQualityFlag>,
}

/// Turns a race's lap table into per-driver equity curves.
pub struct EquityCurveBuilder<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> EquityCurveBuilder<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Build all curves for a race. Input must already be schema-valid.
    ///
    /// Deterministic given the lap table and provider: same input, same
    /// curves and same calibrated threshold.
    pub fn build(&self, laps: &[LapRecord], provider: &dyn BenchmarkProvider) -> RaceEquity {
        let mut by_driver: BTreeMap<DriverId, Vec<LapRecord>> = BTreeMap::new();
        for lap in laps {
            by_driver
                .entry(lap.driver.clone())
                .or_default()
                .push(lap.clone());
        }

        let mut curves = BTreeMap::new();
        let mut quality_flags = Vec::new();
        let mut all_deltas: Vec<(f64, bool)> = Vec::new(); // (delta, usable for calibration)

        for (driver, driver_laps) in by_driver {
            let curve = self.build_curve(driver, driver_laps, provider, &mut quality_flags);
            for (lap, &delta) in curve.laps.iter().zip(&curve.deltas) {
                let usable = lap.is_clean() && lap.in_traffic(self.config.clear_air_gap_s);
                all_deltas.push((delta, usable));
            }
            curves.insert(curve.driver.clone(), curve);
        }

        let traffic_threshold_s = self.calibrate_traffic_threshold(&all_deltas);

        RaceEquity {
            curves,
            traffic_threshold_s,
            quality_flags,
        }
    }

    fn build_curve(
        &self,
        driver: DriverId,
        laps: Vec<LapRecord>,
        provider: &dyn BenchmarkProvider,
        quality_flags: &mut Vec<DataQualityFlag>,
    ) -> EquityCurve {
        let mut stint_len: BTreeMap<u32, usize> = BTreeMap::new();
        for lap in &laps {
            *stint_len.entry(lap.stint).or_insert(0) += 1;
        }

        let refs: Vec<&LapRecord> = laps.iter().collect();
        let fallback = race_level_benchmark(&refs);
        let mut flagged_stints: Vec<u32> = Vec::new();

        let mut deltas = Vec::with_capacity(laps.len());
        for lap in &laps {
            let stint_ok = stint_len[&lap.stint] >= self.config.min_stint_laps;
            let expected = if stint_ok {
                provider.expected_lap_time(&driver, lap)
            } else {
                None
            };
            let benchmark = match expected {
                Some(v) => v,
                None => {
                    if !flagged_stints.contains(&lap.stint) {
                        flagged_stints.push(lap.stint);
                        quality_flags.push(DataQualityFlag::BenchmarkFallback {
                            driver: driver.clone(),
                            stint: lap.stint,
                        });
                    }
                    // Schema validation guarantees at least this lap exists.
                    fallback.unwrap_or(lap.lap_time_s)
                }
            };
            deltas.push(lap.lap_time_s - benchmark);
        }

        let mut equity = Vec::with_capacity(deltas.len() + 1);
        equity.push(0.0);
        let mut balance = 0.0;
        for &delta in &deltas {
            balance -= delta;
            equity.push(balance);
        }

        EquityCurve {
            driver,
            laps,
            deltas,
            equity,
        }
    }

    /// Calibrate the per-race traffic threshold from the distribution of
    /// |delta| on laps run close behind another car. Thin samples fall
    /// back to the configured default; the result is always clamped.
    fn calibrate_traffic_threshold(&self, deltas: &[(f64, bool)]) -> f64 {
        let sample: Vec<f64> = deltas
            .iter()
            .filter(|(_, usable)| *usable)
            .map(|(d, _)| d.abs())
            .collect();

        let (lo, hi) = self.config.traffic_threshold_bounds_s;
        if sample.len() < self.config.min_traffic_samples {
            return self.config.fallback_traffic_threshold_s.clamp(lo, hi);
        }
        percentile(&sample, self.config.traffic_delta_percentile).clamp(lo, hi)
    }
}
