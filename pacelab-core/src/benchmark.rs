//! Benchmark provider contract and race-level fallback.
//!
//! The expected-pace model itself (a stint-wise regression) lives outside
//! this crate. The core only consumes it through `BenchmarkProvider` and
//! supplies the documented fallback for laps the provider cannot cover.

use std::collections::HashMap;

use crate::domain::{DriverId, LapRecord};

/// External contract: expected lap time for a (driver, lap).
///
/// Implementations should be smooth within a stint. Returning `None`
/// signals that the benchmark is unavailable (typically a stint too short
/// to fit); the core then applies the race-level fallback and records a
/// `BenchmarkFallback` quality flag — it never fails the analysis.
pub trait BenchmarkProvider: Send + Sync {
    fn expected_lap_time(&self, driver: &str, lap: &LapRecord) -> Option<f64>;
}

/// Table-backed provider keyed by (driver, lap_number). Useful for tests
/// and for replaying a benchmark computed elsewhere.
#[derive(Debug, Clone, Default)]
pub struct TableBenchmark {
    expected: HashMap<(DriverId, u32), f64>,
}

impl TableBenchmark {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, driver: impl Into<DriverId>, lap_number: u32, expected_s: f64) {
        self.expected.insert((driver.into(), lap_number), expected_s);
    }
}

impl BenchmarkProvider for TableBenchmark {
    fn expected_lap_time(&self, driver: &str, lap: &LapRecord) -> Option<f64> {
        self.expected
            .get(&(driver.to_string(), lap.lap_number))
            .copied()
    }
}

/// Provider that expects the same lap time everywhere. Test scaffolding
/// for scenarios defined purely in delta terms.
#[derive(Debug, Clone, Copy)]
pub struct ConstantBenchmark(pub f64);

impl BenchmarkProvider for ConstantBenchmark {
    fn expected_lap_time(&self, _driver: &str, _lap: &LapRecord) -> Option<f64> {
        Some(self.0)
    }
}

/// Race-level fallback benchmark for one driver: the median lap time over
/// green-flag, non-pit laps. When no clean lap exists (a race spent
/// entirely under safety car or in the pits), the median over all laps is
/// used instead.
pub fn race_level_benchmark(laps: &[&LapRecord]) -> Option<f64> {
    let clean: Vec<f64> = laps
        .iter()
        .filter(|l| l.is_clean())
        .map(|l| l.lap_time_s)
        .collect();
    if !clean.is_empty() {
        return Some(median(&clean));
    }
    let all: Vec<f64> = laps.iter().map(|l| l.lap_time_s).collect();
    if all.is_empty() {
        None
    } else {
        Some(median(&all))
    }
}

pub(crate) fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Linear-interpolated percentile, `p` in [0, 1]. Sorts a copy.
pub(crate) fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Compound;

    fn lap(lap_number: u32, lap_time_s: f64, pit: bool, sc: bool) -> LapRecord {
        LapRecord {
            driver: "ALO".into(),
            lap_number,
            stint: 1,
            compound: Compound::Hard,
            tire_age: lap_number,
            lap_time_s,
            pit,
            safety_car: sc,
            gap_to_ahead_s: None,
            telemetry_anomaly: false,
        }
    }

    #[test]
    fn table_benchmark_lookup() {
        let mut table = TableBenchmark::new();
        table.insert("ALO", 3, 90.5);
        let l = lap(3, 91.0, false, false);
        assert_eq!(table.expected_lap_time("ALO", &l), Some(90.5));
        assert_eq!(table.expected_lap_time("STR", &l), None);
    }

    #[test]
    fn fallback_uses_clean_lap_median() {
        let laps = vec![
            lap(1, 90.0, false, false),
            lap(2, 92.0, false, false),
            lap(3, 94.0, false, false),
            lap(4, 120.0, true, false), // pit lap excluded
        ];
        let refs: Vec<&LapRecord> = laps.iter().collect();
        assert_eq!(race_level_benchmark(&refs), Some(92.0));
    }

    #[test]
    fn fallback_degrades_to_all_laps() {
        let laps = vec![lap(1, 100.0, true, false), lap(2, 110.0, false, true)];
        let refs: Vec<&LapRecord> = laps.iter().collect();
        assert_eq!(race_level_benchmark(&refs), Some(105.0));
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn percentile_interpolates() {
        let values = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&values, 0.5), 2.0);
        assert!((percentile(&values, 0.75) - 3.0).abs() < 1e-12);
        assert_eq!(percentile(&values, 0.0), 0.0);
        assert_eq!(percentile(&values, 1.0), 4.0);
    }
}
