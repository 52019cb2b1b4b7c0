//! Input schema validation.
//!
//! Malformed input is the only unrecoverable failure class in the
//! pipeline: it is rejected here, up front, before any analysis runs.
//! Data sparsity (short stints, missing benchmarks) is never a schema
//! error — those degrade to `DataQualityFlag`s downstream.

use std::collections::HashMap;

use crate::domain::{DriverId, LapRecord};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SchemaError {
    #[error("lap table is empty")]
    Empty,

    #[error("driver {driver} lap index {index}: lap_number must be >= 1")]
    ZeroLapNumber { driver: DriverId, index: usize },

    #[error("driver {driver} lap {lap_number}: lap time {lap_time_s} is not a positive finite number")]
    InvalidLapTime {
        driver: DriverId,
        lap_number: u32,
        lap_time_s: f64,
    },

    #[error("driver {driver} lap {lap_number}: gap_to_ahead {gap_s} is negative or non-finite")]
    InvalidGap {
        driver: DriverId,
        lap_number: u32,
        gap_s: f64,
    },

    #[error("driver {driver}: lap numbers not strictly increasing at lap {lap_number}")]
    OutOfOrder { driver: DriverId, lap_number: u32 },
}

/// Validate a race's lap table. Laps must be grouped per driver in
/// strictly increasing lap order; interleaving across drivers is fine.
pub fn validate_laps(laps: &[LapRecord]) -> Result<(), SchemaError> {
    if laps.is_empty() {
        return Err(SchemaError::Empty);
    }

    let mut last_lap: HashMap<&str, u32> = HashMap::new();

    for (index, lap) in laps.iter().enumerate() {
        if lap.lap_number == 0 {
            return Err(SchemaError::ZeroLapNumber {
                driver: lap.driver.clone(),
                index,
            });
        }
        if !lap.lap_time_s.is_finite() || lap.lap_time_s <= 0.0 {
            return Err(SchemaError::InvalidLapTime {
                driver: lap.driver.clone(),
                lap_number: lap.lap_number,
                lap_time_s: lap.lap_time_s,
            });
        }
        if let Some(gap) = lap.gap_to_ahead_s {
            if !gap.is_finite() || gap < 0.0 {
                return Err(SchemaError::InvalidGap {
                    driver: lap.driver.clone(),
                    lap_number: lap.lap_number,
                    gap_s: gap,
                });
            }
        }
        if let Some(&prev) = last_lap.get(lap.driver.as_str()) {
            if lap.lap_number <= prev {
                return Err(SchemaError::OutOfOrder {
                    driver: lap.driver.clone(),
                    lap_number: lap.lap_number,
                });
            }
        }
        last_lap.insert(lap.driver.as_str(), lap.lap_number);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Compound;

    fn lap(driver: &str, lap_number: u32, lap_time_s: f64) -> LapRecord {
        LapRecord {
            driver: driver.into(),
            lap_number,
            stint: 1,
            compound: Compound::Medium,
            tire_age: lap_number,
            lap_time_s,
            pit: false,
            safety_car: false,
            gap_to_ahead_s: Some(2.5),
            telemetry_anomaly: false,
        }
    }

    #[test]
    fn accepts_valid_table() {
        let laps = vec![lap("VER", 1, 81.0), lap("VER", 2, 80.8), lap("NOR", 1, 81.2)];
        assert_eq!(validate_laps(&laps), Ok(()));
    }

    #[test]
    fn rejects_empty_table() {
        assert_eq!(validate_laps(&[]), Err(SchemaError::Empty));
    }

    #[test]
    fn rejects_zero_lap_number() {
        let laps = vec![lap("VER", 0, 81.0)];
        assert!(matches!(
            validate_laps(&laps),
            Err(SchemaError::ZeroLapNumber { .. })
        ));
    }

    #[test]
    fn rejects_nan_lap_time() {
        let laps = vec![lap("VER", 1, f64::NAN)];
        assert!(matches!(
            validate_laps(&laps),
            Err(SchemaError::InvalidLapTime { .. })
        ));
    }

    #[test]
    fn rejects_negative_gap() {
        let mut bad = lap("VER", 1, 81.0);
        bad.gap_to_ahead_s = Some(-1.0);
        assert!(matches!(
            validate_laps(&[bad]),
            Err(SchemaError::InvalidGap { .. })
        ));
    }

    #[test]
    fn rejects_repeated_lap_number() {
        let laps = vec![lap("VER", 3, 81.0), lap("VER", 3, 81.1)];
        assert!(matches!(
            validate_laps(&laps),
            Err(SchemaError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn interleaved_drivers_are_fine() {
        let laps = vec![
            lap("VER", 1, 81.0),
            lap("NOR", 1, 81.3),
            lap("VER", 2, 80.9),
            lap("NOR", 2, 81.1),
        ];
        assert_eq!(validate_laps(&laps), Ok(()));
    }
}
