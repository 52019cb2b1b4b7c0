//! End-to-end race pipeline scenarios.

use chrono::NaiveDate;
use pacelab_core::benchmark::ConstantBenchmark;
use pacelab_core::config::AnalysisConfig;
use pacelab_core::domain::{
    Compound, DataQualityFlag, DisruptionLabel, LapRecord, RaceMeta, RecoveryShape,
};
use pacelab_core::race::analyze_race;

const BASE_TIME: f64 = 90.0;

fn meta(id: &str) -> RaceMeta {
    RaceMeta {
        race_id: id.into(),
        date: NaiveDate::from_ymd_opt(2025, 3, 16).unwrap(),
    }
}

fn lap(driver: &str, n: u32, delta: f64) -> LapRecord {
    LapRecord {
        driver: driver.into(),
        lap_number: n,
        stint: 1,
        compound: Compound::Medium,
        tire_age: n,
        lap_time_s: BASE_TIME + delta,
        pit: false,
        safety_car: false,
        gap_to_ahead_s: None,
        telemetry_anomaly: false,
    }
}

/// The canonical incident scenario: 20 laps, flat pace except a 3-lap
/// 5s-per-lap collapse starting on lap 8 with a telemetry anomaly on
/// lap 9, back to baseline equity by lap 13.
fn incident_race() -> Vec<LapRecord> {
    (1..=20)
        .map(|n| {
            let delta = match n {
                8..=10 => 5.0,
                11..=13 => -5.0,
                _ => 0.0,
            };
            let mut l = lap("VER", n, delta);
            if n == 9 {
                l.telemetry_anomaly = true;
            }
            l
        })
        .collect()
}

#[test]
fn incident_scenario_end_to_end() {
    let cfg = AnalysisConfig::default();
    let analysis = analyze_race(
        meta("2025_incident_gp"),
        &incident_race(),
        &ConstantBenchmark(BASE_TIME),
        &cfg,
    )
    .unwrap();

    let episodes = &analysis.episodes["VER"];
    assert_eq!(episodes.len(), 1);
    let ep = &episodes[0];
    assert_eq!(ep.label, DisruptionLabel::MajorIncident);
    assert_eq!(ep.peak_lap, 7);
    assert_eq!(ep.trough_lap, 10);
    assert_eq!(ep.recovery_lap, Some(13));
    assert!((ep.depth - (-15.0)).abs() < 1e-12);

    let profile = &analysis.profiles[0];
    assert!((profile.reset_velocity.unwrap() - 5.0).abs() < 1e-12);
    assert!((profile.max_drawdown - (-15.0)).abs() < 1e-12);
    assert!((profile.major_incident_resilience.unwrap() - 5.0).abs() < 1e-12);
    assert_eq!(profile.traffic_resilience, None);
    assert_eq!(profile.operational_resilience, None);
    // Uniform 5 s/lap regain: linear shape.
    assert_eq!(profile.dominant_shape, RecoveryShape::Linear);
}

#[test]
fn equity_invariants_hold_for_every_driver() {
    let mut laps = incident_race();
    laps.extend((1..=20).map(|n| lap("NOR", n, if n == 5 { 3.0 } else { 0.0 })));

    let cfg = AnalysisConfig::default();
    let analysis = analyze_race(
        meta("2025_two_driver_gp"),
        &laps,
        &ConstantBenchmark(BASE_TIME),
        &cfg,
    )
    .unwrap();

    for curve in analysis.curves.values() {
        assert_eq!(curve.equity[0], 0.0);
        for t in 1..curve.equity.len() {
            let step = curve.equity[t] - curve.equity[t - 1];
            assert!((step - (-curve.deltas[t - 1])).abs() < 1e-12);
        }
    }
}

#[test]
fn episode_invariants_hold() {
    let mut laps = incident_race();
    // Second, unresolved collapse near the end.
    for l in laps.iter_mut() {
        if l.lap_number >= 18 {
            l.lap_time_s = BASE_TIME + 4.0;
        }
    }

    let cfg = AnalysisConfig::default();
    let analysis = analyze_race(
        meta("2025_late_collapse_gp"),
        &laps,
        &ConstantBenchmark(BASE_TIME),
        &cfg,
    )
    .unwrap();

    let curve = &analysis.curves["VER"];
    for ep in &analysis.episodes["VER"] {
        assert!(ep.depth <= 0.0);
        assert!(ep.trough_lap >= ep.peak_lap);
        if let Some(recovery) = ep.recovery_lap {
            assert!(recovery > ep.trough_lap);
            assert!(curve.equity[recovery as usize] >= curve.equity[ep.peak_lap as usize]);
        }
    }

    let profile = &analysis.profiles[0];
    assert_eq!(profile.unresolved_count, 1);
    assert!(profile
        .quality_flags
        .iter()
        .any(|f| matches!(f, DataQualityFlag::SustainedImpairment { .. })));
    // Unresolved depth (-12) is shallower than the incident (-15).
    assert!((profile.max_drawdown - (-15.0)).abs() < 1e-12);
}

#[test]
fn pit_window_classifies_operational() {
    let laps: Vec<LapRecord> = (1..=20)
        .map(|n| {
            let delta = match n {
                // 4-lap decline so the sharp-loss rule stays quiet.
                9..=12 => 2.0,
                13..=16 => -2.0,
                _ => 0.0,
            };
            let mut l = lap("LEC", n, delta);
            if n == 10 {
                l.pit = true;
            }
            l
        })
        .collect();

    let cfg = AnalysisConfig::default();
    let analysis = analyze_race(
        meta("2025_pit_gp"),
        &laps,
        &ConstantBenchmark(BASE_TIME),
        &cfg,
    )
    .unwrap();

    let episodes = &analysis.episodes["LEC"];
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].label, DisruptionLabel::Operational);
    assert!(analysis.profiles[0].operational_resilience.is_some());
}

#[test]
fn restart_delta_recorded_after_safety_car() {
    let laps: Vec<LapRecord> = (1..=20)
        .map(|n| {
            let mut l = lap("RUS", n, if n == 8 { 1.5 } else { 0.0 });
            if (6..=7).contains(&n) {
                l.safety_car = true;
            }
            l
        })
        .collect();

    let cfg = AnalysisConfig::default();
    let analysis = analyze_race(
        meta("2025_sc_gp"),
        &laps,
        &ConstantBenchmark(BASE_TIME),
        &cfg,
    )
    .unwrap();

    let profile = &analysis.profiles[0];
    assert!((profile.restart_delta.unwrap() - 1.5).abs() < 1e-12);
}
