//! Artifact export for race and season profiles.
//!
//! Two formats: CSV tables for external analysis tools, and a JSON
//! manifest of the season profiles for round-tripping.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use pacelab_core::domain::{DriverRaceProfile, DriverSeasonProfile};

use crate::season::SeasonAnalysis;

/// Serialize the season profiles to pretty JSON.
pub fn export_season_json(profiles: &[DriverSeasonProfile]) -> Result<String> {
    serde_json::to_string_pretty(profiles).context("failed to serialize season profiles to JSON")
}

/// Deserialize season profiles from JSON.
pub fn import_season_json(json: &str) -> Result<Vec<DriverSeasonProfile>> {
    serde_json::from_str(json).context("failed to deserialize season profiles from JSON")
}

/// Export per-race driver profiles as CSV.
///
/// Columns: race_id, driver, max_drawdown, reset_velocity, restart_delta,
/// major_incident_resilience, traffic_resilience, operational_resilience,
/// recovery_curvature, dominant_shape, episode_count, unresolved_count
pub fn export_race_profiles_csv(profiles: &[DriverRaceProfile]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "race_id",
        "driver",
        "max_drawdown",
        "reset_velocity",
        "restart_delta",
        "major_incident_resilience",
        "traffic_resilience",
        "operational_resilience",
        "recovery_curvature",
        "dominant_shape",
        "episode_count",
        "unresolved_count",
    ])?;

    for p in profiles {
        wtr.write_record([
            &p.race_id,
            &p.driver,
            &format!("{:.3}", p.max_drawdown),
            &opt(p.reset_velocity),
            &opt(p.restart_delta),
            &opt(p.major_incident_resilience),
            &opt(p.traffic_resilience),
            &opt(p.operational_resilience),
            &opt(p.recovery_curvature),
            &format!("{:?}", p.dominant_shape),
            &p.episode_count.to_string(),
            &p.unresolved_count.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export season profiles as CSV.
///
/// Columns: driver, races, cluster, archetype, confidence, max_drawdown,
/// reset_velocity, restart_delta, major_incident, traffic, operational,
/// recovery_curvature, dominant_shape, sustained_impairments
pub fn export_season_profiles_csv(profiles: &[DriverSeasonProfile]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "driver",
        "races",
        "cluster",
        "archetype",
        "confidence",
        "max_drawdown",
        "reset_velocity",
        "restart_delta",
        "major_incident",
        "traffic",
        "operational",
        "recovery_curvature",
        "dominant_shape",
        "sustained_impairments",
    ])?;

    for p in profiles {
        let f = &p.features;
        wtr.write_record([
            &p.driver,
            &p.races.to_string(),
            &p.cluster.to_string(),
            p.archetype.as_str(),
            &format!("{:.3}", p.confidence),
            &format!("{:.3}", f[0]),
            &format!("{:.3}", f[1]),
            &format!("{:.3}", f[2]),
            &format!("{:.3}", f[3]),
            &format!("{:.3}", f[4]),
            &format!("{:.3}", f[5]),
            &format!("{:.3}", f[6]),
            &format!("{:?}", p.dominant_shape),
            &p.sustained_impairments.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Save the full artifact set for a season run.
///
/// Creates a directory named `season_{timestamp}/` under `output_dir`
/// containing:
/// - `season.json` — the season profiles
/// - `season_profiles.csv` — one row per driver
/// - `race_profiles.csv` — one row per (race, driver)
///
/// Returns the path to the created directory.
pub fn save_artifacts(analysis: &SeasonAnalysis, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!("season_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_season_json(&analysis.profiles)?;
    std::fs::write(run_dir.join("season.json"), &json)?;

    let season_csv = export_season_profiles_csv(&analysis.profiles)?;
    std::fs::write(run_dir.join("season_profiles.csv"), &season_csv)?;

    let race_profiles: Vec<DriverRaceProfile> = analysis
        .races
        .iter()
        .flat_map(|r| r.profiles.iter().cloned())
        .collect();
    let race_csv = export_race_profiles_csv(&race_profiles)?;
    std::fs::write(run_dir.join("race_profiles.csv"), &race_csv)?;

    Ok(run_dir)
}

fn opt(v: Option<f64>) -> String {
    v.map(|v| format!("{:.3}", v)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacelab_core::domain::{Archetype, RecoveryShape};

    fn sample_race_profile() -> DriverRaceProfile {
        DriverRaceProfile {
            driver: "VER".into(),
            race_id: "2025_bahrain_gp".into(),
            max_drawdown: -14.2,
            reset_velocity: Some(2.5),
            restart_delta: None,
            major_incident_resilience: Some(2.5),
            traffic_resilience: None,
            operational_resilience: None,
            recovery_curvature: Some(0.12),
            dominant_shape: RecoveryShape::V,
            episode_count: 2,
            unresolved_count: 0,
            quality_flags: Vec::new(),
        }
    }

    fn sample_season_profile() -> DriverSeasonProfile {
        DriverSeasonProfile {
            driver: "VER".into(),
            races: 22,
            features: [-14.2, 2.5, 0.4, 0.9, 0.5, 0.5, 0.12],
            cluster: 0,
            archetype: Archetype::EntropyKing,
            confidence: 0.87,
            dominant_shape: RecoveryShape::V,
            sustained_impairments: 1,
        }
    }

    #[test]
    fn season_json_roundtrip() {
        let profiles = vec![sample_season_profile()];
        let json = export_season_json(&profiles).unwrap();
        let restored = import_season_json(&json).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].driver, "VER");
        assert_eq!(restored[0].archetype, Archetype::EntropyKing);
        assert_eq!(restored[0].features, profiles[0].features);
    }

    #[test]
    fn race_csv_columns_and_content() {
        let csv = export_race_profiles_csv(&[sample_race_profile()]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("race_id,driver,max_drawdown"));
        assert!(lines[1].contains("2025_bahrain_gp"));
        assert!(lines[1].contains("-14.200"));
        // Missing optionals export as empty fields.
        assert!(lines[1].contains(",,"));
    }

    #[test]
    fn season_csv_has_archetype_label() {
        let csv = export_season_profiles_csv(&[sample_season_profile()]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("Entropy King"));
        assert!(lines[1].contains("0.870"));
    }

    #[test]
    fn empty_profiles_export_header_only() {
        let csv = export_season_profiles_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
