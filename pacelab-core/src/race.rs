//! Per-race pipeline: validate, build equity, detect, classify, recover.
//!
//! `analyze_race` is a pure transformation over an immutable lap table.
//! Races are independent of each other, so the season layer can fan this
//! out across threads without coordination.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::benchmark::BenchmarkProvider;
use crate::classify::DisruptionClassifier;
use crate::config::{AnalysisConfig, ConfigError};
use crate::domain::{
    DataQualityFlag, DrawdownEpisode, DriverId, DriverRaceProfile, LapRecord, RaceMeta,
};
use crate::drawdown::DrawdownDetector;
use crate::equity::{EquityCurve, EquityCurveBuilder};
use crate::recovery::RecoveryAnalyzer;
use crate::schema::{validate_laps, SchemaError};

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// Everything the race phase produces for one race.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceAnalysis {
    pub meta: RaceMeta,
    pub traffic_threshold_s: f64,
    pub profiles: Vec<DriverRaceProfile>,
    pub episodes: BTreeMap<DriverId, Vec<DrawdownEpisode>>,
    pub curves: BTreeMap<DriverId, EquityCurve>,
}

/// Run the full per-race pipeline for one race.
///
/// Malformed input and degenerate configuration are the only error paths;
/// all data-sparsity conditions surface as quality flags on the profiles.
pub fn analyze_race(
    meta: RaceMeta,
    laps: &[LapRecord],
    provider: &dyn BenchmarkProvider,
    config: &AnalysisConfig,
) -> Result<RaceAnalysis, AnalysisError> {
    config.validate()?;
    validate_laps(laps)?;

    let race_equity = EquityCurveBuilder::new(config).build(laps, provider);
    let detector = DrawdownDetector::new(config);
    let classifier = DisruptionClassifier::new(config);
    let analyzer = RecoveryAnalyzer::new(config);

    let mut profiles = Vec::with_capacity(race_equity.curves.len());
    let mut episodes = BTreeMap::new();

    for (driver, curve) in &race_equity.curves {
        let mut scan = detector.scan(curve);
        for episode in &mut scan.episodes {
            episode.label = classifier.classify(episode, curve, race_equity.traffic_threshold_s);
        }

        let mut profile = analyzer.profile(&meta.race_id, curve, &scan);
        for flag in &race_equity.quality_flags {
            if let DataQualityFlag::BenchmarkFallback { driver: d, .. } = flag {
                if d == driver {
                    profile.quality_flags.push(flag.clone());
                }
            }
        }

        episodes.insert(driver.clone(), scan.episodes);
        profiles.push(profile);
    }

    Ok(RaceAnalysis {
        meta,
        traffic_threshold_s: race_equity.traffic_threshold_s,
        profiles,
        episodes,
        curves: race_equity.curves,
    })
}
