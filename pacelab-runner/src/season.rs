//! Season orchestration: parallel per-race analysis, then a sequential
//! reduce into clustered driver archetypes.
//!
//! The map phase runs one `analyze_race` per race on the rayon pool;
//! per-race analysis is pure, so the map is embarrassingly parallel and
//! the reduce re-sorts by race id before aggregating, keeping output
//! independent of scheduling order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pacelab_core::benchmark::BenchmarkProvider;
use pacelab_core::config::AnalysisConfig;
use pacelab_core::domain::{
    DriverRaceProfile, DriverSeasonProfile, LapRecord, RaceId, RaceMeta,
};
use pacelab_core::race::{analyze_race, AnalysisError, RaceAnalysis};

use crate::archetype::{assignment_confidence, label_clusters};
use crate::cluster::{ClusterConfig, ClusterError, Clustering, KMeans};
use crate::features::{aggregate_drivers, build_feature_matrix, FeatureMatrix};

#[derive(Debug, Error)]
pub enum SeasonError {
    #[error("no races supplied")]
    NoRaces,
    #[error("race {race_id}: {source}")]
    Analysis {
        race_id: RaceId,
        #[source]
        source: AnalysisError,
    },
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

/// One race's input to the season pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceInput {
    pub meta: RaceMeta,
    pub laps: Vec<LapRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeasonConfig {
    pub analysis: AnalysisConfig,
    pub cluster: ClusterConfig,
}

/// Full season output: per-race analyses plus the clustered profiles.
#[derive(Debug, Clone)]
pub struct SeasonAnalysis {
    /// Per-race results, sorted by race id.
    pub races: Vec<RaceAnalysis>,
    pub matrix: FeatureMatrix,
    pub clustering: Clustering,
    /// One profile per driver, in `matrix.drivers` order.
    pub profiles: Vec<DriverSeasonProfile>,
}

/// Analyze every race and cluster the drivers into archetypes.
pub fn analyze_season(
    races: &[RaceInput],
    provider: &dyn BenchmarkProvider,
    config: &SeasonConfig,
) -> Result<SeasonAnalysis, SeasonError> {
    if races.is_empty() {
        return Err(SeasonError::NoRaces);
    }

    let mut analyses: Vec<RaceAnalysis> = races
        .par_iter()
        .map(|race| {
            analyze_race(race.meta.clone(), &race.laps, provider, &config.analysis).map_err(
                |source| SeasonError::Analysis {
                    race_id: race.meta.race_id.clone(),
                    source,
                },
            )
        })
        .collect::<Result<_, _>>()?;
    analyses.sort_by(|a, b| a.meta.race_id.cmp(&b.meta.race_id));

    let race_profiles: Vec<DriverRaceProfile> = analyses
        .iter()
        .flat_map(|a| a.profiles.iter().cloned())
        .collect();

    let (matrix, clustering, profiles) = reduce_profiles(&race_profiles, &config.cluster)?;

    Ok(SeasonAnalysis {
        races: analyses,
        matrix,
        clustering,
        profiles,
    })
}

/// The sequential reduce: aggregate race profiles per driver, build the
/// feature matrix, cluster the standardized rows, and attach archetypes.
pub fn reduce_profiles(
    race_profiles: &[DriverRaceProfile],
    cluster: &ClusterConfig,
) -> Result<(FeatureMatrix, Clustering, Vec<DriverSeasonProfile>), ClusterError> {
    let aggregates = aggregate_drivers(race_profiles);
    let matrix = build_feature_matrix(&aggregates);
    let clustering = KMeans::new(cluster).fit(&matrix.standardized)?;
    let archetypes = label_clusters(&clustering);

    let profiles = aggregates
        .iter()
        .enumerate()
        .map(|(i, agg)| {
            let cluster_idx = clustering.assignments[i];
            DriverSeasonProfile {
                driver: agg.driver.clone(),
                races: agg.races,
                features: matrix.raw[i],
                cluster: cluster_idx,
                archetype: archetypes[cluster_idx],
                confidence: assignment_confidence(
                    &matrix.standardized[i],
                    cluster_idx,
                    &clustering,
                ),
                dominant_shape: agg.dominant_shape,
                sustained_impairments: agg.sustained_impairments,
            }
        })
        .collect();

    Ok((matrix, clustering, profiles))
}
