//! PaceLab Runner — season orchestration over `pacelab-core`.
//!
//! This crate builds on `pacelab-core` to provide:
//! - Parallel per-race analysis (rayon map over races)
//! - Per-driver season aggregation and feature standardization
//! - Deterministic k-means clustering with BLAKE3-derived seeds
//! - Semantic archetype assignment from centroid position
//! - CSV and JSON artifact export

pub mod archetype;
pub mod cluster;
pub mod export;
pub mod features;
pub mod season;

pub use archetype::{assignment_confidence, label_centroid, label_clusters};
pub use cluster::{ClusterConfig, ClusterError, ClusterSeeds, Clustering, KMeans};
pub use export::{
    export_race_profiles_csv, export_season_json, export_season_profiles_csv,
    import_season_json, save_artifacts,
};
pub use features::{
    aggregate_drivers, build_feature_matrix, standardize, DriverAggregate, FeatureMatrix,
    NEUTRAL_CATEGORY_SCORE,
};
pub use season::{
    analyze_season, reduce_profiles, RaceInput, SeasonAnalysis, SeasonConfig, SeasonError,
};
