//! Domain types for PaceLab.

pub mod episode;
pub mod lap;
pub mod profile;

pub use episode::{DisruptionLabel, DrawdownEpisode, RecoveryMetrics, RecoveryShape};
pub use lap::{Compound, DriverId, LapRecord, RaceId};
pub use profile::{
    Archetype, DataQualityFlag, DriverRaceProfile, DriverSeasonProfile, RaceMeta,
};
