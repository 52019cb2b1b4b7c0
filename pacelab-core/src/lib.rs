//! PaceLab Core — per-race resilience engine.
//!
//! This crate contains the race-level half of the pipeline:
//! - Domain types (laps, episodes, profiles)
//! - Input schema validation (the only fatal failure path)
//! - Equity curve construction with per-race traffic calibration
//! - Drawdown episode detection over the equity curve
//! - Priority-ordered disruption classification
//! - Recovery analysis and per-race profile assembly
//!
//! Season aggregation, clustering, and archetype assignment live in
//! `pacelab-runner`.

pub mod benchmark;
pub mod classify;
pub mod config;
pub mod domain;
pub mod drawdown;
pub mod equity;
pub mod race;
pub mod recovery;
pub mod schema;
