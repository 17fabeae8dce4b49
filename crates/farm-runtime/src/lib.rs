//! Runtime layer for IngFarm.
//!
//! Hosts the background capture loop that feeds simulated sensor readings
//! into the record store.

pub mod orchestrator;

pub use farm_core as core;
pub use farm_data as data;
pub use orchestrator::{CaptureHandle, CaptureOrchestrator, CaptureSnapshot};
