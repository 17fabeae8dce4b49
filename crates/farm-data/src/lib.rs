//! Data layer for IngFarm.
//!
//! Loads and appends the JSONL record files of a data directory, keeps the
//! in-memory [`store::FarmStore`] index over them, and replays recorded sensor
//! readings through [`simulator::MeasurementSimulator`].

pub mod reader;
pub mod simulator;
pub mod store;

pub use farm_core as core;
pub use simulator::MeasurementSimulator;
pub use store::{FarmStore, StoreStats};
