//! Domain types and shared plumbing for IngFarm.
//!
//! Holds the cow and measurement model, the error taxonomy, the decimal
//! precision policy, calendar/timezone helpers, CLI settings and the store
//! port that the reporting engine reads through.

pub mod error;
pub mod models;
pub mod precision;
pub mod settings;
pub mod store;
pub mod time_utils;

pub use error::{FarmError, Result};
