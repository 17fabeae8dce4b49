//! Milk and weight reporting for IngFarm.
//!
//! [`aggregator`] holds the pure aggregation functions; [`engine::ReportEngine`]
//! binds them to a [`farm_core::store::MeasurementStore`] and a reporting
//! timezone.

pub mod aggregator;
pub mod engine;
pub mod reports;

pub use engine::ReportEngine;
pub use reports::{
    DailyMilkReport, MeasurementDetail, MilkSummary, WeightPoint, WeightReport, WeightTrend,
};
