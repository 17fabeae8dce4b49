//! Report value types.
//!
//! Reports are derived on demand and never persisted. Decimal fields are
//! serialized as JSON numbers; dates as `YYYY-MM-DD`, instants as RFC 3339.

use chrono::{DateTime, NaiveDate, Utc};
use farm_core::models::CowId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ── Milk ──────────────────────────────────────────────────────────────────────

/// Lifetime milk production of one cow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilkSummary {
    pub cow_id: CowId,
    pub cow_name: String,
    /// Exact sum of every milk measurement, in litres.
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    /// Distinct calendar dates with at least one milk measurement.
    pub recording_days: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub average_per_day: Decimal,
    pub measurement_count: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub average_per_measurement: Decimal,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl MilkSummary {
    /// The summary of a cow that has never been milked.
    pub fn empty(cow_id: CowId, cow_name: impl Into<String>) -> Self {
        Self {
            cow_id,
            cow_name: cow_name.into(),
            total: Decimal::ZERO,
            recording_days: 0,
            average_per_day: Decimal::ZERO,
            measurement_count: 0,
            average_per_measurement: Decimal::ZERO,
            first_date: None,
            last_date: None,
        }
    }
}

/// One measurement as listed in a daily report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementDetail {
    pub sensor_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub measured_at: DateTime<Utc>,
}

/// Milk production of one cow on one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMilkReport {
    pub cow_id: CowId,
    pub cow_name: String,
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub measurement_count: usize,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub min: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub max: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub average: Option<Decimal>,
    /// Measurements of the day in chronological order.
    pub measurements: Vec<MeasurementDetail>,
}

// ── Weight ────────────────────────────────────────────────────────────────────

/// A single weighing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightPoint {
    pub date: NaiveDate,
    pub measured_at: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
}

/// Change in weight between the first and the last weighing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTrend {
    /// Last weight minus first weight, in kilograms.
    #[serde(with = "rust_decimal::serde::float")]
    pub net_change: Decimal,
    /// Net change per elapsed calendar day.
    #[serde(with = "rust_decimal::serde::float")]
    pub average_daily_rate: Decimal,
    pub elapsed_days: i64,
}

/// Weight history and health indicator of one cow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightReport {
    pub cow_id: CowId,
    pub cow_name: String,
    pub points: Vec<WeightPoint>,
    /// `None` with fewer than two points or no elapsed days.
    pub trend: Option<WeightTrend>,
    pub latest: Option<WeightPoint>,
    /// Mean weight over the window ending at the latest weighing.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub recent_average: Option<Decimal>,
    pub recent_count: usize,
    /// Latest weight is more than 5 % below the recent average.
    pub ill: bool,
}
