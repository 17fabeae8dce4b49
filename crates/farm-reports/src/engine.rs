//! Report queries bound to a measurement store.

use chrono_tz::Tz;
use farm_core::error::Result;
use farm_core::models::{CowId, MeasurementKind};
use farm_core::store::MeasurementStore;
use farm_core::time_utils::{day_range, parse_report_date};
use tracing::debug;

use crate::aggregator::{MilkAggregator, WeightAggregator};
use crate::reports::{DailyMilkReport, MilkSummary, WeightReport};

/// Answers report queries for any [`MeasurementStore`].
///
/// Every query first resolves the cow so that an unknown id fails with
/// `NotFound` before any measurement is read. Queries only read and can be
/// retried freely.
pub struct ReportEngine<S> {
    store: S,
    tz: Tz,
}

impl<S: MeasurementStore> ReportEngine<S> {
    /// Engine reporting calendar dates in `tz`.
    pub fn new(store: S, tz: Tz) -> Self {
        Self { store, tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Lifetime milk production of `cow_id`.
    pub fn milk_summary(&self, cow_id: &CowId) -> Result<MilkSummary> {
        let cow = self.store.get_cow(cow_id)?;
        let measurements = self
            .store
            .list_measurements(cow_id, MeasurementKind::Milk, None)?;
        debug!(cow = %cow_id, count = measurements.len(), "milk summary");
        MilkAggregator::summarize(&cow, &measurements, self.tz)
    }

    /// Milk production of `cow_id` on `date` (`YYYY-MM-DD`).
    pub fn milk_daily(&self, cow_id: &CowId, date: &str) -> Result<DailyMilkReport> {
        let date = parse_report_date(date)?;
        let cow = self.store.get_cow(cow_id)?;
        let range = day_range(date, self.tz);
        let measurements =
            self.store
                .list_measurements(cow_id, MeasurementKind::Milk, Some(range))?;
        debug!(cow = %cow_id, %date, count = measurements.len(), "daily milk report");
        MilkAggregator::daily(&cow, date, &measurements, self.tz)
    }

    /// Weight history, trend and health indicator of `cow_id`.
    pub fn weight_report(&self, cow_id: &CowId) -> Result<WeightReport> {
        let cow = self.store.get_cow(cow_id)?;
        let measurements = self
            .store
            .list_measurements(cow_id, MeasurementKind::Weight, None)?;
        debug!(cow = %cow_id, count = measurements.len(), "weight report");
        WeightAggregator::report(&cow, &measurements, self.tz)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
