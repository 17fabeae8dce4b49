//! Store port consumed by the reporting engine.
//!
//! The engine never writes; it only needs to resolve a cow and list that
//! cow's measurements of one kind. Adapters live in `farm-data`.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Cow, CowId, Measurement, MeasurementKind};

/// Half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

/// Read access to cows and their measurements.
pub trait MeasurementStore: Send + Sync {
    /// Look up a cow. Fails with `FarmError::NotFound` when absent.
    fn get_cow(&self, id: &CowId) -> Result<Cow>;

    /// Measurements of `kind` for `cow_id`, optionally restricted to `range`.
    ///
    /// Implementations return an owned snapshot ordered by `measured_at`,
    /// ties broken by `sequence`.
    fn list_measurements(
        &self,
        cow_id: &CowId,
        kind: MeasurementKind,
        range: Option<TimeRange>,
    ) -> Result<Vec<Measurement>>;
}

impl<S: MeasurementStore + ?Sized> MeasurementStore for std::sync::Arc<S> {
    fn get_cow(&self, id: &CowId) -> Result<Cow> {
        (**self).get_cow(id)
    }

    fn list_measurements(
        &self,
        cow_id: &CowId,
        kind: MeasurementKind,
        range: Option<TimeRange>,
    ) -> Result<Vec<Measurement>> {
        (**self).list_measurements(cow_id, kind, range)
    }
}
