//! Milk and weight aggregation over calendar days.
//!
//! Everything here is a pure function of a cow, its measurements and the
//! reporting timezone. Input measurements are expected in chronological
//! order, as the store returns them. Sums that leave the decimal range are
//! reported as errors.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;
use farm_core::error::{FarmError, Result};
use farm_core::models::{Cow, Measurement};
use farm_core::precision::{checked_change, checked_total, mean, ratio};
use farm_core::time_utils::local_date;
use rust_decimal::Decimal;

use crate::reports::{
    DailyMilkReport, MeasurementDetail, MilkSummary, WeightPoint, WeightReport, WeightTrend,
};

/// Days covered by the recent-weight window, ending at the latest weighing.
pub const RECENT_WINDOW_DAYS: i64 = 30;

/// Drop below the recent average, in percent, that flags a cow as ill.
pub const ILL_DROP_PERCENT: i64 = 5;

// ── DayStats ──────────────────────────────────────────────────────────────────

/// Milk totals accumulated over one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayStats {
    pub date: NaiveDate,
    pub total: Decimal,
    pub count: usize,
    pub min: Decimal,
    pub max: Decimal,
}

impl DayStats {
    fn new(date: NaiveDate, first: Decimal) -> Self {
        Self {
            date,
            total: Decimal::ZERO,
            count: 0,
            min: first,
            max: first,
        }
    }

    fn add(&mut self, value: Decimal) -> Result<()> {
        self.total = self
            .total
            .checked_add(value)
            .ok_or_else(|| FarmError::overflow("daily milk total"))?;
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        Ok(())
    }
}

// ── MilkAggregator ────────────────────────────────────────────────────────────

/// Stateless helper that turns milk measurements into reports.
pub struct MilkAggregator;

impl MilkAggregator {
    /// Group measurements by calendar date in `tz`, ascending.
    pub fn group_daily(measurements: &[Measurement], tz: Tz) -> Result<Vec<DayStats>> {
        let mut days: BTreeMap<NaiveDate, DayStats> = BTreeMap::new();
        for m in measurements {
            let date = local_date(m.measured_at, tz);
            days.entry(date)
                .or_insert_with(|| DayStats::new(date, m.value))
                .add(m.value)?;
        }
        Ok(days.into_values().collect())
    }

    /// Lifetime summary of `measurements`.
    pub fn summarize(cow: &Cow, measurements: &[Measurement], tz: Tz) -> Result<MilkSummary> {
        let days = Self::group_daily(measurements, tz)?;
        if days.is_empty() {
            return Ok(MilkSummary::empty(cow.id, cow.name.clone()));
        }

        let total = checked_total(days.iter().map(|d| d.total), "milk total")?;
        let measurement_count: usize = days.iter().map(|d| d.count).sum();

        Ok(MilkSummary {
            cow_id: cow.id,
            cow_name: cow.name.clone(),
            total,
            recording_days: days.len(),
            average_per_day: mean(total, days.len()),
            measurement_count,
            average_per_measurement: mean(total, measurement_count),
            first_date: days.first().map(|d| d.date),
            last_date: days.last().map(|d| d.date),
        })
    }

    /// Report for the single calendar `date`; other dates are ignored.
    pub fn daily(
        cow: &Cow,
        date: NaiveDate,
        measurements: &[Measurement],
        tz: Tz,
    ) -> Result<DailyMilkReport> {
        let of_day: Vec<&Measurement> = measurements
            .iter()
            .filter(|m| local_date(m.measured_at, tz) == date)
            .collect();

        let mut stats: Option<DayStats> = None;
        for m in &of_day {
            stats
                .get_or_insert_with(|| DayStats::new(date, m.value))
                .add(m.value)?;
        }

        let details = of_day
            .iter()
            .map(|m| MeasurementDetail {
                sensor_id: m.sensor_id.clone(),
                value: m.value,
                measured_at: m.measured_at,
            })
            .collect();

        Ok(DailyMilkReport {
            cow_id: cow.id,
            cow_name: cow.name.clone(),
            date,
            total: stats.as_ref().map_or(Decimal::ZERO, |s| s.total),
            measurement_count: stats.as_ref().map_or(0, |s| s.count),
            min: stats.as_ref().map(|s| s.min),
            max: stats.as_ref().map(|s| s.max),
            average: stats.as_ref().map(|s| mean(s.total, s.count)),
            measurements: details,
        })
    }
}

// ── WeightAggregator ──────────────────────────────────────────────────────────

/// Stateless helper that turns weighings into a weight report.
pub struct WeightAggregator;

impl WeightAggregator {
    /// One point per weighing, dated in `tz`.
    pub fn points(measurements: &[Measurement], tz: Tz) -> Vec<WeightPoint> {
        measurements
            .iter()
            .map(|m| WeightPoint {
                date: local_date(m.measured_at, tz),
                measured_at: m.measured_at,
                value: m.value,
            })
            .collect()
    }

    /// Net change and daily rate between the first and last point.
    ///
    /// `None` with fewer than two points or when both fall on the same date.
    pub fn trend(points: &[WeightPoint]) -> Result<Option<WeightTrend>> {
        let (first, last) = match points {
            [first, .., last] => (first, last),
            _ => return Ok(None),
        };

        let elapsed_days = (last.date - first.date).num_days();
        if elapsed_days <= 0 {
            return Ok(None);
        }

        let net_change = checked_change(last.value, first.value, "weight change")?;
        Ok(ratio(net_change, Decimal::from(elapsed_days)).map(|average_daily_rate| {
            WeightTrend {
                net_change,
                average_daily_rate,
                elapsed_days,
            }
        }))
    }

    /// Full weight report of `measurements`.
    pub fn report(cow: &Cow, measurements: &[Measurement], tz: Tz) -> Result<WeightReport> {
        let points = Self::points(measurements, tz);
        let trend = Self::trend(&points)?;
        let latest = points.last().cloned();

        let (recent_average, recent_count) = match &latest {
            Some(latest) => {
                let window_start = latest.measured_at - Duration::days(RECENT_WINDOW_DAYS);
                let recent: Vec<Decimal> = points
                    .iter()
                    .filter(|p| p.measured_at >= window_start)
                    .map(|p| p.value)
                    .collect();
                let sum = checked_total(recent.iter().copied(), "recent weight total")?;
                (Some(mean(sum, recent.len())), recent.len())
            }
            None => (None, 0),
        };

        // The threshold itself is not rounded.
        let ill = match (&latest, recent_average) {
            (Some(latest), Some(avg)) if avg > Decimal::ZERO => avg
                .checked_mul(Decimal::new(100 - ILL_DROP_PERCENT, 2))
                .is_some_and(|threshold| latest.value < threshold),
            _ => false,
        };

        Ok(WeightReport {
            cow_id: cow.id,
            cow_name: cow.name.clone(),
            points,
            trend,
            latest,
            recent_average,
            recent_count,
            ill,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
