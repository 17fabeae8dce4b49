//! Subcommand execution.
//!
//! Every one-shot command resolves to a JSON value that `main` prints. The
//! long-running `capture` command lives in `main` because it owns the
//! terminal until it is stopped.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use farm_core::error::{FarmError, Result};
use farm_core::models::{CowId, MeasurementKind, MeasurementOutput, NewCow, NewMeasurement};
use farm_core::settings::{Command, CowCommand, MeasurementCommand, ReportCommand};
use farm_core::store::MeasurementStore;
use farm_core::time_utils::{parse_report_date, parse_timestamp};
use farm_data::{FarmStore, MeasurementSimulator, StoreStats};
use farm_reports::ReportEngine;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

/// Output of `ingfarm health`.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    pub data_dir: Option<PathBuf>,
    pub timezone: String,
    pub records: StoreStats,
}

/// The store and reporting timezone a command runs against.
pub struct FarmApp {
    store: Arc<FarmStore>,
    tz: Tz,
}

impl FarmApp {
    pub fn new(store: Arc<FarmStore>, tz: Tz) -> Self {
        Self { store, tz }
    }

    /// Run a one-shot command. `capture` is rejected here.
    pub fn execute(&self, command: &Command) -> Result<Value> {
        match command {
            Command::Health => to_json(&self.health()),
            Command::Cows { action } => self.cows(action),
            Command::Measurements { action } => self.measurements(action),
            Command::Reports { report } => self.reports(report),
            Command::Capture { .. } => Err(FarmError::InvalidArgument(
                "capture is a long-running command".to_string(),
            )),
        }
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "healthy",
            version: env!("CARGO_PKG_VERSION"),
            data_dir: self.store.root().map(|p| p.to_path_buf()),
            timezone: self.tz.name().to_string(),
            records: self.store.stats(),
        }
    }

    // ── Cows ──────────────────────────────────────────────────────────────────

    fn cows(&self, action: &CowCommand) -> Result<Value> {
        match action {
            CowCommand::List => to_json(&self.store.list_cows()),
            CowCommand::Get { id } => {
                let id = CowId::from_str(id)?;
                to_json(&self.store.get_cow(&id)?)
            }
            CowCommand::Create { id, name, birthdate } => {
                let id = CowId::from_str(id)?;
                let cow = NewCow {
                    name: name.clone(),
                    birthdate: parse_report_date(birthdate)?,
                };
                to_json(&self.store.create_cow(id, cow)?)
            }
        }
    }

    // ── Measurements ──────────────────────────────────────────────────────────

    fn measurements(&self, action: &MeasurementCommand) -> Result<Value> {
        match action {
            MeasurementCommand::Next { cow_id } => {
                let cow_id = CowId::from_str(cow_id)?;
                self.store.get_cow(&cow_id)?;
                let mut simulator = MeasurementSimulator::from_store(&self.store);
                let next = simulator.next_measurement(&cow_id, Utc::now())?;
                to_json(&MeasurementOutput::from(self.store.append_measurement(next)?))
            }
            MeasurementCommand::Add {
                cow_id,
                kind,
                value,
                at,
                sensor,
            } => {
                let measured_at = match at {
                    Some(at) => parse_timestamp(at, self.tz)?,
                    None => Utc::now(),
                };
                let new = NewMeasurement {
                    cow_id: CowId::from_str(cow_id)?,
                    sensor_id: sensor.clone(),
                    kind: MeasurementKind::from_str(kind)?,
                    measured_at,
                    value: parse_value(value)?,
                };
                to_json(&MeasurementOutput::from(self.store.append_measurement(new)?))
            }
        }
    }

    // ── Reports ───────────────────────────────────────────────────────────────

    fn reports(&self, report: &ReportCommand) -> Result<Value> {
        let engine = ReportEngine::new(Arc::clone(&self.store), self.tz);
        match report {
            ReportCommand::MilkSummary { cow_id } => {
                to_json(&engine.milk_summary(&CowId::from_str(cow_id)?)?)
            }
            ReportCommand::MilkDaily { cow_id, date } => {
                to_json(&engine.milk_daily(&CowId::from_str(cow_id)?, date)?)
            }
            ReportCommand::Weight { cow_id } => {
                to_json(&engine.weight_report(&CowId::from_str(cow_id)?)?)
            }
        }
    }
}

fn parse_value(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim())
        .map_err(|_| FarmError::InvalidArgument(format!("invalid value '{}': not a decimal", raw)))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Process exit code for an error surfaced from a command.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<FarmError>() {
        Some(FarmError::InvalidArgument(_)) => 2,
        Some(FarmError::AlreadyExists(_)) => 3,
        Some(FarmError::NotFound { .. }) => 4,
        _ => 1,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
