use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FarmError;

/// Unique identifier of a cow (a UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CowId(Uuid);

impl CowId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh random id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for CowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CowId {
    type Err = FarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(CowId)
            .map_err(|_| FarmError::InvalidArgument(format!("invalid cow id '{}': not a UUID", s)))
    }
}

/// A livestock animal tracked by the farm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cow {
    pub id: CowId,
    pub name: String,
    pub birthdate: NaiveDate,
}

/// Payload for registering a cow; the id is supplied separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCow {
    pub name: String,
    pub birthdate: NaiveDate,
}

/// What a measurement quantifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementKind {
    /// Milk yield in litres.
    Milk,
    /// Body weight in kilograms.
    Weight,
}

impl MeasurementKind {
    /// Resolve a sensor unit to the kind of measurement it produces.
    ///
    /// `"L"` is milk, `"kg"` is weight (case-insensitive). Anything else is
    /// not a unit the reports understand.
    pub fn from_unit(unit: &str) -> Option<Self> {
        match unit.trim().to_ascii_lowercase().as_str() {
            "l" => Some(MeasurementKind::Milk),
            "kg" => Some(MeasurementKind::Weight),
            _ => None,
        }
    }

    /// Canonical unit string for this kind.
    pub fn unit(&self) -> &'static str {
        match self {
            MeasurementKind::Milk => "L",
            MeasurementKind::Weight => "kg",
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementKind::Milk => f.write_str("milk"),
            MeasurementKind::Weight => f.write_str("weight"),
        }
    }
}

impl FromStr for MeasurementKind {
    type Err = FarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "milk" => Ok(MeasurementKind::Milk),
            "weight" => Ok(MeasurementKind::Weight),
            other => Err(FarmError::InvalidArgument(format!(
                "unknown measurement kind '{}'",
                other
            ))),
        }
    }
}

/// A sensor installed on the farm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: String,
    pub unit: String,
}

impl Sensor {
    pub fn kind(&self) -> Option<MeasurementKind> {
        MeasurementKind::from_unit(&self.unit)
    }
}

/// A stored, timestamped observation for one cow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    /// The cow this measurement refers to.
    pub cow_id: CowId,
    /// Sensor that produced the value.
    #[serde(default)]
    pub sensor_id: String,
    pub kind: MeasurementKind,
    /// UTC instant the value was measured.
    pub measured_at: DateTime<Utc>,
    pub value: Decimal,
    /// Insertion counter assigned by the store; breaks timestamp ties.
    #[serde(default)]
    pub sequence: u64,
}

/// A measurement before the store has assigned its sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMeasurement {
    pub cow_id: CowId,
    pub sensor_id: String,
    pub kind: MeasurementKind,
    pub measured_at: DateTime<Utc>,
    pub value: Decimal,
}

impl NewMeasurement {
    pub fn into_measurement(self, sequence: u64) -> Measurement {
        Measurement {
            cow_id: self.cow_id,
            sensor_id: self.sensor_id,
            kind: self.kind,
            measured_at: self.measured_at,
            value: self.value,
            sequence,
        }
    }
}

/// A stored measurement as printed by the CLI.
///
/// `value` is a JSON number here, like every figure in the reports. The
/// JSONL record keeps the exact decimal string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementOutput {
    pub cow_id: CowId,
    pub sensor_id: String,
    pub kind: MeasurementKind,
    pub measured_at: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub sequence: u64,
}

impl From<Measurement> for MeasurementOutput {
    fn from(m: Measurement) -> Self {
        Self {
            cow_id: m.cow_id,
            sensor_id: m.sensor_id,
            kind: m.kind,
            measured_at: m.measured_at,
            value: m.value,
            sequence: m.sequence,
        }
    }
}

/// A raw recorded sensor value, replayed by the simulator.
///
/// `value` is `None` when the sensor produced no reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub cow_id: CowId,
    pub sensor_id: String,
    #[serde(default)]
    pub value: Option<Decimal>,
}

/// Sort measurements by instant, then by insertion order.
pub fn sort_chronologically(measurements: &mut [Measurement]) {
    measurements.sort_by(|a, b| {
        a.measured_at
            .cmp(&b.measured_at)
            .then(a.sequence.cmp(&b.sequence))
    });
}
