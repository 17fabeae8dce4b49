//! File-backed record store.
//!
//! [`FarmStore`] keeps an in-memory index of cows, sensors, recorded readings
//! and measurements, and mirrors every write to the JSONL files of its data
//! directory. Measurements are append-only; each one receives a sequence
//! number that breaks ties between equal timestamps.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use farm_core::error::{FarmError, Result};
use farm_core::models::{
    sort_chronologically, Cow, CowId, Measurement, MeasurementKind, NewCow, NewMeasurement,
    Reading, Sensor,
};
use farm_core::store::{MeasurementStore, TimeRange};
use tracing::{debug, info};

use crate::reader::{
    append_record, load_records, COWS_FILE, MEASUREMENTS_FILE, READINGS_FILE, SENSORS_FILE,
};

// ── Index ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct StoreIndex {
    /// Cows in registration order.
    cows: Vec<Cow>,
    cow_positions: HashMap<CowId, usize>,
    sensors: HashMap<String, Sensor>,
    readings: Vec<Reading>,
    /// Per-cow measurements, kept in `(measured_at, sequence)` order.
    measurements: HashMap<CowId, Vec<Measurement>>,
    next_sequence: u64,
}

impl StoreIndex {
    fn insert_cow(&mut self, cow: Cow) {
        self.cow_positions.insert(cow.id, self.cows.len());
        self.cows.push(cow);
    }

    fn cow(&self, id: &CowId) -> Option<&Cow> {
        self.cow_positions.get(id).map(|&i| &self.cows[i])
    }

    fn insert_measurement(&mut self, measurement: Measurement) {
        let series = self.measurements.entry(measurement.cow_id).or_default();
        let at = series.partition_point(|m| {
            (m.measured_at, m.sequence) <= (measurement.measured_at, measurement.sequence)
        });
        series.insert(at, measurement);
    }
}

/// Summary counts for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub cows: usize,
    pub sensors: usize,
    pub readings: usize,
    pub measurements: usize,
}

// ── FarmStore ─────────────────────────────────────────────────────────────────

/// Cows, sensors, readings and measurements, optionally persisted to disk.
#[derive(Debug)]
pub struct FarmStore {
    /// Data directory; `None` for a purely in-memory store.
    root: Option<PathBuf>,
    index: RwLock<StoreIndex>,
}

impl FarmStore {
    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            root: None,
            index: RwLock::new(StoreIndex::default()),
        }
    }

    /// Open (creating if needed) the data directory at `dir` and load it.
    ///
    /// Measurements are re-sequenced in file order, so the file order is the
    /// insertion order.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        let mut index = StoreIndex::default();

        for cow in load_records::<Cow>(&dir.join(COWS_FILE))? {
            if index.cow(&cow.id).is_some() {
                debug!("Duplicate cow {} in {}; keeping first", cow.id, COWS_FILE);
                continue;
            }
            index.insert_cow(cow);
        }

        for sensor in load_records::<Sensor>(&dir.join(SENSORS_FILE))? {
            index.sensors.insert(sensor.id.clone(), sensor);
        }

        index.readings = load_records::<Reading>(&dir.join(READINGS_FILE))?;

        let mut loaded = load_records::<Measurement>(&dir.join(MEASUREMENTS_FILE))?;
        for (position, m) in loaded.iter_mut().enumerate() {
            m.sequence = position as u64;
        }
        index.next_sequence = loaded.len() as u64;
        let mut by_cow: HashMap<CowId, Vec<Measurement>> = HashMap::new();
        for m in loaded {
            by_cow.entry(m.cow_id).or_default().push(m);
        }
        for series in by_cow.values_mut() {
            sort_chronologically(series);
        }
        index.measurements = by_cow;

        info!(
            "Opened farm store at {}: {} cows, {} sensors, {} readings, {} measurements",
            dir.display(),
            index.cows.len(),
            index.sensors.len(),
            index.readings.len(),
            index.next_sequence
        );

        Ok(Self {
            root: Some(dir.to_path_buf()),
            index: RwLock::new(index),
        })
    }

    /// The data directory, if persistent.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    // ── Cows ──────────────────────────────────────────────────────────────────

    /// Register a cow under `id`. Fails with `AlreadyExists` on a duplicate id.
    pub fn create_cow(&self, id: CowId, cow: NewCow) -> Result<Cow> {
        let mut index = self.write();
        if index.cow(&id).is_some() {
            return Err(FarmError::AlreadyExists(format!(
                "Cow with id {} already exists",
                id
            )));
        }

        let cow = Cow {
            id,
            name: cow.name,
            birthdate: cow.birthdate,
        };
        self.persist(COWS_FILE, &cow)?;
        index.insert_cow(cow.clone());
        info!("Registered cow {} ({})", cow.id, cow.name);
        Ok(cow)
    }

    /// All cows in registration order.
    pub fn list_cows(&self) -> Vec<Cow> {
        self.read().cows.clone()
    }

    // ── Sensors and readings ──────────────────────────────────────────────────

    /// Add or replace a sensor definition.
    pub fn register_sensor(&self, sensor: Sensor) -> Result<()> {
        let mut index = self.write();
        self.persist(SENSORS_FILE, &sensor)?;
        index.sensors.insert(sensor.id.clone(), sensor);
        Ok(())
    }

    pub fn sensor(&self, id: &str) -> Option<Sensor> {
        self.read().sensors.get(id).cloned()
    }

    pub fn sensors(&self) -> Vec<Sensor> {
        let mut sensors: Vec<Sensor> = self.read().sensors.values().cloned().collect();
        sensors.sort_by(|a, b| a.id.cmp(&b.id));
        sensors
    }

    /// Append a recorded raw reading for later replay.
    pub fn record_reading(&self, reading: Reading) -> Result<()> {
        let mut index = self.write();
        self.persist(READINGS_FILE, &reading)?;
        index.readings.push(reading);
        Ok(())
    }

    /// All recorded readings in file order.
    pub fn readings(&self) -> Vec<Reading> {
        self.read().readings.clone()
    }

    // ── Measurements ──────────────────────────────────────────────────────────

    /// Append a measurement for an existing cow and return it with its
    /// assigned sequence number.
    pub fn append_measurement(&self, new: NewMeasurement) -> Result<Measurement> {
        let mut index = self.write();
        if index.cow(&new.cow_id).is_none() {
            return Err(FarmError::cow_not_found(new.cow_id));
        }

        let measurement = new.into_measurement(index.next_sequence);
        self.persist(MEASUREMENTS_FILE, &measurement)?;
        index.next_sequence += 1;
        debug!(
            cow = %measurement.cow_id,
            kind = %measurement.kind,
            value = %measurement.value,
            "stored measurement"
        );
        index.insert_measurement(measurement.clone());
        Ok(measurement)
    }

    /// Number of measurements stored for `cow_id`, all kinds.
    pub fn measurement_count(&self, cow_id: &CowId) -> usize {
        self.read()
            .measurements
            .get(cow_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Measurements of `cow_id` produced by any of `sensor_ids`, all kinds,
    /// in chronological order.
    pub fn measurements_from(
        &self,
        cow_id: &CowId,
        sensor_ids: &HashSet<String>,
    ) -> Vec<Measurement> {
        self.read()
            .measurements
            .get(cow_id)
            .map(|series| {
                series
                    .iter()
                    .filter(|m| sensor_ids.contains(&m.sensor_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn stats(&self) -> StoreStats {
        let index = self.read();
        StoreStats {
            cows: index.cows.len(),
            sensors: index.sensors.len(),
            readings: index.readings.len(),
            measurements: index.measurements.values().map(Vec::len).sum(),
        }
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn persist<T: serde::Serialize>(&self, file: &str, record: &T) -> Result<()> {
        match &self.root {
            Some(root) => append_record(&root.join(file), record),
            None => Ok(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreIndex> {
        self.index.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreIndex> {
        self.index.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MeasurementStore for FarmStore {
    fn get_cow(&self, id: &CowId) -> Result<Cow> {
        self.read()
            .cow(id)
            .cloned()
            .ok_or_else(|| FarmError::cow_not_found(id))
    }

    fn list_measurements(
        &self,
        cow_id: &CowId,
        kind: MeasurementKind,
        range: Option<TimeRange>,
    ) -> Result<Vec<Measurement>> {
        let index = self.read();
        let Some(series) = index.measurements.get(cow_id) else {
            return Ok(Vec::new());
        };
        Ok(series
            .iter()
            .filter(|m| m.kind == kind)
            .filter(|m| range.map_or(true, |r| r.contains(m.measured_at)))
            .cloned()
            .collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    const BESSIE: &str = "6f1c2a9e-3b7d-4c1a-9e4f-2d8b7a6c5e01";
    const DAISY: &str = "0d3e5b7a-1c2f-4e6a-8b9d-7f5e3c1a2b04";

    fn bessie() -> CowId {
        BESSIE.parse().unwrap()
    }

    fn new_cow(name: &str) -> NewCow {
        NewCow {
            name: name.to_string(),
            birthdate: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        }
    }

    fn milk(cow: CowId, hour: u32, value: rust_decimal::Decimal) -> NewMeasurement {
        NewMeasurement {
            cow_id: cow,
            sensor_id: "s-milk".to_string(),
            kind: MeasurementKind::Milk,
            measured_at: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            value,
        }
    }

    // ── cows ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_create_and_get_cow() {
        let store = FarmStore::in_memory();
        let cow = store.create_cow(bessie(), new_cow("Bessie")).unwrap();
        assert_eq!(store.get_cow(&bessie()).unwrap(), cow);
    }

    #[test]
    fn test_create_duplicate_cow_is_rejected() {
        let store = FarmStore::in_memory();
        store.create_cow(bessie(), new_cow("Bessie")).unwrap();
        let err = store.create_cow(bessie(), new_cow("Again")).unwrap_err();
        assert!(matches!(err, FarmError::AlreadyExists(_)));
    }

    #[test]
    fn test_get_unknown_cow_is_not_found() {
        let store = FarmStore::in_memory();
        let err = store.get_cow(&bessie()).unwrap_err();
        assert!(matches!(err, FarmError::NotFound { .. }));
    }

    #[test]
    fn test_list_cows_in_registration_order() {
        let store = FarmStore::in_memory();
        store.create_cow(DAISY.parse().unwrap(), new_cow("Daisy")).unwrap();
        store.create_cow(bessie(), new_cow("Bessie")).unwrap();
        let names: Vec<String> = store.list_cows().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Daisy", "Bessie"]);
    }

    // ── measurements ──────────────────────────────────────────────────────────

    #[test]
    fn test_append_requires_known_cow() {
        let store = FarmStore::in_memory();
        let err = store.append_measurement(milk(bessie(), 6, dec!(10))).unwrap_err();
        assert!(matches!(err, FarmError::NotFound { .. }));
    }

    #[test]
    fn test_list_measurements_ordered_with_sequence_ties() {
        let store = FarmStore::in_memory();
        store.create_cow(bessie(), new_cow("Bessie")).unwrap();
        store.append_measurement(milk(bessie(), 18, dec!(3))).unwrap();
        store.append_measurement(milk(bessie(), 6, dec!(1))).unwrap();
        store.append_measurement(milk(bessie(), 6, dec!(2))).unwrap();

        let listed = store
            .list_measurements(&bessie(), MeasurementKind::Milk, None)
            .unwrap();
        let values: Vec<_> = listed.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![dec!(1), dec!(2), dec!(3)]);
        assert!(listed[0].sequence < listed[1].sequence);
    }

    #[test]
    fn test_list_measurements_filters_kind_and_range() {
        let store = FarmStore::in_memory();
        store.create_cow(bessie(), new_cow("Bessie")).unwrap();
        store.append_measurement(milk(bessie(), 6, dec!(1))).unwrap();
        store.append_measurement(milk(bessie(), 12, dec!(2))).unwrap();
        store
            .append_measurement(NewMeasurement {
                kind: MeasurementKind::Weight,
                ..milk(bessie(), 7, dec!(400))
            })
            .unwrap();

        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        );
        let listed = store
            .list_measurements(&bessie(), MeasurementKind::Milk, Some(range))
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].value, dec!(1));
    }

    #[test]
    fn test_list_measurements_unknown_cow_is_empty() {
        let store = FarmStore::in_memory();
        let listed = store
            .list_measurements(&bessie(), MeasurementKind::Milk, None)
            .unwrap();
        assert!(listed.is_empty());
    }

    #[test]
    fn test_measurements_from_filters_sensors() {
        let store = FarmStore::in_memory();
        store.create_cow(bessie(), new_cow("Bessie")).unwrap();
        store.append_measurement(milk(bessie(), 9, dec!(4))).unwrap();
        store
            .append_measurement(NewMeasurement {
                sensor_id: "manual".to_string(),
                ..milk(bessie(), 7, dec!(99))
            })
            .unwrap();
        store.append_measurement(milk(bessie(), 6, dec!(1))).unwrap();

        let sensors = HashSet::from(["s-milk".to_string()]);
        let values: Vec<_> = store
            .measurements_from(&bessie(), &sensors)
            .iter()
            .map(|m| m.value)
            .collect();
        assert_eq!(values, vec![dec!(1), dec!(4)]);
        assert_eq!(store.measurement_count(&bessie()), 3);
        assert!(store.measurements_from(&bessie(), &HashSet::new()).is_empty());
    }

    // ── persistence ───────────────────────────────────────────────────────────

    #[test]
    fn test_open_reloads_everything_written() {
        let tmp = TempDir::new().unwrap();
        {
            let store = FarmStore::open(tmp.path()).unwrap();
            store.create_cow(bessie(), new_cow("Bessie")).unwrap();
            store
                .register_sensor(Sensor { id: "s-milk".into(), unit: "L".into() })
                .unwrap();
            store
                .record_reading(Reading {
                    cow_id: bessie(),
                    sensor_id: "s-milk".into(),
                    value: None,
                })
                .unwrap();
            store.append_measurement(milk(bessie(), 6, dec!(10.5))).unwrap();
            store.append_measurement(milk(bessie(), 6, dec!(9.5))).unwrap();
        }

        let reopened = FarmStore::open(tmp.path()).unwrap();
        assert_eq!(
            reopened.stats(),
            StoreStats { cows: 1, sensors: 1, readings: 1, measurements: 2 }
        );
        assert_eq!(reopened.sensor("s-milk").unwrap().unit, "L");
        assert_eq!(reopened.readings()[0].value, None);

        let listed = reopened
            .list_measurements(&bessie(), MeasurementKind::Milk, None)
            .unwrap();
        let values: Vec<_> = listed.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![dec!(10.5), dec!(9.5)]);

        // New appends continue the sequence after the reloaded ones.
        let next = reopened.append_measurement(milk(bessie(), 7, dec!(1))).unwrap();
        assert_eq!(next.sequence, 2);
    }

    #[test]
    fn test_in_memory_store_has_no_root() {
        assert!(FarmStore::in_memory().root().is_none());
    }
}
