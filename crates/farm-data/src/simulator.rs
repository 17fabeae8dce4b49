//! Replay of recorded sensor readings.
//!
//! Each cow has a cyclic cursor over its recorded readings. Every call to
//! [`MeasurementSimulator::next_measurement`] turns the reading under the
//! cursor into a measurement stamped with the supplied instant and advances
//! the cursor, wrapping back to the first reading after the last one.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use farm_core::error::{FarmError, Result};
use farm_core::models::{CowId, MeasurementKind, NewMeasurement, Reading, Sensor};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::store::FarmStore;

#[derive(Debug, Clone)]
struct ReplayReading {
    sensor_id: String,
    kind: MeasurementKind,
    value: Option<Decimal>,
}

/// Cycles through recorded readings per cow, filling gaps.
#[derive(Debug, Default)]
pub struct MeasurementSimulator {
    series: HashMap<CowId, Vec<ReplayReading>>,
    /// Cows in the order their first reading was recorded.
    order: Vec<CowId>,
    cursors: HashMap<CowId, usize>,
    last_values: HashMap<(CowId, MeasurementKind), Decimal>,
}

impl MeasurementSimulator {
    /// Build a simulator from recorded readings and the sensors that made them.
    ///
    /// Readings from unknown sensors, or sensors whose unit maps to no
    /// measurement kind, are dropped with a warning.
    pub fn new(readings: &[Reading], sensors: &[Sensor]) -> Self {
        let kinds: HashMap<&str, Option<MeasurementKind>> = sensors
            .iter()
            .map(|s| (s.id.as_str(), s.kind()))
            .collect();

        let mut sim = Self::default();
        let mut dropped = 0usize;

        for reading in readings {
            let kind = match kinds.get(reading.sensor_id.as_str()) {
                Some(Some(kind)) => *kind,
                Some(None) | None => {
                    dropped += 1;
                    continue;
                }
            };
            if !sim.series.contains_key(&reading.cow_id) {
                sim.order.push(reading.cow_id);
            }
            sim.series
                .entry(reading.cow_id)
                .or_default()
                .push(ReplayReading {
                    sensor_id: reading.sensor_id.clone(),
                    kind,
                    value: reading.value,
                });
        }

        if dropped > 0 {
            warn!(
                "Dropped {} readings with unknown sensors or units",
                dropped
            );
        }
        debug!(
            "Simulator ready: {} cows, {} readings",
            sim.order.len(),
            readings.len() - dropped
        );
        sim
    }

    /// Build a simulator over the readings and sensors held by `store`,
    /// resuming each cow where its replayed measurements left off.
    ///
    /// Only stored measurements from the cow's replay sensors count: the
    /// cursor is their number, and gap filling starts from their latest value
    /// of each kind. Manually added measurements leave both untouched.
    pub fn from_store(store: &FarmStore) -> Self {
        let mut sim = Self::new(&store.readings(), &store.sensors());
        for cow_id in sim.cow_ids() {
            let replayed = store.measurements_from(&cow_id, &sim.replay_sensors(&cow_id));
            if replayed.is_empty() {
                continue;
            }
            let last_values: HashMap<MeasurementKind, Decimal> =
                replayed.iter().map(|m| (m.kind, m.value)).collect();
            sim.resume(&cow_id, replayed.len(), last_values);
        }
        sim
    }

    /// Sensors whose readings make up the replay series of `cow_id`.
    fn replay_sensors(&self, cow_id: &CowId) -> HashSet<String> {
        self.series
            .get(cow_id)
            .map(|series| series.iter().map(|r| r.sensor_id.clone()).collect())
            .unwrap_or_default()
    }

    /// Cows that have at least one replayable reading.
    pub fn cow_ids(&self) -> Vec<CowId> {
        self.order.clone()
    }

    /// Number of replayable readings for `cow_id`.
    pub fn reading_count(&self, cow_id: &CowId) -> usize {
        self.series.get(cow_id).map(Vec::len).unwrap_or(0)
    }

    /// Current cursor position for `cow_id`.
    pub fn cursor(&self, cow_id: &CowId) -> usize {
        self.cursors.get(cow_id).copied().unwrap_or(0)
    }

    /// Produce the next measurement for `cow_id`, stamped with `now`.
    ///
    /// A reading without a value takes the last value of the same kind this
    /// simulator produced for the cow, or zero when there is none yet.
    pub fn next_measurement(
        &mut self,
        cow_id: &CowId,
        now: DateTime<Utc>,
    ) -> Result<NewMeasurement> {
        let series = self.series.get(cow_id).ok_or_else(|| FarmError::NotFound {
            entity: "Measurements for cow",
            id: cow_id.to_string(),
        })?;

        let cursor = self.cursors.entry(*cow_id).or_insert(0);
        let reading = &series[*cursor % series.len()];
        *cursor = (*cursor + 1) % series.len();

        let key = (*cow_id, reading.kind);
        let value = match reading.value {
            Some(v) => v,
            None => {
                let filled = self.last_values.get(&key).copied().unwrap_or(Decimal::ZERO);
                debug!(cow = %cow_id, kind = %reading.kind, "filled missing value with {}", filled);
                filled
            }
        };
        self.last_values.insert(key, value);

        Ok(NewMeasurement {
            cow_id: *cow_id,
            sensor_id: reading.sensor_id.clone(),
            kind: reading.kind,
            measured_at: now,
            value,
        })
    }

    /// Rewind `cow_id` to its first reading. Gap-fill memory is kept.
    pub fn reset(&mut self, cow_id: &CowId) {
        self.cursors.remove(cow_id);
    }

    /// Restore a cursor and the gap-fill memory from a previous run.
    ///
    /// `cursor` is taken modulo the cow's reading count.
    pub fn resume(
        &mut self,
        cow_id: &CowId,
        cursor: usize,
        last_values: HashMap<MeasurementKind, Decimal>,
    ) {
        let len = self.reading_count(cow_id);
        if len == 0 {
            return;
        }
        self.cursors.insert(*cow_id, cursor % len);
        for (kind, value) in last_values {
            self.last_values.insert((*cow_id, kind), value);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    const BESSIE: &str = "6f1c2a9e-3b7d-4c1a-9e4f-2d8b7a6c5e01";
    const DAISY: &str = "0d3e5b7a-1c2f-4e6a-8b9d-7f5e3c1a2b04";

    fn bessie() -> CowId {
        BESSIE.parse().unwrap()
    }

    fn daisy() -> CowId {
        DAISY.parse().unwrap()
    }

    fn reading(cow: CowId, sensor: &str, value: Option<Decimal>) -> Reading {
        Reading {
            cow_id: cow,
            sensor_id: sensor.to_string(),
            value,
        }
    }

    fn sensors() -> Vec<Sensor> {
        vec![
            Sensor { id: "sensor-1".into(), unit: "L".into() },
            Sensor { id: "sensor-2".into(), unit: "L".into() },
            Sensor { id: "sensor-3".into(), unit: "Kg".into() },
            Sensor { id: "thermo".into(), unit: "C".into() },
        ]
    }

    /// Bessie: 10.5 L, missing L, 600.8 kg. Daisy: missing L, 15.2 L.
    fn fixture() -> MeasurementSimulator {
        let readings = vec![
            reading(bessie(), "sensor-1", Some(dec!(10.5))),
            reading(daisy(), "sensor-2", None),
            reading(bessie(), "sensor-1", None),
            reading(daisy(), "sensor-2", Some(dec!(15.2))),
            reading(bessie(), "sensor-3", Some(dec!(600.8))),
        ];
        MeasurementSimulator::new(&readings, &sensors())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap()
    }

    // ── next_measurement ─────────────────────────────────────────────────────

    #[test]
    fn test_consecutive_measurements() {
        let mut sim = fixture();
        let m1 = sim.next_measurement(&bessie(), now()).unwrap();
        let m2 = sim.next_measurement(&bessie(), now()).unwrap();
        let m3 = sim.next_measurement(&bessie(), now()).unwrap();

        assert_eq!((m1.kind, m1.value), (MeasurementKind::Milk, dec!(10.5)));
        assert_eq!((m2.kind, m2.value), (MeasurementKind::Milk, dec!(10.5)));
        assert_eq!((m3.kind, m3.value), (MeasurementKind::Weight, dec!(600.8)));
        assert_eq!(sim.cursor(&bessie()), 0);
    }

    #[test]
    fn test_cycles_and_restamps() {
        let mut sim = fixture();
        let first = sim.next_measurement(&bessie(), now()).unwrap();
        sim.next_measurement(&bessie(), now()).unwrap();
        sim.next_measurement(&bessie(), now()).unwrap();

        let later = now() + Duration::minutes(5);
        let fourth = sim.next_measurement(&bessie(), later).unwrap();
        assert_eq!(fourth.value, first.value);
        assert_eq!(fourth.measured_at, later);
        assert_eq!(sim.cursor(&bessie()), 1);
    }

    #[test]
    fn test_many_cycles_repeat_pattern() {
        let mut sim = fixture();
        let pattern = [dec!(10.5), dec!(10.5), dec!(600.8)];
        for i in 0..100 {
            let m = sim.next_measurement(&bessie(), now()).unwrap();
            assert_eq!(m.value, pattern[i % 3]);
        }
        assert_eq!(sim.cursor(&bessie()), 1);
    }

    #[test]
    fn test_cows_have_independent_cursors() {
        let mut sim = fixture();
        sim.next_measurement(&bessie(), now()).unwrap();
        sim.next_measurement(&daisy(), now()).unwrap();
        sim.next_measurement(&bessie(), now()).unwrap();
        assert_eq!(sim.cursor(&bessie()), 2);
        assert_eq!(sim.cursor(&daisy()), 1);
    }

    #[test]
    fn test_leading_missing_value_is_zero() {
        let mut sim = fixture();
        let m1 = sim.next_measurement(&daisy(), now()).unwrap();
        let m2 = sim.next_measurement(&daisy(), now()).unwrap();
        assert_eq!(m1.value, Decimal::ZERO);
        assert_eq!(m2.value, dec!(15.2));
    }

    #[test]
    fn test_missing_value_after_wrap_uses_last_value() {
        let mut sim = fixture();
        sim.next_measurement(&daisy(), now()).unwrap();
        sim.next_measurement(&daisy(), now()).unwrap();
        let wrapped = sim.next_measurement(&daisy(), now()).unwrap();
        assert_eq!(wrapped.value, dec!(15.2));
    }

    #[test]
    fn test_missing_value_ignores_other_kinds() {
        let readings = vec![
            reading(bessie(), "sensor-3", Some(dec!(600))),
            reading(bessie(), "sensor-1", None),
        ];
        let mut sim = MeasurementSimulator::new(&readings, &sensors());
        sim.next_measurement(&bessie(), now()).unwrap();
        let milk = sim.next_measurement(&bessie(), now()).unwrap();
        assert_eq!(milk.value, Decimal::ZERO);
    }

    #[test]
    fn test_unknown_cow_is_not_found() {
        let mut sim = fixture();
        let unknown = CowId::random();
        let err = sim.next_measurement(&unknown, now()).unwrap_err();
        assert!(matches!(err, FarmError::NotFound { .. }));
    }

    // ── construction ─────────────────────────────────────────────────────────

    #[test]
    fn test_unresolvable_sensors_are_dropped() {
        let readings = vec![
            reading(bessie(), "thermo", Some(dec!(38.5))),
            reading(bessie(), "missing-sensor", Some(dec!(1))),
            reading(daisy(), "sensor-1", Some(dec!(2))),
        ];
        let sim = MeasurementSimulator::new(&readings, &sensors());
        assert_eq!(sim.cow_ids(), vec![daisy()]);
        assert_eq!(sim.reading_count(&bessie()), 0);
    }

    #[test]
    fn test_cow_ids_in_first_seen_order() {
        assert_eq!(fixture().cow_ids(), vec![bessie(), daisy()]);
    }

    // ── reset / resume ───────────────────────────────────────────────────────

    #[test]
    fn test_reset_rewinds_cursor() {
        let mut sim = fixture();
        sim.next_measurement(&bessie(), now()).unwrap();
        sim.next_measurement(&bessie(), now()).unwrap();
        sim.reset(&bessie());
        let m = sim.next_measurement(&bessie(), now()).unwrap();
        assert_eq!(m.value, dec!(10.5));
    }

    #[test]
    fn test_resume_restores_cursor_and_fill_memory() {
        let mut sim = fixture();
        let last = HashMap::from([(MeasurementKind::Milk, dec!(7.25))]);
        // 4 % 3 == 1: the missing milk reading.
        sim.resume(&bessie(), 4, last);
        let m = sim.next_measurement(&bessie(), now()).unwrap();
        assert_eq!(m.value, dec!(7.25));
        assert_eq!(sim.cursor(&bessie()), 2);
    }

    #[test]
    fn test_from_store_continues_after_stored_measurements() {
        let store = FarmStore::in_memory();
        for sensor in sensors() {
            store.register_sensor(sensor).unwrap();
        }
        store
            .create_cow(
                bessie(),
                farm_core::models::NewCow {
                    name: "Bessie".into(),
                    birthdate: chrono::NaiveDate::from_ymd_opt(2020, 1, 15).unwrap(),
                },
            )
            .unwrap();
        store.record_reading(reading(bessie(), "sensor-1", Some(dec!(10.5)))).unwrap();
        store.record_reading(reading(bessie(), "sensor-1", None)).unwrap();

        let mut first_run = MeasurementSimulator::from_store(&store);
        let m = first_run.next_measurement(&bessie(), now()).unwrap();
        store.append_measurement(m).unwrap();

        let mut second_run = MeasurementSimulator::from_store(&store);
        assert_eq!(second_run.cursor(&bessie()), 1);
        let filled = second_run.next_measurement(&bessie(), now()).unwrap();
        assert_eq!(filled.value, dec!(10.5));
    }

    fn store_with_bessie() -> FarmStore {
        let store = FarmStore::in_memory();
        for sensor in sensors() {
            store.register_sensor(sensor).unwrap();
        }
        store
            .create_cow(
                bessie(),
                farm_core::models::NewCow {
                    name: "Bessie".into(),
                    birthdate: chrono::NaiveDate::from_ymd_opt(2020, 1, 15).unwrap(),
                },
            )
            .unwrap();
        store
    }

    fn manual(kind: MeasurementKind, value: Decimal) -> NewMeasurement {
        NewMeasurement {
            cow_id: bessie(),
            sensor_id: "manual".into(),
            kind,
            measured_at: now(),
            value,
        }
    }

    #[test]
    fn test_from_store_ignores_manual_measurements() {
        let store = store_with_bessie();
        for value in [dec!(1), dec!(2), dec!(3)] {
            store.record_reading(reading(bessie(), "sensor-1", Some(value))).unwrap();
        }
        store.append_measurement(manual(MeasurementKind::Weight, dec!(512))).unwrap();

        let mut sim = MeasurementSimulator::from_store(&store);
        assert_eq!(sim.cursor(&bessie()), 0);
        assert_eq!(sim.next_measurement(&bessie(), now()).unwrap().value, dec!(1));
    }

    #[test]
    fn test_from_store_mixed_manual_and_replayed() {
        let store = store_with_bessie();
        for value in [dec!(1), dec!(2), dec!(3)] {
            store.record_reading(reading(bessie(), "sensor-1", Some(value))).unwrap();
        }

        let mut replayed = Vec::new();
        for _ in 0..2 {
            let mut sim = MeasurementSimulator::from_store(&store);
            let m = sim.next_measurement(&bessie(), now()).unwrap();
            replayed.push(m.value);
            store.append_measurement(m).unwrap();
            store.append_measurement(manual(MeasurementKind::Milk, dec!(40))).unwrap();
        }

        let mut sim = MeasurementSimulator::from_store(&store);
        replayed.push(sim.next_measurement(&bessie(), now()).unwrap().value);
        assert_eq!(replayed, vec![dec!(1), dec!(2), dec!(3)]);
    }

    #[test]
    fn test_from_store_gap_fill_skips_manual_values() {
        let store = store_with_bessie();
        store.record_reading(reading(bessie(), "sensor-1", None)).unwrap();
        store.record_reading(reading(bessie(), "sensor-1", Some(dec!(2)))).unwrap();
        store.append_measurement(manual(MeasurementKind::Milk, dec!(99))).unwrap();

        let mut sim = MeasurementSimulator::from_store(&store);
        assert_eq!(sim.next_measurement(&bessie(), now()).unwrap().value, Decimal::ZERO);
    }

    #[test]
    fn test_resume_unknown_cow_is_ignored() {
        let mut sim = fixture();
        sim.resume(&CowId::random(), 3, HashMap::new());
        assert_eq!(sim.cow_ids().len(), 2);
    }
}
