//! ==============================================================================
//! simulation.rs - simulated sensor telemetry
//! ==============================================================================
//!
//! purpose:
//!     produces fake live readings so the dashboard fluctuates without any
//!     hardware attached. there is no real telemetry path behind this.
//!
//! value ranges per sensor kind:
//!     - gas:         uniform in [0, 100)
//!     - temperature: uniform in [20, 80)
//!     - magnetic:    0 or 1 (rounded uniform in [0, 1))
//!
//! relationships:
//!     - used by: store.rs (tick task)
//!     - mirrors: the mock/real split of a hardware provider, with the random
//!       source as the "mock" and scripted values for tests
//!
//! ==============================================================================

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::domain::{Sensor, SensorKind};

/// where new sensor values come from
pub trait ReadingSource: Send + Sync {
    fn sample(&self, kind: SensorKind) -> f64;
}

/// uniform random readings, one thread-local rng per call
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomReadings;

impl ReadingSource for RandomReadings {
    fn sample(&self, kind: SensorKind) -> f64 {
        let mut rng = rand::rng();
        match kind {
            SensorKind::Gas => rng.random_range(0.0..100.0),
            SensorKind::Temperature => rng.random_range(20.0..80.0),
            SensorKind::Magnetic => rng.random::<f64>().round(),
        }
    }
}

/// fixed values per kind. kinds without a script read 0.
#[derive(Debug, Default)]
pub struct ScriptedReadings {
    values: Mutex<HashMap<SensorKind, f64>>,
}

impl ScriptedReadings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, kind: SensorKind, value: f64) -> Self {
        self.set(kind, value);
        self
    }

    pub fn set(&self, kind: SensorKind, value: f64) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(kind, value);
        }
    }
}

impl ReadingSource for ScriptedReadings {
    fn sample(&self, kind: SensorKind) -> f64 {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(&kind).copied())
            .unwrap_or(0.0)
    }
}

/// one simulation step: every sensor gets a new value, status and timestamp.
/// ids, names, units and thresholds carry over untouched.
pub fn tick(sensors: &[Sensor], source: &dyn ReadingSource, now: DateTime<Utc>) -> Vec<Sensor> {
    sensors
        .iter()
        .map(|sensor| sensor.with_reading(source.sample(sensor.kind), now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::domain::SensorStatus;
    use proptest::prelude::*;

    #[test]
    fn tick_recomputes_status_against_existing_threshold() {
        let now = Utc::now();
        let sensors = Catalog::sample(now).sensors;
        let source = ScriptedReadings::new()
            .with(SensorKind::Gas, 60.0)
            .with(SensorKind::Temperature, 70.0)
            .with(SensorKind::Magnetic, 0.0);

        let later = now + chrono::Duration::seconds(5);
        let next = tick(&sensors, &source, later);

        assert_eq!(next.len(), sensors.len());
        // gas threshold 50
        assert_eq!(next[0].current_value, Some(60.0));
        assert_eq!(next[0].status, SensorStatus::Danger);
        // temperature threshold 80, 70 > 64
        assert_eq!(next[1].status, SensorStatus::Warning);
        assert_eq!(next[2].status, SensorStatus::Normal);
        assert!(next.iter().all(|s| s.last_reading == Some(later)));

        for (before, after) in sensors.iter().zip(&next) {
            assert_eq!(before.id, after.id);
            assert_eq!(before.threshold, after.threshold);
            assert_eq!(before.name, after.name);
            assert_eq!(before.device_id, after.device_id);
        }
    }

    #[test]
    fn tick_of_nothing_is_nothing() {
        assert!(tick(&[], &RandomReadings, Utc::now()).is_empty());
    }

    proptest! {
        #[test]
        fn random_values_stay_in_range(_round in 0u8..50) {
            let gas = RandomReadings.sample(SensorKind::Gas);
            prop_assert!((0.0..100.0).contains(&gas));
            let temp = RandomReadings.sample(SensorKind::Temperature);
            prop_assert!((20.0..80.0).contains(&temp));
            let door = RandomReadings.sample(SensorKind::Magnetic);
            prop_assert!(door == 0.0 || door == 1.0);
        }
    }
}
