//! ==============================================================================
//! catalog.rs - backing collections and session resolution
//! ==============================================================================
//!
//! purpose:
//!     holds the in-memory device / sensor / alert collections the dashboard
//!     runs on, and resolves them down to what one user's session may see.
//!
//! resolution chain:
//!
//! ```text
//! user ──(device.user_id)──▶ device ──(sensor.device_id)──▶ sensors
//!                                                              │
//!                          alerts ◀──(alert.sensor_id ∈ ids)───┘
//! ```
//!
//! relationships:
//!     - used by: store.rs (SessionStore::set_user), auth.rs (sample users)
//!
//! ==============================================================================

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;

use crate::domain::{
    Alert, AlertStatus, Device, DeviceStatus, Sensor, SensorId, SensorKind, SensorStatus,
    Severity, User,
};

/// everything one session can see. replaced wholesale on every user change.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub device: Option<Device>,
    pub sensors: Vec<Sensor>,
    /// shared entries: a status update swaps only the matching `Arc`
    pub alerts: Vec<Arc<Alert>>,
    /// bumped on every resolve; ticks from an older session are discarded
    #[serde(skip)]
    pub epoch: u64,
}

impl Snapshot {
    pub fn sensor(&self, id: SensorId) -> Option<&Sensor> {
        self.sensors.iter().find(|s| s.id == id)
    }

    /// owning sensor of an alert, if it belongs to this session
    pub fn sensor_for(&self, alert: &Alert) -> Option<&Sensor> {
        alert.sensor_id.and_then(|id| self.sensor(id))
    }
}

/// in-memory stand-in for the device registry
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub devices: Vec<Device>,
    pub sensors: Vec<Sensor>,
    pub alerts: Vec<Alert>,
}

impl Catalog {
    /// resolve a user to their device, its sensors, and the alerts on them.
    ///
    /// no user and no device are both empty states, not errors.
    pub fn resolve(&self, user: Option<&User>) -> Snapshot {
        let Some(user) = user else {
            return Snapshot::default();
        };
        let Some(device) = self.devices.iter().find(|d| d.user_id == user.id) else {
            return Snapshot::default();
        };

        let sensors: Vec<Sensor> = self
            .sensors
            .iter()
            .filter(|s| s.device_id == device.id)
            .cloned()
            .collect();

        let ids: HashSet<SensorId> = sensors.iter().map(|s| s.id).collect();
        let alerts = self
            .alerts
            .iter()
            .filter(|a| a.sensor_id.is_some_and(|id| ids.contains(&id)))
            .cloned()
            .map(Arc::new)
            .collect();

        Snapshot {
            device: Some(device.clone()),
            sensors,
            alerts,
            epoch: 0,
        }
    }

    /// the demo data set: two kitchens, five sensors, three alerts on kitchen 1
    pub fn sample(now: DateTime<Utc>) -> Self {
        let day = |y: i32, m: u32, d: u32| Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).single().unwrap_or(now);

        let devices = vec![
            Device {
                id: 1,
                name: "Mi Cocina".into(),
                user_id: 1,
                api_key: "api_key_123".into(),
                created_at: day(2024, 1, 15),
                status: DeviceStatus::Online,
            },
            Device {
                id: 2,
                name: "Mi Cocina".into(),
                user_id: 2,
                api_key: "api_key_456".into(),
                created_at: day(2024, 1, 20),
                status: DeviceStatus::Warning,
            },
        ];

        let sensor = |id, device_id, kind, name: &str, unit: &str, threshold, value, status| Sensor {
            id,
            device_id,
            kind,
            name: name.into(),
            unit: unit.into(),
            threshold,
            current_value: Some(value),
            status,
            last_reading: Some(now),
        };
        let sensors = vec![
            sensor(1, 1, SensorKind::Gas, "Sensor de Gas Estufa", "ppm", 50.0, 25.0, SensorStatus::Normal),
            sensor(2, 1, SensorKind::Temperature, "Sensor Temperatura", "°C", 80.0, 45.0, SensorStatus::Normal),
            sensor(3, 1, SensorKind::Magnetic, "Sensor Puerta Horno", "estado", 1.0, 0.0, SensorStatus::Normal),
            sensor(4, 2, SensorKind::Gas, "Detector Gas Principal", "ppm", 50.0, 35.0, SensorStatus::Normal),
            sensor(5, 2, SensorKind::Temperature, "Sensor Temperatura Horno", "°C", 80.0, 65.0, SensorStatus::Warning),
        ];

        let alerts = vec![
            Alert {
                id: 1,
                reading_id: 123,
                kind: "Fuga de Gas".into(),
                status: AlertStatus::Resolved,
                message: "Nivel de gas por encima del límite seguro".into(),
                notified_at: Some(now - Duration::days(1)),
                resolved_at: Some(now - Duration::hours(1)),
                sensor_id: Some(1),
                severity: Severity::High,
            },
            Alert {
                id: 2,
                reading_id: 124,
                kind: "Temperatura Alta".into(),
                status: AlertStatus::Active,
                message: "Temperatura excesiva detectada en el horno".into(),
                notified_at: Some(now),
                resolved_at: None,
                sensor_id: Some(2),
                severity: Severity::Medium,
            },
            Alert {
                id: 3,
                reading_id: 125,
                kind: "Puerta Abierta".into(),
                status: AlertStatus::FalseAlarm,
                message: "Horno abierto por tiempo prolongado".into(),
                notified_at: Some(now - Duration::days(2)),
                resolved_at: Some(now - Duration::milliseconds(172_000_000)),
                sensor_id: Some(3),
                severity: Severity::Low,
            },
        ];

        Self {
            devices,
            sensors,
            alerts,
        }
    }

    /// users matching the sample devices
    pub fn sample_users(now: DateTime<Utc>) -> Vec<User> {
        vec![
            User {
                id: 1,
                name: "Usuario Demo".into(),
                email: "demo@cocina.app".into(),
                phone_number: Some("+34 600 000 001".into()),
                created_at: now - Duration::days(30),
            },
            User {
                id: 2,
                name: "Usuario Invitado".into(),
                email: "invitado@cocina.app".into(),
                phone_number: None,
                created_at: now - Duration::days(10),
            },
        ]
    }
}
