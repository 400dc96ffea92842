//! ==============================================================================
//! domain.rs - kitchen monitoring data model
//! ==============================================================================
//!
//! purpose:
//!     shared types for users, devices, sensors and alerts.
//!     no i/o, no scheduling - only data and the sensor status rule.
//!
//! relationships:
//!     - used by: catalog.rs (mock collections), simulation.rs (tick),
//!       store.rs (snapshots), views.rs (view models), server.rs (json)
//!
//! wire names:
//!     enums serialize in snake_case english. the spanish labels of the
//!     kitchen demo data ("activa", "temperatura", ...) are accepted as
//!     aliases when deserializing.
//!
//! ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = u32;
pub type DeviceId = u32;
pub type SensorId = u32;
pub type AlertId = u32;

/// fraction of the threshold above which a sensor is in warning
pub const WARNING_RATIO: f64 = 0.8;

// ==============================================================================
// identities
// ==============================================================================

/// authenticated user, supplied by the auth collaborator (read-only here)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Online,
    Offline,
    Warning,
}

/// a monitored kitchen unit owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub user_id: UserId,
    pub api_key: String,
    pub created_at: DateTime<Utc>,
    pub status: DeviceStatus,
}

// ==============================================================================
// sensors
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Gas,
    #[serde(alias = "temperatura")]
    Temperature,
    #[serde(alias = "magnetico")]
    Magnetic,
}

/// ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorStatus {
    Normal,
    Warning,
    Danger,
}

impl SensorStatus {
    /// danger above the threshold, warning above 80% of it, normal otherwise
    pub fn classify(value: f64, threshold: f64) -> Self {
        if value > threshold {
            SensorStatus::Danger
        } else if value > threshold * WARNING_RATIO {
            SensorStatus::Warning
        } else {
            SensorStatus::Normal
        }
    }
}

/// a single measurement channel attached to one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: SensorId,
    pub device_id: DeviceId,
    #[serde(rename = "type")]
    pub kind: SensorKind,
    pub name: String,
    pub unit: String,
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    pub status: SensorStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reading: Option<DateTime<Utc>>,
}

impl Sensor {
    /// apply a new reading: value, derived status and timestamp change together
    pub fn with_reading(&self, value: f64, at: DateTime<Utc>) -> Self {
        Self {
            current_value: Some(value),
            status: SensorStatus::classify(value, self.threshold),
            last_reading: Some(at),
            ..self.clone()
        }
    }
}

/// a stored raw reading. modeled for completeness; nothing populates it yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: u64,
    pub sensor_id: SensorId,
    pub value: f64,
    pub created_at: DateTime<Utc>,
}

// ==============================================================================
// alerts
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    #[serde(alias = "activa")]
    Active,
    #[serde(alias = "resuelta")]
    Resolved,
    #[serde(alias = "falsa_alarma")]
    FalseAlarm,
}

impl AlertStatus {
    pub const ALL: [AlertStatus; 3] = [
        AlertStatus::Active,
        AlertStatus::Resolved,
        AlertStatus::FalseAlarm,
    ];

    /// operator-triggered transitions offered by the alert panel.
    ///
    /// active alerts can be closed either way, closed alerts can only be
    /// reactivated.
    pub fn can_transition_to(self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (AlertStatus::Active, AlertStatus::Resolved)
                | (AlertStatus::Active, AlertStatus::FalseAlarm)
                | (AlertStatus::Resolved, AlertStatus::Active)
                | (AlertStatus::FalseAlarm, AlertStatus::Active)
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Resolved => "resolved",
            AlertStatus::FalseAlarm => "false_alarm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// a notable event tied to a sensor, with its own operator-driven lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub reading_id: u64,
    /// human label, e.g. "Fuga de Gas"
    #[serde(rename = "type")]
    pub kind: String,
    pub status: AlertStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// owning sensor (foreign key; resolved against the session's sensors)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_id: Option<SensorId>,
    pub severity: Severity,
}

impl Alert {
    /// copy with a new status; closing stamps `resolved_at`, reactivating clears it
    pub fn with_status(&self, status: AlertStatus, now: DateTime<Utc>) -> Self {
        Self {
            status,
            resolved_at: match status {
                AlertStatus::Active => None,
                AlertStatus::Resolved | AlertStatus::FalseAlarm => Some(now),
            },
            ..self.clone()
        }
    }
}
