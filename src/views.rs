//! ==============================================================================
//! views.rs - view models derived from a session snapshot
//! ==============================================================================
//!
//! purpose:
//!     read-only derivations the dashboard pages render: the overview cards,
//!     the alert panel (filter, search, counts, actions) and the settings form.
//!     nothing here mutates the store.
//!
//! relationships:
//!     - reads: catalog::Snapshot
//!     - used by: server.rs (json + html)
//!
//! ==============================================================================

use serde::{Deserialize, Serialize};

use crate::catalog::Snapshot;
use crate::config::SettingsDefaults;
use crate::domain::{Alert, AlertStatus, Device, Sensor, SensorStatus};
use crate::error::StoreError;

/// how many alerts the overview lists
pub const RECENT_ALERTS: usize = 5;

// ==============================================================================
// alert rows
// ==============================================================================

/// an alert as the panel shows it: with its sensor's name and the actions
/// the operator may take from its current status
#[derive(Debug, Clone, Serialize)]
pub struct AlertView {
    #[serde(flatten)]
    pub alert: Alert,
    pub sensor_name: Option<String>,
    pub actions: Vec<AlertStatus>,
}

impl AlertView {
    pub fn new(alert: &Alert, snap: &Snapshot) -> Self {
        Self {
            alert: alert.clone(),
            sensor_name: snap.sensor_for(alert).map(|s| s.name.clone()),
            actions: AlertStatus::ALL
                .into_iter()
                .filter(|next| alert.status.can_transition_to(*next))
                .collect(),
        }
    }
}

// ==============================================================================
// overview
// ==============================================================================

/// worst status across all sensors; normal when there are none
pub fn overall_status(sensors: &[Sensor]) -> SensorStatus {
    sensors
        .iter()
        .map(|s| s.status)
        .max()
        .unwrap_or(SensorStatus::Normal)
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    /// `None` renders the "no device configured" empty state
    pub device: Option<Device>,
    pub active_alerts: usize,
    pub sensor_count: usize,
    pub overall_status: SensorStatus,
    pub sensors: Vec<Sensor>,
    pub recent_alerts: Vec<AlertView>,
}

impl DashboardSummary {
    pub fn from_snapshot(snap: &Snapshot) -> Self {
        Self {
            device: snap.device.clone(),
            active_alerts: snap
                .alerts
                .iter()
                .filter(|a| a.status == AlertStatus::Active)
                .count(),
            sensor_count: snap.sensors.len(),
            overall_status: overall_status(&snap.sensors),
            sensors: snap.sensors.clone(),
            recent_alerts: snap
                .alerts
                .iter()
                .take(RECENT_ALERTS)
                .map(|a| AlertView::new(a, snap))
                .collect(),
        }
    }
}

// ==============================================================================
// alert panel
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Resolved,
    FalseAlarm,
}

impl StatusFilter {
    pub fn matches(self, status: AlertStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => status == AlertStatus::Active,
            StatusFilter::Resolved => status == AlertStatus::Resolved,
            StatusFilter::FalseAlarm => status == AlertStatus::FalseAlarm,
        }
    }
}

/// query of the alert panel: `?status=active&q=gas`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertFilter {
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default, rename = "q")]
    pub search: String,
}

impl AlertFilter {
    /// status must match, and the search text (case-insensitive) must occur
    /// in the alert type, its message, or its sensor's name
    pub fn accepts(&self, alert: &Alert, snap: &Snapshot) -> bool {
        if !self.status.matches(alert.status) {
            return false;
        }
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        alert.kind.to_lowercase().contains(&needle)
            || alert.message.to_lowercase().contains(&needle)
            || snap
                .sensor_for(alert)
                .is_some_and(|s| s.name.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertCounts {
    pub total: usize,
    pub active: usize,
    pub resolved: usize,
    pub false_alarm: usize,
}

impl AlertCounts {
    pub fn tally(alerts: impl IntoIterator<Item = impl AsRef<Alert>>) -> Self {
        alerts.into_iter().fold(Self::default(), |mut counts, alert| {
            counts.total += 1;
            match alert.as_ref().status {
                AlertStatus::Active => counts.active += 1,
                AlertStatus::Resolved => counts.resolved += 1,
                AlertStatus::FalseAlarm => counts.false_alarm += 1,
            }
            counts
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertPanel {
    /// counts over all session alerts, not just the filtered ones
    pub counts: AlertCounts,
    pub alerts: Vec<AlertView>,
}

impl AlertPanel {
    pub fn build(snap: &Snapshot, filter: &AlertFilter) -> Self {
        Self {
            counts: AlertCounts::tally(&snap.alerts),
            alerts: snap
                .alerts
                .iter()
                .filter(|a| filter.accepts(a, snap))
                .map(|a| AlertView::new(a, snap))
                .collect(),
        }
    }
}

// ==============================================================================
// settings
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationMethod {
    Email,
    Push,
    Sms,
    Call,
}

/// the settings page form. kept in memory for the session only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsForm {
    pub device_name: String,
    pub notification_method: NotificationMethod,
    pub email_enabled: bool,
    pub push_enabled: bool,
    pub sms_enabled: bool,
    pub call_enabled: bool,
    pub repetition_delay_minutes: u32,
    pub max_open_time_minutes: u32,
    pub gas_threshold: f64,
    pub temperature_threshold: f64,
}

impl SettingsForm {
    pub fn initial(device: Option<&Device>, defaults: &SettingsDefaults) -> Self {
        Self {
            device_name: device.map(|d| d.name.clone()).unwrap_or_default(),
            notification_method: NotificationMethod::Email,
            email_enabled: true,
            push_enabled: true,
            sms_enabled: false,
            call_enabled: false,
            repetition_delay_minutes: defaults.repetition_delay_minutes,
            max_open_time_minutes: defaults.max_open_time_minutes,
            gas_threshold: defaults.gas_threshold,
            temperature_threshold: defaults.temperature_threshold,
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.gas_threshold) {
            return Err(StoreError::InvalidSettings(
                "gas_threshold must be a positive number".into(),
            ));
        }
        if !positive(self.temperature_threshold) {
            return Err(StoreError::InvalidSettings(
                "temperature_threshold must be a positive number".into(),
            ));
        }
        if self.repetition_delay_minutes == 0 {
            return Err(StoreError::InvalidSettings(
                "repetition_delay_minutes must be at least 1".into(),
            ));
        }
        if self.max_open_time_minutes == 0 {
            return Err(StoreError::InvalidSettings(
                "max_open_time_minutes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use chrono::Utc;
    use std::sync::Arc;

    fn session() -> Snapshot {
        let user = Catalog::sample_users(Utc::now()).remove(0);
        Catalog::sample(Utc::now()).resolve(Some(&user))
    }

    #[test]
    fn overview_counts_active_alerts_and_worst_status() {
        let mut snap = session();
        snap.sensors[1].status = SensorStatus::Warning;

        let summary = DashboardSummary::from_snapshot(&snap);
        assert_eq!(summary.active_alerts, 1);
        assert_eq!(summary.sensor_count, 3);
        assert_eq!(summary.overall_status, SensorStatus::Warning);
        assert_eq!(summary.recent_alerts.len(), 3);

        snap.sensors[2].status = SensorStatus::Danger;
        assert_eq!(overall_status(&snap.sensors), SensorStatus::Danger);
    }

    #[test]
    fn empty_session_has_no_device_and_normal_status() {
        let summary = DashboardSummary::from_snapshot(&Snapshot::default());
        assert!(summary.device.is_none());
        assert_eq!(summary.overall_status, SensorStatus::Normal);
        assert!(summary.recent_alerts.is_empty());
    }

    #[test]
    fn recent_alerts_are_capped() {
        let mut snap = session();
        let template = (*snap.alerts[0]).clone();
        for id in 10..20 {
            snap.alerts.push(Arc::new(Alert { id, ..template.clone() }));
        }
        let summary = DashboardSummary::from_snapshot(&snap);
        assert_eq!(summary.recent_alerts.len(), RECENT_ALERTS);
        assert_eq!(summary.recent_alerts[0].alert.id, 1);
    }

    #[test]
    fn filter_by_status() {
        let snap = session();
        let filter = AlertFilter {
            status: StatusFilter::FalseAlarm,
            search: String::new(),
        };
        let panel = AlertPanel::build(&snap, &filter);
        let ids: Vec<_> = panel.alerts.iter().map(|a| a.alert.id).collect();
        assert_eq!(ids, vec![3]);
        assert_eq!(
            panel.counts,
            AlertCounts { total: 3, active: 1, resolved: 1, false_alarm: 1 }
        );
    }

    #[test]
    fn search_covers_type_message_and_sensor_name() {
        let snap = session();
        let search = |q: &str| {
            let filter = AlertFilter { status: StatusFilter::All, search: q.into() };
            AlertPanel::build(&snap, &filter)
                .alerts
                .iter()
                .map(|a| a.alert.id)
                .collect::<Vec<_>>()
        };

        assert_eq!(search("FUGA"), vec![1]);
        assert_eq!(search("horno"), vec![2, 3]);
        assert_eq!(search("puerta horno"), vec![3]);
        assert_eq!(search("estufa"), vec![1]);
        assert_eq!(search(""), vec![1, 2, 3]);
        assert!(search("inundación").is_empty());
    }

    #[test]
    fn actions_follow_current_status() {
        let snap = session();
        let panel = AlertPanel::build(&snap, &AlertFilter::default());
        assert_eq!(
            panel.alerts[1].actions,
            vec![AlertStatus::Resolved, AlertStatus::FalseAlarm]
        );
        assert_eq!(panel.alerts[0].actions, vec![AlertStatus::Active]);
        assert_eq!(panel.alerts[1].sensor_name.as_deref(), Some("Sensor Temperatura"));
    }

    #[test]
    fn status_filter_parses_from_query_value() {
        let filter: AlertFilter =
            serde_json::from_value(serde_json::json!({"status": "resolved", "q": "gas"})).unwrap();
        assert_eq!(filter.status, StatusFilter::Resolved);
        assert_eq!(filter.search, "gas");
    }

    #[test]
    fn settings_start_from_device_and_defaults() {
        let snap = session();
        let form = SettingsForm::initial(snap.device.as_ref(), &SettingsDefaults::default());
        assert_eq!(form.device_name, "Mi Cocina");
        assert_eq!(form.gas_threshold, 50.0);
        assert_eq!(form.notification_method, NotificationMethod::Email);
        assert!(form.validate().is_ok());
    }

    #[test]
    fn settings_reject_bad_values() {
        let base = SettingsForm::initial(None, &SettingsDefaults::default());

        let bad = SettingsForm { gas_threshold: 0.0, ..base.clone() };
        assert!(matches!(bad.validate(), Err(StoreError::InvalidSettings(_))));

        let bad = SettingsForm { temperature_threshold: f64::NAN, ..base.clone() };
        assert!(bad.validate().is_err());

        let bad = SettingsForm { max_open_time_minutes: 0, ..base };
        assert!(bad.validate().is_err());
    }
}
