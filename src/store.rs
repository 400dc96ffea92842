//! ==============================================================================
//! store.rs - session data store
//! ==============================================================================
//!
//! purpose:
//!     owns the {device, sensors, alerts} snapshot of one logged-in session,
//!     keeps the sensor values moving with a periodic simulated tick, and
//!     exposes the one mutation the views may perform (alert status).
//!
//! architecture:
//!
//! ```text
//! ┌──────────────┐  set_user   ┌──────────────────────────────────┐
//! │ auth / login ├────────────▶│ SessionStore                     │
//! └──────────────┘             │  catalog.resolve(user)           │
//!                              │  watch::Sender<Snapshot> ────────┼──▶ subscribers
//! ┌──────────────┐  update     │  ticker (only while sensors > 0) │     (views)
//! │ alert panel  ├────────────▶│   every N s: simulation::tick    │
//! └──────────────┘             └──────────────────────────────────┘
//! ```
//!
//! lifecycle:
//!     - every set_user stops the running ticker, publishes the freshly
//!       resolved snapshot with a new epoch, and starts a ticker for that
//!       epoch when the session has sensors.
//!     - a tick that wakes up after its epoch was replaced writes nothing and
//!       ends the task.
//!     - dropping the store aborts the ticker.
//!
//! relationships:
//!     - uses: catalog.rs (resolve), simulation.rs (tick), domain.rs
//!     - used by: server.rs (through SessionScope)
//!
//! ==============================================================================

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, Snapshot};
use crate::domain::{AlertId, AlertStatus, User};
use crate::error::StoreError;
use crate::simulation::{self, ReadingSource};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);
/// shortest accepted tick period; a zero period is raised to this
pub const MIN_TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub tick_interval: Duration,
    /// log every simulated value at info level
    pub show_sensor_data: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            show_sensor_data: false,
        }
    }
}

/// running simulation task, aborted on drop
struct Ticker {
    epoch: u64,
    handle: JoinHandle<()>,
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct SessionStore {
    catalog: Arc<Catalog>,
    source: Arc<dyn ReadingSource>,
    options: StoreOptions,
    state: Arc<watch::Sender<Snapshot>>,
    runtime: Handle,
    ticker: Mutex<Option<Ticker>>,
}

impl SessionStore {
    /// create an empty store. must be called from inside a tokio runtime.
    pub fn new(
        catalog: Arc<Catalog>,
        source: Arc<dyn ReadingSource>,
        mut options: StoreOptions,
    ) -> Result<Self, StoreError> {
        let runtime = Handle::try_current().map_err(|_| StoreError::NoRuntime)?;
        if options.tick_interval.is_zero() {
            warn!(
                min_ms = MIN_TICK_INTERVAL.as_millis() as u64,
                "zero tick interval, using minimum"
            );
            options.tick_interval = MIN_TICK_INTERVAL;
        }
        let (state, _) = watch::channel(Snapshot::default());
        Ok(Self {
            catalog,
            source,
            options,
            state: Arc::new(state),
            runtime,
            ticker: Mutex::new(None),
        })
    }

    /// re-resolve the session for a new user identity (or none, on logout).
    ///
    /// the previous snapshot is replaced in one publish; subscribers never see
    /// a device without its sensors or alerts.
    pub fn set_user(&self, user: Option<&User>) {
        let mut ticker = self.lock_ticker();
        if let Some(old) = ticker.take() {
            debug!(epoch = old.epoch, "stopping sensor simulation");
        }

        let epoch = self.state.borrow().epoch + 1;
        let mut next = self.catalog.resolve(user);
        next.epoch = epoch;

        let sensor_count = next.sensors.len();
        info!(
            user_id = user.map(|u| u.id),
            device_id = next.device.as_ref().map(|d| d.id),
            sensors = sensor_count,
            alerts = next.alerts.len(),
            epoch,
            "session resolved"
        );
        self.state.send_replace(next);

        if sensor_count > 0 {
            *ticker = Some(self.spawn_ticker(epoch));
        }
    }

    /// set the status of one alert. unknown ids are ignored.
    ///
    /// only the matching entry is replaced; every other alert keeps its `Arc`.
    pub fn update_alert_status(&self, alert_id: AlertId, status: AlertStatus) {
        let now = Utc::now();
        let matched = self.state.send_if_modified(|snap| {
            match snap.alerts.iter_mut().find(|a| a.id == alert_id) {
                Some(slot) => {
                    *slot = Arc::new(slot.with_status(status, now));
                    true
                }
                None => false,
            }
        });

        if matched {
            info!(alert_id, status = status.label(), "alert status updated");
        } else {
            debug!(alert_id, "status update for unknown alert ignored");
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    /// change feed; the receiver starts out marked as seen
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    /// whether the periodic simulation is currently scheduled
    pub fn is_simulating(&self) -> bool {
        self.lock_ticker()
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// end the session: stop the ticker and drop the store
    pub fn close(self) {
        if let Some(old) = self.lock_ticker().take() {
            debug!(epoch = old.epoch, "session closed");
        }
    }

    fn lock_ticker(&self) -> MutexGuard<'_, Option<Ticker>> {
        self.ticker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn spawn_ticker(&self, epoch: u64) -> Ticker {
        let state = Arc::clone(&self.state);
        let source = Arc::clone(&self.source);
        let period = self.options.tick_interval;
        let show_sensor_data = self.options.show_sensor_data;
        debug!(epoch, period_ms = period.as_millis() as u64, "starting sensor simulation");

        let handle = self.runtime.spawn(async move {
            // no immediate tick: the first update lands one full period in
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let now = Utc::now();
                let mut current = true;
                state.send_if_modified(|snap| {
                    if snap.epoch != epoch {
                        current = false;
                        return false;
                    }
                    snap.sensors = simulation::tick(&snap.sensors, source.as_ref(), now);
                    !snap.sensors.is_empty()
                });

                if !current {
                    debug!(epoch, "session replaced, simulation ends");
                    break;
                }

                if show_sensor_data {
                    for sensor in state.borrow().sensors.iter() {
                        info!(
                            sensor_id = sensor.id,
                            value = sensor.current_value.unwrap_or_default(),
                            status = ?sensor.status,
                            "[{}] {:.1} {}",
                            sensor.name,
                            sensor.current_value.unwrap_or_default(),
                            sensor.unit
                        );
                    }
                } else {
                    debug!(epoch, "simulated tick");
                }
            }
        });

        Ticker { epoch, handle }
    }
}

// ==============================================================================
// session scope
// ==============================================================================
// holds the one active session. views that ask for data while nobody is
// logged in get NotProvisioned instead of an empty default.

/// a session the scope can end when it is replaced or revoked
pub trait Teardown: Send + Sync {
    fn teardown(&self);
}

impl Teardown for SessionStore {
    fn teardown(&self) {
        self.set_user(None);
    }
}

/// everything belonging to a session sits behind one lock, so a concurrent
/// login and logout can only ever leave a whole session or none
pub struct SessionScope<S: Teardown = SessionStore> {
    current: RwLock<Option<Arc<S>>>,
}

impl<S: Teardown> Default for SessionScope<S> {
    fn default() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }
}

impl<S: Teardown> SessionScope<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// install a new session, tearing down any previous one
    pub async fn provide(&self, session: Arc<S>) {
        let previous = self.current.write().await.replace(session);
        if let Some(previous) = previous {
            previous.teardown();
        }
    }

    /// end the active session. returns false when there was none.
    pub async fn revoke(&self) -> bool {
        let previous = self.current.write().await.take();
        match previous {
            Some(session) => {
                session.teardown();
                true
            }
            None => false,
        }
    }

    /// the active session
    pub async fn data(&self) -> Result<Arc<S>, StoreError> {
        self.current
            .read()
            .await
            .clone()
            .ok_or(StoreError::NotProvisioned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SensorKind, SensorStatus};
    use crate::simulation::{RandomReadings, ScriptedReadings};

    fn user(id: u32) -> User {
        User {
            id,
            name: format!("user {}", id),
            email: format!("u{}@example.com", id),
            phone_number: None,
            created_at: Utc::now(),
        }
    }

    fn store_with(source: Arc<dyn ReadingSource>) -> SessionStore {
        SessionStore::new(
            Arc::new(Catalog::sample(Utc::now())),
            source,
            StoreOptions::default(),
        )
        .unwrap()
    }

    fn store() -> SessionStore {
        store_with(Arc::new(RandomReadings))
    }

    #[test]
    fn new_outside_runtime_fails() {
        let result = SessionStore::new(
            Arc::new(Catalog::default()),
            Arc::new(RandomReadings),
            StoreOptions::default(),
        );
        assert!(matches!(result, Err(StoreError::NoRuntime)));
    }

    #[tokio::test]
    async fn login_resolves_and_starts_simulation() {
        let store = store();
        assert!(store.snapshot().device.is_none());
        assert!(!store.is_simulating());

        store.set_user(Some(&user(1)));
        let snap = store.snapshot();
        assert_eq!(snap.device.map(|d| d.id), Some(1));
        assert_eq!(snap.sensors.len(), 3);
        assert_eq!(snap.alerts.len(), 3);
        assert!(store.is_simulating());
    }

    #[tokio::test]
    async fn user_without_device_does_not_simulate() {
        let store = store();
        store.set_user(Some(&user(7)));
        let snap = store.snapshot();
        assert!(snap.device.is_none());
        assert!(snap.sensors.is_empty());
        assert!(!store.is_simulating());
    }

    #[tokio::test]
    async fn resolving_alert_stamps_and_keeps_others() {
        let store = store();
        store.set_user(Some(&user(1)));
        let before = store.snapshot();
        let called_at = Utc::now();

        store.update_alert_status(2, AlertStatus::Resolved);

        let after = store.snapshot();
        let updated = after.alerts.iter().find(|a| a.id == 2).unwrap();
        assert_eq!(updated.status, AlertStatus::Resolved);
        assert!(updated.resolved_at.is_some_and(|t| t >= called_at));

        assert!(Arc::ptr_eq(&before.alerts[0], &after.alerts[0]));
        assert!(Arc::ptr_eq(&before.alerts[2], &after.alerts[2]));
        assert!(!Arc::ptr_eq(&before.alerts[1], &after.alerts[1]));
    }

    #[tokio::test]
    async fn reactivating_clears_resolved_at() {
        let store = store();
        store.set_user(Some(&user(1)));

        store.update_alert_status(1, AlertStatus::Active);

        let snap = store.snapshot();
        let alert = snap.alerts.iter().find(|a| a.id == 1).unwrap();
        assert_eq!(alert.status, AlertStatus::Active);
        assert!(alert.resolved_at.is_none());
    }

    #[tokio::test]
    async fn unknown_alert_is_a_silent_noop() {
        let store = store();
        store.set_user(Some(&user(1)));
        let mut rx = store.subscribe();
        let before = store.snapshot();

        store.update_alert_status(404, AlertStatus::Resolved);

        assert!(!rx.has_changed().unwrap());
        let after = store.snapshot();
        for (a, b) in before.alerts.iter().zip(&after.alerts) {
            assert!(Arc::ptr_eq(a, b));
        }
    }

    #[tokio::test]
    async fn subscribers_see_status_updates() {
        let store = store();
        store.set_user(Some(&user(1)));
        let mut rx = store.subscribe();

        store.update_alert_status(2, AlertStatus::FalseAlarm);

        rx.changed().await.unwrap();
        let snap = rx.borrow_and_update().clone();
        assert_eq!(
            snap.alerts.iter().find(|a| a.id == 2).map(|a| a.status),
            Some(AlertStatus::FalseAlarm)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_lands_after_one_interval() {
        let source = ScriptedReadings::new()
            .with(SensorKind::Gas, 75.0)
            .with(SensorKind::Temperature, 70.0)
            .with(SensorKind::Magnetic, 1.0);
        let store = store_with(Arc::new(source));
        store.set_user(Some(&user(1)));
        let mut rx = store.subscribe();
        let started = Instant::now();

        rx.changed().await.unwrap();

        assert!(started.elapsed() >= DEFAULT_TICK_INTERVAL);
        let snap = rx.borrow_and_update().clone();
        let statuses: Vec<_> = snap.sensors.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![SensorStatus::Danger, SensorStatus::Warning, SensorStatus::Warning]
        );
        assert!(snap.sensors.iter().all(|s| s.last_reading.is_some()));
        // alerts untouched by the simulation
        assert_eq!(snap.alerts.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn logout_stops_simulation() {
        let store = store();
        store.set_user(Some(&user(1)));
        store.set_user(None);
        assert!(!store.is_simulating());

        let mut rx = store.subscribe();
        tokio::time::sleep(DEFAULT_TICK_INTERVAL * 4).await;

        assert!(!rx.has_changed().unwrap());
        let snap = store.snapshot();
        assert!(snap.device.is_none());
        assert!(snap.sensors.is_empty());
        assert!(snap.alerts.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn switching_user_simulates_the_new_session() {
        let source = Arc::new(ScriptedReadings::new().with(SensorKind::Gas, 10.0));
        let store = store_with(source);
        store.set_user(Some(&user(1)));
        store.set_user(Some(&user(2)));
        let mut rx = store.subscribe();

        rx.changed().await.unwrap();

        let snap = rx.borrow_and_update().clone();
        let ids: Vec<_> = snap.sensors.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![4, 5]);
        assert_eq!(snap.sensors[0].current_value, Some(10.0));
        assert!(snap.alerts.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_store_aborts_the_ticker() {
        let store = store();
        store.set_user(Some(&user(1)));
        let mut rx = store.subscribe();
        store.close();

        tokio::time::sleep(DEFAULT_TICK_INTERVAL * 2).await;
        // sender gone: the channel reports closed instead of a new value
        assert!(rx.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_still_ticks() {
        let store = SessionStore::new(
            Arc::new(Catalog::sample(Utc::now())),
            Arc::new(RandomReadings),
            StoreOptions {
                tick_interval: Duration::ZERO,
                show_sensor_data: false,
            },
        )
        .unwrap();
        store.set_user(Some(&user(1)));
        let mut rx = store.subscribe();
        let started = Instant::now();

        rx.changed().await.unwrap();

        assert!(started.elapsed() >= MIN_TICK_INTERVAL);
        assert!(store.is_simulating());
    }

    #[tokio::test]
    async fn scope_fails_loudly_without_session() {
        let scope: SessionScope = SessionScope::new();
        assert!(matches!(scope.data().await, Err(StoreError::NotProvisioned)));
        assert!(!scope.revoke().await);
    }

    #[tokio::test]
    async fn scope_revoke_clears_the_session() {
        let scope: SessionScope = SessionScope::new();
        let store = Arc::new(store());
        store.set_user(Some(&user(1)));
        scope.provide(Arc::clone(&store)).await;

        assert!(scope.data().await.is_ok());
        assert!(scope.revoke().await);

        assert!(matches!(scope.data().await, Err(StoreError::NotProvisioned)));
        assert!(store.snapshot().sensors.is_empty());
        assert!(!store.is_simulating());
    }
}
