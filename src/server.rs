//! ==============================================================================
//! server.rs - dashboard web server
//! ==============================================================================
//!
//! purpose:
//!     http surface of the dashboard. the browser pages are the "views": they
//!     read the session snapshot and derived view models, and call the alert
//!     status endpoint, the only mutation the store exposes outward.
//!
//! routes:
//!     GET  /                          server-rendered overview
//!     POST /api/login                 {email} -> user, starts the session
//!     POST /api/logout                ends the session
//!     GET  /api/session               {device, sensors, alerts}
//!     GET  /api/dashboard             overview cards
//!     GET  /api/alerts?status=&q=     alert panel
//!     POST /api/alerts/:id/status     {status}
//!     GET  /api/settings              settings form
//!     PUT  /api/settings              validate + keep settings form
//!
//! shared state:
//!     one session at a time (kiosk). the SessionScope holds the user, the
//!     store and the settings form together; data routes fail with
//!     401 NO_SESSION while nobody is logged in.
//!
//! ==============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

use crate::auth::UserDirectory;
use crate::catalog::Catalog;
use crate::config::MonitorConfig;
use crate::domain::{AlertId, AlertStatus, SensorStatus, User};
use crate::error::StoreError;
use crate::simulation::ReadingSource;
use crate::store::{SessionScope, SessionStore, Teardown};
use crate::views::{AlertFilter, AlertPanel, DashboardSummary, SettingsForm};

// ==============================================================================
// shared state
// ==============================================================================

/// one logged-in session: who it is for, their store and their settings form
pub struct Session {
    pub user: User,
    pub store: Arc<SessionStore>,
    settings: RwLock<SettingsForm>,
}

impl Teardown for Session {
    fn teardown(&self) {
        self.store.teardown();
    }
}

pub struct Dashboard {
    pub catalog: Arc<Catalog>,
    pub directory: UserDirectory,
    pub source: Arc<dyn ReadingSource>,
    pub config: MonitorConfig,
    pub scope: SessionScope<Session>,
}

impl Dashboard {
    pub fn new(
        catalog: Catalog,
        directory: UserDirectory,
        source: Arc<dyn ReadingSource>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            directory,
            source,
            config,
            scope: SessionScope::new(),
        }
    }

    /// log a user in: a fresh store is resolved for them and replaces any
    /// previous session
    pub async fn login(&self, email: &str) -> Result<User, StoreError> {
        let user = self.directory.authenticate(email)?;
        let store = SessionStore::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.source),
            self.config.store_options(),
        )?;
        store.set_user(Some(&user));

        let form = SettingsForm::initial(store.snapshot().device.as_ref(), &self.config.settings);
        let session = Session {
            user: user.clone(),
            store: Arc::new(store),
            settings: RwLock::new(form),
        };
        self.scope.provide(Arc::new(session)).await;

        tracing::info!(user_id = user.id, "login");
        Ok(user)
    }

    pub async fn logout(&self) {
        let session = self.scope.data().await.ok();
        if self.scope.revoke().await {
            tracing::info!(user_id = session.map(|s| s.user.id), "logout");
        }
    }

    pub async fn current_user(&self) -> Option<User> {
        self.scope.data().await.ok().map(|s| s.user.clone())
    }
}

pub type SharedDashboard = Arc<Dashboard>;

// ==============================================================================
// errors
// ==============================================================================

/// json error body: {"error": ..., "code": ...}
#[derive(Debug)]
pub enum ApiError {
    Store(StoreError),
    /// request body that does not parse into the expected shape
    Body(JsonRejection),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Store(err) => {
                let (status, code) = match &err {
                    StoreError::NotProvisioned => (StatusCode::UNAUTHORIZED, "NO_SESSION"),
                    StoreError::UnknownUser(_) => (StatusCode::UNAUTHORIZED, "UNKNOWN_USER"),
                    StoreError::InvalidSettings(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                    StoreError::NoRuntime => {
                        tracing::error!(error = %err, "internal error");
                        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                    }
                };
                (status, code, err.to_string())
            }
            ApiError::Body(rejection) => (rejection.status(), "VALIDATION_ERROR", rejection.body_text()),
        };
        let body = json!({ "error": message, "code": code });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

// ==============================================================================
// router
// ==============================================================================

pub fn router(state: SharedDashboard) -> Router {
    Router::new()
        .route("/", get(dashboard_page))
        .route("/api/login", post(login_handler))
        .route("/api/logout", post(logout_handler))
        .route("/api/session", get(session_handler))
        .route("/api/dashboard", get(summary_handler))
        .route("/api/alerts", get(alerts_handler))
        .route("/api/alerts/:id/status", post(alert_status_handler))
        .route("/api/settings", get(get_settings_handler).put(put_settings_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: SharedDashboard) -> Result<()> {
    let bind = state.config.server.bind.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    tracing::info!(%bind, "dashboard live");
    axum::serve(listener, app).await?;
    Ok(())
}

// ==============================================================================
// handlers
// ==============================================================================

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
}

async fn login_handler(
    State(app): State<SharedDashboard>,
    req: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Json(req) = req?;
    let user = app.login(&req.email).await?;
    Ok(Json(user))
}

async fn logout_handler(State(app): State<SharedDashboard>) -> StatusCode {
    app.logout().await;
    StatusCode::NO_CONTENT
}

async fn session_handler(State(app): State<SharedDashboard>) -> ApiResult<impl IntoResponse> {
    let session = app.scope.data().await?;
    Ok(Json(session.store.snapshot()))
}

async fn summary_handler(State(app): State<SharedDashboard>) -> ApiResult<Json<DashboardSummary>> {
    let session = app.scope.data().await?;
    Ok(Json(DashboardSummary::from_snapshot(&session.store.snapshot())))
}

async fn alerts_handler(
    State(app): State<SharedDashboard>,
    Query(filter): Query<AlertFilter>,
) -> ApiResult<Json<AlertPanel>> {
    let session = app.scope.data().await?;
    Ok(Json(AlertPanel::build(&session.store.snapshot(), &filter)))
}

#[derive(Deserialize)]
struct StatusUpdate {
    status: AlertStatus,
}

/// unknown ids are accepted: the page may hold a stale alert
async fn alert_status_handler(
    State(app): State<SharedDashboard>,
    Path(id): Path<AlertId>,
    update: Result<Json<StatusUpdate>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(update) = update?;
    let session = app.scope.data().await?;
    session.store.update_alert_status(id, update.status);
    Ok(StatusCode::NO_CONTENT)
}

async fn get_settings_handler(State(app): State<SharedDashboard>) -> ApiResult<Json<SettingsForm>> {
    let session = app.scope.data().await?;
    let form = session.settings.read().await.clone();
    Ok(Json(form))
}

async fn put_settings_handler(
    State(app): State<SharedDashboard>,
    form: Result<Json<SettingsForm>, JsonRejection>,
) -> ApiResult<Json<SettingsForm>> {
    let Json(form) = form?;
    let session = app.scope.data().await?;
    form.validate()?;
    tracing::info!(?form, "settings saved");
    *session.settings.write().await = form.clone();
    Ok(Json(form))
}

async fn dashboard_page(State(app): State<SharedDashboard>) -> Html<String> {
    match app.scope.data().await {
        Ok(session) => {
            let summary = DashboardSummary::from_snapshot(&session.store.snapshot());
            Html(render_overview(&session.user, &summary))
        }
        Err(_) => Html(render_login_hint()),
    }
}

// ==============================================================================
// html
// ==============================================================================

const PAGE_STYLE: &str =
    "font-family: system-ui; padding: 2rem; background: #f9fafb; color: #111827;";

fn status_color(status: SensorStatus) -> &'static str {
    match status {
        SensorStatus::Normal => "#16a34a",
        SensorStatus::Warning => "#ca8a04",
        SensorStatus::Danger => "#dc2626",
    }
}

fn render_login_hint() -> String {
    format!(
        r#"<!doctype html>
<html>
<head><title>kitchen monitor</title></head>
<body style="{}">
    <h1>Kitchen Monitor</h1>
    <p>No active session. POST <code>/api/login</code> with <code>{{"email": "..."}}</code> to start one.</p>
</body>
</html>"#,
        PAGE_STYLE
    )
}

fn render_overview(user: &User, summary: &DashboardSummary) -> String {
    let Some(device) = &summary.device else {
        return format!(
            r#"<!doctype html>
<html>
<head><title>kitchen monitor</title></head>
<body style="{}">
    <h1>Hola, {}</h1>
    <h3>No device configured</h3>
    <p>Configure a device to start monitoring.</p>
</body>
</html>"#,
            PAGE_STYLE,
            html_escape(&user.name)
        );
    };

    let sensor_rows: String = summary
        .sensors
        .iter()
        .map(|s| {
            format!(
                r#"<tr><td>{}</td><td>{:.1} {}</td><td>{:.1}</td><td style="color: {}">{:?}</td></tr>"#,
                html_escape(&s.name),
                s.current_value.unwrap_or_default(),
                html_escape(&s.unit),
                s.threshold,
                status_color(s.status),
                s.status
            )
        })
        .collect();

    let alert_rows: String = summary
        .recent_alerts
        .iter()
        .map(|a| {
            format!(
                "<li><strong>{}</strong> - {} ({})</li>",
                html_escape(&a.alert.kind),
                html_escape(&a.alert.message),
                a.alert.status.label()
            )
        })
        .collect();

    format!(
        r#"<!doctype html>
<html>
<head><title>kitchen monitor</title><meta http-equiv="refresh" content="5"></head>
<body style="{style}">
    <h1>{device}</h1>
    <p>Hola, {user} | status: <span style="color: {color}">{status:?}</span> | active alerts: {active} | sensors: {count}</p>
    <table>
        <tr><th>sensor</th><th>value</th><th>threshold</th><th>status</th></tr>
        {sensor_rows}
    </table>
    <h2>Recent alerts</h2>
    <ul>{alert_rows}</ul>
</body>
</html>"#,
        style = PAGE_STYLE,
        device = html_escape(&device.name),
        user = html_escape(&user.name),
        color = status_color(summary.overall_status),
        status = summary.overall_status,
        active = summary.active_alerts,
        count = summary.sensor_count,
        sensor_rows = sensor_rows,
        alert_rows = alert_rows,
    )
}

/// escape html special characters to prevent xss
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
