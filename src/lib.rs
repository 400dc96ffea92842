//! ==============================================================================
//! kitchen_monitor - kitchen safety monitoring dashboard
//! ==============================================================================
//!
//! purpose:
//!     session data layer of the dashboard: resolves a logged-in user to their
//!     kitchen device, its sensors and their alerts, keeps the sensor values
//!     moving with a simulated tick, and serves it all to the browser views.
//!
//! modules:
//!     - domain:     users, devices, sensors, alerts, status rule
//!     - catalog:    in-memory collections + per-user resolution
//!     - simulation: random / scripted reading sources and the tick step
//!     - store:      SessionStore (snapshot, subscribe, ticker) + SessionScope
//!     - auth:       mock user directory
//!     - views:      overview, alert panel and settings view models
//!     - config:     monitor.toml
//!     - server:     axum routes
//!
//! ==============================================================================

pub mod auth;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod simulation;
pub mod store;
pub mod views;

pub use catalog::{Catalog, Snapshot};
pub use error::StoreError;
pub use store::{SessionScope, SessionStore, StoreOptions};
