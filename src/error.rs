//! error taxonomy for the session data layer.
//!
//! "no user" and "no device" are not errors - they resolve to empty snapshots.

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// session data was requested outside a provisioned session scope
    #[error("session data accessed outside a provisioned session")]
    NotProvisioned,

    /// the tick task needs a tokio runtime to be scheduled on
    #[error("session store requires a running tokio runtime")]
    NoRuntime,

    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}
