//! ==============================================================================
//! main.rs - kitchen monitor entry point
//! ==============================================================================
//!
//! purpose:
//!     boots the dashboard: loads configuration, installs logging, builds the
//!     demo catalog and user directory, and serves the web dashboard.
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────────────────────┐
//!     │                     kitchen-monitor                          │
//!     │  ┌─────────────┐   ┌────────────────┐   ┌────────────────┐   │
//!     │  │ web server  │──▶│ SessionScope   │──▶│ SessionStore   │   │
//!     │  │ (port 3000) │   │ (one session)  │   │ snapshot+ticker│   │
//!     │  └─────────────┘   └────────────────┘   └───────┬────────┘   │
//!     │                                                 │ every 5s   │
//!     │                                         ┌───────┴────────┐   │
//!     │                                         │ simulation     │   │
//!     │                                         │ (random values)│   │
//!     │                                         └────────────────┘   │
//!     └──────────────────────────────────────────────────────────────┘
//!
//! ==============================================================================

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kitchen_monitor::auth::UserDirectory;
use kitchen_monitor::config::MonitorConfig;
use kitchen_monitor::server::{self, Dashboard};
use kitchen_monitor::simulation::RandomReadings;
use kitchen_monitor::Catalog;

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: load configuration (logged through a temporary subscriber,
    // the real one depends on the configured level)
    let bootstrap = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .finish();
    let config = tracing::subscriber::with_default(bootstrap, MonitorConfig::load_or_default);

    // step 2: logging - RUST_LOG wins over the config file
    let fallback = format!("kitchen_monitor={}", config.logging.level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("kitchen monitor starting");
    config.log_summary();

    // step 3: demo data
    let now = Utc::now();
    let dashboard = Dashboard::new(
        Catalog::sample(now),
        UserDirectory::new(Catalog::sample_users(now)),
        Arc::new(RandomReadings),
        config,
    );

    // step 4: serve until shutdown
    server::serve(Arc::new(dashboard)).await
}
