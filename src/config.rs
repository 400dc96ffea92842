//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `monitor.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - SimulationConfig: How often the simulated sensors tick.
//!     - ServerConfig: Where the dashboard listens.
//!     - LoggingConfig: Log level and per-reading output.
//!     - SettingsDefaults: Initial values of the settings form.
//!
//! ==============================================================================

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::store::StoreOptions;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MonitorConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub settings: SettingsDefaults,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimulationConfig {
    pub interval_seconds: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { interval_seconds: 5 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:3000".to_string() }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: false }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SettingsDefaults {
    pub gas_threshold: f64,
    pub temperature_threshold: f64,
    pub repetition_delay_minutes: u32,
    pub max_open_time_minutes: u32,
}

impl Default for SettingsDefaults {
    fn default() -> Self {
        Self {
            gas_threshold: 50.0,
            temperature_threshold: 80.0,
            repetition_delay_minutes: 5,
            max_open_time_minutes: 10,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        Self::parse(&content)
    }

    /// Parse a config document; a zero tick interval is clamped to one second
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let mut config: MonitorConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;

        if config.simulation.interval_seconds == 0 {
            tracing::warn!("simulation.interval_seconds = 0, clamping to 1s");
            config.simulation.interval_seconds = 1;
        }

        Ok(config)
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let paths = [
            std::path::PathBuf::from("config").join("monitor.toml"),
            std::path::PathBuf::from("..").join("config").join("monitor.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        tracing::info!(path = %path.display(), "config loaded");
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "failed to load config");
                    }
                }
            }
        }

        tracing::warn!("no config file found - using defaults");
        Self::default()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.simulation.interval_seconds)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            tick_interval: self.tick_interval(),
            show_sensor_data: self.logging.show_sensor_data,
        }
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        tracing::info!(
            bind = %self.server.bind,
            tick_seconds = self.tick_interval().as_secs(),
            log_level = %self.logging.level,
            show_sensor_data = self.logging.show_sensor_data,
            "monitor configuration"
        );
    }
}
