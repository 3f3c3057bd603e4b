//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `SCENARIO_STUDIO` prefix and nested values are separated by double underscores.
//! Every value has a default, so an empty environment yields a working setup.
//!
//! # Example
//!
//! ```no_run
//! use scenario_studio::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Realtime endpoint {}", config.realtime.url);
//! ```

mod error;
mod realtime;
mod storage;
mod telemetry;

pub use error::{ConfigError, ValidationError};
pub use realtime::RealtimeConfig;
pub use storage::StorageConfig;
pub use telemetry::{LogFormat, TelemetryConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Realtime link (endpoint, backoff, topics)
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Chat state persistence
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `SCENARIO_STUDIO` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `SCENARIO_STUDIO__REALTIME__URL=wss://...` -> `realtime.url = wss://...`
    /// - `SCENARIO_STUDIO__STORAGE__STATE_KEY=chatState` -> `storage.state_key = chatState`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("SCENARIO_STUDIO")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.realtime.validate()?;
        self.storage.validate()?;
        self.telemetry.validate()?;
        Ok(())
    }
}
