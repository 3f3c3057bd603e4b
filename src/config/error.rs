//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid realtime URL (expected ws:// or wss://)")]
    InvalidRealtimeUrl,

    #[error("Reconnect attempts exceed maximum allowed (100)")]
    TooManyReconnectAttempts,

    #[error("Base reconnect delay must be greater than zero")]
    InvalidBaseDelay,

    #[error("Max reconnect delay is below the base delay")]
    InvalidMaxDelay,

    #[error("Invalid storage key: {0}")]
    InvalidStateKey(String),

    #[error("Invalid log filter directive: {0}")]
    InvalidLogLevel(String),
}
