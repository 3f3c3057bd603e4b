//! Realtime connection configuration

use serde::Deserialize;
use std::time::Duration;

use crate::domain::realtime::ReconnectPolicy;

use super::error::ValidationError;

/// Realtime link configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// WebSocket endpoint
    #[serde(default = "default_url")]
    pub url: String,

    /// Retries before giving up after the link is lost
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_base_reconnect_delay_ms")]
    pub base_reconnect_delay_ms: u64,

    /// Ceiling for any single retry delay, in milliseconds
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,

    /// Topics the binary subscribes to (comma-separated)
    #[serde(default = "default_topics")]
    pub topics: String,
}

impl RealtimeConfig {
    /// Backoff policy described by this configuration
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            base_delay: Duration::from_millis(self.base_reconnect_delay_ms),
            max_delay: Duration::from_millis(self.max_reconnect_delay_ms),
            max_attempts: self.max_reconnect_attempts,
        }
    }

    /// Get topics as a vector, skipping blanks
    pub fn topic_list(&self) -> Vec<String> {
        self.topics
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Validate realtime configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.url.starts_with("ws://") && !self.url.starts_with("wss://") {
            return Err(ValidationError::InvalidRealtimeUrl);
        }
        if self.max_reconnect_attempts > 100 {
            return Err(ValidationError::TooManyReconnectAttempts);
        }
        if self.base_reconnect_delay_ms == 0 {
            return Err(ValidationError::InvalidBaseDelay);
        }
        if self.max_reconnect_delay_ms < self.base_reconnect_delay_ms {
            return Err(ValidationError::InvalidMaxDelay);
        }
        Ok(())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            base_reconnect_delay_ms: default_base_reconnect_delay_ms(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
            topics: default_topics(),
        }
    }
}

fn default_url() -> String {
    "ws://localhost:8003/ws".to_string()
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_base_reconnect_delay_ms() -> u64 {
    1_000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30_000
}

fn default_topics() -> String {
    "notification".to_string()
}
