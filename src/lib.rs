//! Scenario Studio - realtime notifications and persisted chat state.
//!
//! The client core behind the report and scenario authoring UI: a
//! reconnecting topic pub/sub client over one WebSocket link, and a
//! reducer-driven chat store that persists every transition.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
