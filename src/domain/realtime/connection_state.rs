//! Connection lifecycle state machine.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──open──▶ Open
//!      ▲                      │   ▲                │
//!      │                      │   │ retry timer    │ close / error
//!      │                      ▼   │                ▼
//!      └──── exhausted ─── ClosedPendingRetry ◀────┘
//! ```
//!
//! An explicit disconnect moves any state to `Disconnected`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Lifecycle state of the single logical link to the realtime backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No transport and no retry scheduled.
    #[default]
    Disconnected,

    /// A transport is being opened.
    Connecting,

    /// Transport is open; sends are accepted.
    Open,

    /// Transport was lost; a retry is scheduled.
    ClosedPendingRetry,
}

impl ConnectionState {
    /// Returns true if outbound frames can be written.
    pub fn accepts_sends(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::ClosedPendingRetry => "closed_pending_retry",
        };
        f.write_str(s)
    }
}

impl StateMachine for ConnectionState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ConnectionState::*;
        matches!(
            (self, target),
            (Disconnected, Connecting)
                | (Connecting, Open)
                | (Connecting, ClosedPendingRetry)
                | (Connecting, Disconnected)
                | (Open, ClosedPendingRetry)
                | (Open, Disconnected)
                | (ClosedPendingRetry, Connecting)
                | (ClosedPendingRetry, Disconnected)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ConnectionState::*;
        match self {
            Disconnected => vec![Connecting],
            Connecting => vec![Open, ClosedPendingRetry, Disconnected],
            Open => vec![ClosedPendingRetry, Disconnected],
            ClosedPendingRetry => vec![Connecting, Disconnected],
        }
    }
}
