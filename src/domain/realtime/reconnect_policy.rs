//! Exponential backoff policy for reconnecting the realtime link.

use std::time::Duration;

/// Base delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1_000);

/// Upper bound on any single retry delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(30_000);

/// Retries attempted before the manager gives up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Configuration for reconnection backoff.
///
/// The delay before the k-th consecutive retry is
/// `min(base_delay * 2^(k-1), max_delay)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    ///
    /// Default: 1 second
    pub base_delay: Duration,

    /// Ceiling applied to the doubled delay.
    ///
    /// Default: 30 seconds
    pub max_delay: Duration,

    /// Number of retries allowed after the link is lost.
    ///
    /// Default: 5 attempts
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-based).
    ///
    /// Attempt 0 is treated as attempt 1.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Returns true if another retry is allowed after `attempts_made` retries.
    pub fn allows_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}
