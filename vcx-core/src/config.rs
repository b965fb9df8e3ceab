//! Bridge session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Shortest sweeper period; smaller values are raised to it.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Deadline applied to every call. `None` waits for the callback forever.
    pub call_timeout: Option<Duration>,
    /// How often the sweeper rejects expired calls.
    pub sweep_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            call_timeout: None,
            sweep_interval: Duration::from_secs(1),
        }
    }
}

impl BridgeConfig {
    /// Set a per-call deadline.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Set the sweeper period, at least [`MIN_SWEEP_INTERVAL`].
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval.max(MIN_SWEEP_INTERVAL);
        self
    }
}
