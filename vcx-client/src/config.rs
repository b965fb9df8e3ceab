//! Client configuration: bridge settings plus the default state-wait policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use vcx_core::{BridgeConfig, BridgeError, BridgeResult};

/// How [`wait_for_state`](crate::wait_for_state) polls.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitPolicy {
    /// Sleep after the first unsuccessful poll.
    pub initial_delay: Duration,
    /// Upper bound for the backoff.
    pub max_delay: Duration,
    /// Factor applied to the delay after every poll.
    pub multiplier: f64,
    /// Give up after this many polls.
    pub max_attempts: Option<u32>,
    /// Give up once this much time has passed.
    pub deadline: Option<Duration>,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_attempts: Some(30),
            deadline: None,
        }
    }
}

impl WaitPolicy {
    /// Set the backoff range. `multiplier` below 1 is treated as 1.
    pub fn with_backoff(mut self, initial: Duration, max: Duration, multiplier: f64) -> Self {
        self.initial_delay = initial;
        self.max_delay = max.max(initial);
        self.multiplier = multiplier.max(1.0);
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Poll until told to stop or the deadline passes.
    pub fn unlimited(mut self) -> Self {
        self.max_attempts = None;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Delay that follows `delay`, never past `max_delay`.
    pub fn next_delay(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.multiplier)
            .map_or(self.max_delay, |next| next.min(self.max_delay))
    }
}

/// Client configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientConfig {
    pub bridge: BridgeConfig,
    pub wait: WaitPolicy,
}

/// On-disk form; durations in milliseconds, every field optional.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    call_timeout_ms: Option<u64>,
    sweep_interval_ms: Option<u64>,
    poll_initial_ms: Option<u64>,
    poll_max_ms: Option<u64>,
    poll_multiplier: Option<f64>,
    poll_max_attempts: Option<u32>,
    poll_deadline_ms: Option<u64>,
}

impl ClientConfig {
    pub fn with_bridge(mut self, bridge: BridgeConfig) -> Self {
        self.bridge = bridge;
        self
    }

    pub fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Parse a JSON document such as
    /// `{"call_timeout_ms": 5000, "poll_initial_ms": 200, "poll_max_attempts": 10}`.
    /// Missing fields keep their defaults.
    pub fn from_json(text: &str) -> BridgeResult<Self> {
        let file: ConfigFile = serde_json::from_str(text)?;
        Ok(Self::default().apply(file))
    }

    /// Read `VCX_CALL_TIMEOUT_MS`, `VCX_POLL_INITIAL_MS`, `VCX_POLL_MAX_MS`
    /// and `VCX_POLL_MAX_ATTEMPTS`. Unset variables keep their defaults.
    pub fn from_env() -> BridgeResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BridgeResult<Self> {
        let read = |name: &'static str| -> BridgeResult<Option<u64>> {
            lookup(name)
                .map(|value| {
                    value.trim().parse::<u64>().map_err(|e| BridgeError::InvalidParameter {
                        name,
                        reason: e.to_string(),
                    })
                })
                .transpose()
        };

        let attempts = read("VCX_POLL_MAX_ATTEMPTS")?
            .map(|value| {
                u32::try_from(value).map_err(|e| BridgeError::InvalidParameter {
                    name: "VCX_POLL_MAX_ATTEMPTS",
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let file = ConfigFile {
            call_timeout_ms: read("VCX_CALL_TIMEOUT_MS")?,
            poll_initial_ms: read("VCX_POLL_INITIAL_MS")?,
            poll_max_ms: read("VCX_POLL_MAX_MS")?,
            poll_max_attempts: attempts,
            ..ConfigFile::default()
        };
        Ok(Self::default().apply(file))
    }

    fn apply(mut self, file: ConfigFile) -> Self {
        if let Some(ms) = file.call_timeout_ms {
            self.bridge = self.bridge.with_call_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = file.sweep_interval_ms {
            self.bridge = self.bridge.with_sweep_interval(Duration::from_millis(ms));
        }

        let initial = file
            .poll_initial_ms
            .map_or(self.wait.initial_delay, Duration::from_millis);
        let max = file.poll_max_ms.map_or(self.wait.max_delay, Duration::from_millis);
        let multiplier = file.poll_multiplier.unwrap_or(self.wait.multiplier);
        self.wait = self.wait.with_backoff(initial, max, multiplier);

        if let Some(attempts) = file.poll_max_attempts {
            self.wait = self.wait.with_max_attempts(attempts);
        }
        if let Some(ms) = file.poll_deadline_ms {
            self.wait = self.wait.with_deadline(Duration::from_millis(ms));
        }
        self
    }
}
