//! Simulator configuration.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use vcx_core::ErrorCode;

/// Simulator configuration.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Worker threads firing callbacks.
    pub workers: usize,
    /// Base delay before each callback.
    pub latency: Duration,
    /// Random extra delay, up to this much.
    pub jitter: Duration,
    /// Refuse blank string arguments synchronously with `INVALID_OPTION`.
    pub reject_blank: bool,
    /// Fire every callback twice.
    pub duplicate_callbacks: bool,
    /// Entry points whose callback never fires.
    pub dropped: HashSet<&'static str>,
    /// Entry points that fail asynchronously with the given code.
    pub failures: HashMap<&'static str, ErrorCode>,
    /// Entry points refused synchronously with the given code.
    pub rejections: HashMap<&'static str, ErrorCode>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            latency: Duration::from_millis(1),
            jitter: Duration::ZERO,
            reject_blank: true,
            duplicate_callbacks: false,
            dropped: HashSet::new(),
            failures: HashMap::new(),
            rejections: HashMap::new(),
        }
    }
}

impl SimConfig {
    /// Set the worker thread count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Delay every callback by `latency` plus up to `jitter`.
    pub fn with_latency(mut self, latency: Duration, jitter: Duration) -> Self {
        self.latency = latency;
        self.jitter = jitter;
        self
    }

    /// Fire every callback twice.
    pub fn with_duplicate_callbacks(mut self) -> Self {
        self.duplicate_callbacks = true;
        self
    }

    /// Never fire the callback for `operation`.
    pub fn with_dropped_callback(mut self, operation: &'static str) -> Self {
        self.dropped.insert(operation);
        self
    }

    /// Fail `operation` asynchronously with `code`.
    pub fn with_failure(mut self, operation: &'static str, code: ErrorCode) -> Self {
        self.failures.insert(operation, code);
        self
    }

    /// Refuse `operation` synchronously with `code`.
    pub fn with_rejection(mut self, operation: &'static str, code: ErrorCode) -> Self {
        self.rejections.insert(operation, code);
        self
    }

    /// Accept blank string arguments.
    pub fn allow_blank(mut self) -> Self {
        self.reject_blank = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = SimConfig::default();
        assert_eq!(config.workers, 4);
        assert!(config.reject_blank);
        assert!(!config.duplicate_callbacks);
        assert!(config.failures.is_empty());
    }

    #[test]
    fn custom_config() {
        let config = SimConfig::default()
            .with_workers(0)
            .with_latency(Duration::from_millis(5), Duration::from_millis(2))
            .with_failure("vcx_connection_connect", ErrorCode::NOT_READY)
            .with_dropped_callback("vcx_proof_send_request")
            .allow_blank();

        assert_eq!(config.workers, 1);
        assert_eq!(config.latency, Duration::from_millis(5));
        assert_eq!(
            config.failures.get("vcx_connection_connect"),
            Some(&ErrorCode::NOT_READY)
        );
        assert!(config.dropped.contains("vcx_proof_send_request"));
        assert!(!config.reject_blank);
    }
}
