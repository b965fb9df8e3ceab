//! Pending-call registry.
//!
//! Maps command handles to the completion sink of the call that issued them.
//! `take` is the only way a callback reaches a sink, and it removes the entry
//! atomically, so a given handle resolves its sink at most once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{BridgeError, BridgeResult};
use crate::handle::CommandHandle;
use crate::payload::{Payload, ResultShape};

/// Outcome delivered to a completion sink.
pub type Outcome = Result<Payload, BridgeError>;

/// Sender half of a pending call's completion channel.
pub type CompletionSink = oneshot::Sender<Outcome>;

/// One outstanding async libvcx call.
#[derive(Debug)]
pub struct PendingCall {
    sink: CompletionSink,
    shape: ResultShape,
    operation: &'static str,
    created_at: Instant,
    deadline: Option<Instant>,
}

impl PendingCall {
    /// Create a pending call expecting a payload of `shape`.
    pub fn new(sink: CompletionSink, shape: ResultShape, operation: &'static str) -> Self {
        Self {
            sink,
            shape,
            operation,
            created_at: Instant::now(),
            deadline: None,
        }
    }

    /// Expire the call `timeout` after creation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(self.created_at + timeout);
        self
    }

    pub fn shape(&self) -> ResultShape {
        self.shape
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Time since the call was issued.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Resolve the sink. Returns false when the caller stopped waiting.
    pub fn resolve(self, outcome: Outcome) -> bool {
        self.sink.send(outcome).is_ok()
    }
}

/// Counters for leak and anomaly diagnosis.
#[derive(Debug, Default)]
pub struct RegistryStats {
    /// Calls registered.
    pub total_registered: AtomicU64,
    /// Calls taken by a matching callback.
    pub total_completed: AtomicU64,
    /// Callbacks for a handle that was not pending.
    pub total_orphaned: AtomicU64,
    /// Calls removed by their deadline.
    pub total_timeouts: AtomicU64,
    /// Calls cancelled or retracted after a synchronous rejection.
    pub total_cancelled: AtomicU64,
    /// Calls failed by session teardown.
    pub total_closed: AtomicU64,
}

impl RegistryStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Concurrent store of pending calls for one bridge session.
#[derive(Debug, Default)]
pub struct Registry {
    pending: DashMap<CommandHandle, PendingCall>,
    stats: RegistryStats,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pending call. Fails if `id` is already pending.
    pub fn register(&self, id: CommandHandle, call: PendingCall) -> BridgeResult<()> {
        match self.pending.entry(id) {
            Entry::Occupied(_) => Err(BridgeError::DuplicateCommandHandle(id)),
            Entry::Vacant(slot) => {
                debug!(
                    command_handle = %id,
                    operation = call.operation,
                    "Registered pending call"
                );
                slot.insert(call);
                RegistryStats::bump(&self.stats.total_registered);
                Ok(())
            }
        }
    }

    /// Atomically remove the entry for a callback.
    ///
    /// A miss means a duplicate callback, a callback after expiry, or an id
    /// that was never issued; it is logged and counted, never delivered.
    pub fn take(&self, id: CommandHandle) -> Option<PendingCall> {
        match self.pending.remove(&id) {
            Some((_, call)) => {
                RegistryStats::bump(&self.stats.total_completed);
                Some(call)
            }
            None => {
                RegistryStats::bump(&self.stats.total_orphaned);
                warn!(
                    command_handle = %id,
                    "Callback for unknown, completed or expired command handle dropped"
                );
                None
            }
        }
    }

    /// Remove an entry whose native call was rejected synchronously.
    pub fn retract(&self, id: CommandHandle) -> Option<PendingCall> {
        let removed = self.pending.remove(&id).map(|(_, call)| call);
        if removed.is_some() {
            RegistryStats::bump(&self.stats.total_cancelled);
        }
        removed
    }

    /// Remove an entry whose caller stopped waiting at its deadline.
    pub fn expire(&self, id: CommandHandle) -> Option<PendingCall> {
        let removed = self.pending.remove(&id).map(|(_, call)| call);
        if let Some(call) = &removed {
            RegistryStats::bump(&self.stats.total_timeouts);
            warn!(
                command_handle = %id,
                operation = call.operation,
                elapsed_ms = call.age().as_millis() as u64,
                "Pending call timed out"
            );
        }
        removed
    }

    /// Cancel a pending call, rejecting its sink with `Cancelled`.
    pub fn cancel(&self, id: CommandHandle) -> bool {
        match self.pending.remove(&id) {
            Some((_, call)) => {
                RegistryStats::bump(&self.stats.total_cancelled);
                debug!(command_handle = %id, operation = call.operation, "Cancelled pending call");
                call.resolve(Err(BridgeError::Cancelled));
                true
            }
            None => false,
        }
    }

    /// Reject every call whose deadline has passed with a timeout.
    ///
    /// Returns the number of calls removed.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<CommandHandle> = self
            .pending
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| *entry.key())
            .collect();

        let mut removed = 0;
        for id in expired {
            // A callback may have taken the entry since the scan.
            if let Some((_, call)) = self.pending.remove_if(&id, |_, call| call.is_expired(now)) {
                RegistryStats::bump(&self.stats.total_timeouts);
                let elapsed = call.age();
                let operation = call.operation;
                warn!(
                    command_handle = %id,
                    operation,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Removing expired pending call"
                );
                call.resolve(Err(BridgeError::Timeout {
                    command_handle: id,
                    operation,
                    elapsed,
                }));
                removed += 1;
            }
        }
        removed
    }

    /// Fail every pending call with `SessionClosed`.
    ///
    /// Returns the number of calls failed.
    pub fn drain(&self) -> usize {
        let ids: Vec<CommandHandle> = self.pending.iter().map(|entry| *entry.key()).collect();
        let mut drained = 0;
        for id in ids {
            if let Some((_, call)) = self.pending.remove(&id) {
                RegistryStats::bump(&self.stats.total_closed);
                call.resolve(Err(BridgeError::SessionClosed));
                drained += 1;
            }
        }
        drained
    }

    /// Whether `id` is pending.
    pub fn contains(&self, id: CommandHandle) -> bool {
        self.pending.contains_key(&id)
    }

    /// Number of pending calls.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Age of the oldest pending call.
    pub fn oldest_pending_age(&self) -> Option<Duration> {
        self.pending.iter().map(|entry| entry.value().age()).max()
    }

    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }
}
