//! Polling an object until it reaches a state.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::debug;
use vcx_core::{BridgeError, BridgeResult, ObjectState};

use crate::config::WaitPolicy;

/// Stops [`wait_for_state`] from another task. Clones share one flag.
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any token, so this only ends on cancel.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

async fn or_cancelled<F>(cancel: Option<&CancelToken>, future: F) -> BridgeResult<F::Output>
where
    F: Future,
{
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(BridgeError::Cancelled),
            output = future => Ok(output),
        },
        None => Ok(future.await),
    }
}

/// Await `poll` until `is_target` accepts the state it reports.
///
/// Sleeps between polls with the policy's backoff. A failed poll ends the
/// wait with that error. Running out of attempts or time gives
/// [`BridgeError::WaitExhausted`]; cancelling gives
/// [`BridgeError::Cancelled`], dropping the in-flight poll.
pub async fn wait_for_state<P, F>(
    mut poll: P,
    is_target: impl Fn(ObjectState) -> bool,
    policy: &WaitPolicy,
    cancel: Option<&CancelToken>,
) -> BridgeResult<ObjectState>
where
    P: FnMut() -> F,
    F: Future<Output = BridgeResult<ObjectState>>,
{
    let started = Instant::now();
    let mut delay = policy.initial_delay;
    let mut attempts = 0u32;

    loop {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(BridgeError::Cancelled);
        }

        attempts += 1;
        let state = or_cancelled(cancel, poll()).await??;
        if is_target(state) {
            debug!(%state, attempts, "Reached target state");
            return Ok(state);
        }

        let out_of_attempts = policy.max_attempts.is_some_and(|max| attempts >= max);
        let out_of_time = policy
            .deadline
            .is_some_and(|deadline| started.elapsed().saturating_add(delay) > deadline);
        if out_of_attempts || out_of_time {
            return Err(BridgeError::WaitExhausted {
                last_state: Some(state),
                attempts,
            });
        }

        debug!(%state, attempts, ?delay, "Waiting for state change");
        or_cancelled(cancel, sleep(delay)).await?;
        delay = policy.next_delay(delay);
    }
}
