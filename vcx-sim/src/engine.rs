//! The simulated library: synchronous validation on the caller's thread,
//! execution and callbacks on a pool of worker threads.

use std::ffi::CString;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, warn};
use vcx_core::native::to_c_string;
use vcx_core::{CallbackFn, CommandHandle, ErrorCode, NativeCall, NativeLibrary, ObjectKind, Payload};

use crate::config::SimConfig;
use crate::objects::{ObjectTable, Wallets};
use crate::operations::{execute, precheck};
use crate::protocol::message_for;

struct Job {
    call: NativeCall,
    command: CommandHandle,
    cb: CallbackFn,
}

/// Counters describing what the simulator did.
#[derive(Debug, Default)]
pub struct SimStats {
    /// Calls accepted for asynchronous execution.
    pub accepted: AtomicU64,
    /// Calls refused synchronously.
    pub rejected: AtomicU64,
    /// Callbacks fired, duplicates included.
    pub fired: AtomicU64,
    /// Callbacks withheld on purpose.
    pub dropped: AtomicU64,
}

struct Inner {
    config: SimConfig,
    table: ObjectTable,
    wallets: Wallets,
    stats: SimStats,
}

/// In-process stand-in for libvcx.
pub struct SimLibrary {
    inner: Arc<Inner>,
    jobs: Mutex<Option<mpsc::Sender<Job>>>,
}

impl SimLibrary {
    /// Start the worker pool.
    pub fn new(config: SimConfig) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let inner = Arc::new(Inner {
            config,
            table: ObjectTable::new(),
            wallets: Wallets::default(),
            stats: SimStats::default(),
        });

        for index in 0..inner.config.workers.max(1) {
            let receiver = Arc::clone(&receiver);
            let inner = Arc::clone(&inner);
            let spawned = thread::Builder::new()
                .name(format!("vcx-sim-{index}"))
                .spawn(move || worker(inner, receiver));
            if let Err(err) = spawned {
                warn!(error = %err, index, "Failed to start simulator worker");
            }
        }

        Self {
            inner,
            jobs: Mutex::new(Some(sender)),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> &SimStats {
        &self.inner.stats
    }

    /// Number of native objects not yet released.
    pub fn live_objects(&self) -> usize {
        self.inner.table.len()
    }

    /// Number of live objects of `kind`.
    pub fn live_objects_of(&self, kind: ObjectKind) -> usize {
        self.inner.table.count(kind)
    }

    /// Stop accepting jobs. Workers exit once the queue drains.
    pub fn stop(&self) {
        self.jobs.lock().take();
    }
}

impl Default for SimLibrary {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Drop for SimLibrary {
    fn drop(&mut self) {
        // Workers are detached; they may be the thread dropping us.
        self.stop();
    }
}

fn worker(inner: Arc<Inner>, receiver: Arc<Mutex<mpsc::Receiver<Job>>>) {
    loop {
        let job = receiver.lock().recv();
        match job {
            Ok(job) => run(&inner, job),
            Err(_) => break,
        }
    }
    debug!("Simulator worker stopped");
}

fn delay(config: &SimConfig) -> Duration {
    let jitter_ms = config.jitter.as_millis() as u64;
    let extra = if jitter_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=jitter_ms)
    };
    config.latency + Duration::from_millis(extra)
}

fn run(inner: &Inner, job: Job) {
    let config = &inner.config;
    let operation = job.call.name();

    let pause = delay(config);
    if !pause.is_zero() {
        thread::sleep(pause);
    }

    let outcome = match config.failures.get(operation) {
        Some(code) => Err(*code),
        None => contained(operation, || {
            execute(&inner.table, &inner.wallets, &job.call).map_err(|err| {
                debug!(operation, error = %err, "Simulated operation failed");
                err.code()
            })
        }),
    };

    if config.dropped.contains(operation) {
        inner.stats.dropped.fetch_add(1, Ordering::Relaxed);
        debug!(command_handle = %job.command, operation, "Withholding callback");
        return;
    }

    let deliveries = if config.duplicate_callbacks { 2 } else { 1 };
    for _ in 0..deliveries {
        fire(job.cb, job.command.as_raw(), &outcome);
        inner.stats.fired.fetch_add(1, Ordering::Relaxed);
    }
}

/// Run `f` on a worker, reporting a panic as `UNKNOWN_ERROR` so the
/// callback still fires and the worker lives on.
fn contained(
    operation: &'static str,
    f: impl FnOnce() -> Result<Payload, ErrorCode>,
) -> Result<Payload, ErrorCode> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        warn!(operation, "Simulated operation panicked");
        Err(ErrorCode::UNKNOWN_ERROR)
    })
}

fn text(payload: Option<&String>) -> Option<CString> {
    payload.map(|value| to_c_string("result", value).unwrap_or_default())
}

/// Invoke `cb` the way libvcx would: zeroed values on failure.
fn fire(cb: CallbackFn, command: u32, outcome: &Result<Payload, ErrorCode>) {
    let (err, payload) = match outcome {
        Ok(payload) => (0, Some(payload)),
        Err(code) => (code.0, None),
    };
    let ptr = |value: &Option<CString>| value.as_ref().map_or(std::ptr::null(), |v| v.as_ptr());

    match cb {
        CallbackFn::Unit(f) => f(command, err),
        CallbackFn::Handle(f) => {
            let handle = match payload {
                Some(Payload::Handle(handle)) => *handle,
                _ => 0,
            };
            f(command, err, handle)
        }
        CallbackFn::String(f) => {
            let value = text(match payload {
                Some(Payload::String(value)) => Some(value),
                _ => None,
            });
            f(command, err, ptr(&value))
        }
        CallbackFn::State(f) => {
            let state = match payload {
                Some(Payload::State(state)) => *state,
                _ => 0,
            };
            f(command, err, state)
        }
        CallbackFn::Bool(f) => {
            let flag = matches!(payload, Some(Payload::Bool(true)));
            f(command, err, flag)
        }
        CallbackFn::HandleAndBool(f) => {
            let (handle, found) = match payload {
                Some(Payload::HandleAndBool(handle, found)) => (*handle, *found),
                _ => (0, false),
            };
            f(command, err, handle, found)
        }
        CallbackFn::StateAndString(f) => {
            let (state, value) = match payload {
                Some(Payload::StateAndString(state, value)) => (*state, text(Some(value))),
                _ => (0, None),
            };
            f(command, err, state, ptr(&value))
        }
    }
}

impl NativeLibrary for SimLibrary {
    fn invoke(&self, call: &NativeCall, command: CommandHandle, cb: CallbackFn) -> ErrorCode {
        let operation = call.name();
        let inner = &self.inner;

        let refused = inner
            .config
            .rejections
            .get(operation)
            .copied()
            .or_else(|| precheck(&inner.table, call, inner.config.reject_blank));
        if let Some(code) = refused {
            inner.stats.rejected.fetch_add(1, Ordering::Relaxed);
            debug!(command_handle = %command, operation, code = code.0, "Refusing call");
            return code;
        }

        let job = Job {
            call: call.clone(),
            command,
            cb,
        };
        let sent = match self.jobs.lock().as_ref() {
            Some(sender) => sender.send(job).is_ok(),
            None => false,
        };
        if !sent {
            warn!(command_handle = %command, operation, "Simulator stopped; refusing call");
            return ErrorCode::UNKNOWN_ERROR;
        }

        inner.stats.accepted.fetch_add(1, Ordering::Relaxed);
        ErrorCode::SUCCESS
    }

    fn error_message(&self, code: ErrorCode) -> Option<String> {
        message_for(code).map(str::to_string)
    }

    fn release(&self, kind: ObjectKind, handle: u32) -> ErrorCode {
        if self.inner.table.remove(kind, handle) {
            debug!(%kind, handle, "Released simulated object");
            ErrorCode::SUCCESS
        } else {
            kind.invalid_handle_code()
        }
    }

    fn version(&self) -> String {
        format!("{}-sim", env!("CARGO_PKG_VERSION"))
    }

    fn shutdown(&self, delete_wallet: bool) -> ErrorCode {
        let cleared = self.inner.table.clear();
        self.inner.wallets.shutdown(delete_wallet);
        debug!(cleared, delete_wallet, "Simulator shut down");
        ErrorCode::SUCCESS
    }
}
