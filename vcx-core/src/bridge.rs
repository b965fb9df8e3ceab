//! Bridge session: one native library, one registry, one route tag.

use std::future::{Future, IntoFuture};
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::callback;
use crate::config::{BridgeConfig, MIN_SWEEP_INTERVAL};
use crate::error::{BridgeError, BridgeResult, ErrorCode};
use crate::handle::{CommandHandle, HandleAllocator};
use crate::native::{CallbackFn, NativeCall, NativeLibrary, ObjectKind};
use crate::payload::{FromPayload, Payload};
use crate::registry::{Outcome, PendingCall, Registry};
use crate::translate;

/// State shared by every clone of a [`Bridge`] and reachable from callbacks
/// through the route table.
pub(crate) struct Shared {
    tag: u8,
    allocator: HandleAllocator,
    registry: Registry,
    native: Arc<dyn NativeLibrary>,
    closed: AtomicBool,
}

impl Shared {
    /// Deliver a callback to its pending call, if it is still pending.
    pub(crate) fn complete(&self, command: CommandHandle, code: ErrorCode, payload: Payload) {
        if let Some(call) = self.registry.take(command) {
            translate::resolve(command, call, code, payload, &|code| {
                self.native.error_message(code)
            });
        }
    }

    fn message(&self, code: ErrorCode) -> String {
        translate::render_message(code, &|code| self.native.error_message(code))
    }

    fn close(&self) -> usize {
        self.closed.store(true, Ordering::Release);
        self.registry.drain()
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        callback::unroute(self.tag, self.allocator.resume_point());
        let failed = self.registry.drain();
        if failed > 0 {
            warn!(route_tag = self.tag, failed, "Bridge dropped with pending calls");
        }
    }
}

/// Snapshot of a session's registry counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BridgeStats {
    pub pending: usize,
    pub registered: u64,
    pub completed: u64,
    pub orphaned: u64,
    pub timeouts: u64,
    pub cancelled: u64,
    pub closed: u64,
}

/// A session with a native library.
///
/// Cheap to clone; all clones share the registry. The session ends when the
/// last clone is dropped, failing whatever is still pending with
/// [`BridgeError::SessionClosed`].
#[derive(Clone)]
pub struct Bridge {
    shared: Arc<Shared>,
    config: BridgeConfig,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("route_tag", &self.shared.tag)
            .field("pending", &self.shared.registry.pending_count())
            .field("config", &self.config)
            .finish()
    }
}

impl Bridge {
    /// Open a session with the default configuration.
    pub fn new(native: Arc<dyn NativeLibrary>) -> BridgeResult<Self> {
        Self::with_config(native, BridgeConfig::default())
    }

    /// Open a session, claiming a callback route tag.
    pub fn with_config(native: Arc<dyn NativeLibrary>, config: BridgeConfig) -> BridgeResult<Self> {
        let (tag, sequence) = callback::reserve_route()?;
        let shared = Arc::new(Shared {
            tag,
            allocator: HandleAllocator::starting_at(tag, sequence),
            registry: Registry::new(),
            native,
            closed: AtomicBool::new(false),
        });
        callback::bind_route(tag, &shared);
        debug!(route_tag = tag, "Opened bridge session");

        Ok(Self { shared, config })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Route tag carried in the top byte of this session's command handles.
    pub fn route_tag(&self) -> u8 {
        self.shared.tag
    }

    /// Issue `call` with the configured deadline.
    pub fn call<T: FromPayload>(&self, call: NativeCall) -> BridgeResult<PendingResult<T>> {
        self.call_with_timeout(call, self.config.call_timeout)
    }

    /// Issue `call`, failing it with a timeout after `timeout` if given.
    ///
    /// A synchronous rejection by the native entry point is returned here and
    /// leaves no pending entry behind.
    pub fn call_with_timeout<T: FromPayload>(
        &self,
        call: NativeCall,
        timeout: Option<Duration>,
    ) -> BridgeResult<PendingResult<T>> {
        let shared = &self.shared;
        if shared.closed.load(Ordering::Acquire) {
            return Err(BridgeError::SessionClosed);
        }

        let shape = call.shape();
        if shape != T::SHAPE {
            return Err(BridgeError::ShapeMismatch {
                expected: T::SHAPE,
                actual: shape,
            });
        }
        let operation = call.name();

        let (command, receiver) = loop {
            let id = shared.allocator.next_id(&shared.registry)?;
            let (sink, receiver) = oneshot::channel();
            let mut pending = PendingCall::new(sink, shape, operation);
            if let Some(limit) = timeout {
                pending = pending.with_timeout(limit);
            }
            match shared.registry.register(id, pending) {
                Ok(()) => break (id, receiver),
                // Another thread claimed the id between check and insert.
                Err(BridgeError::DuplicateCommandHandle(_)) => continue,
                Err(err) => return Err(err),
            }
        };

        if shared.closed.load(Ordering::Acquire) {
            shared.registry.retract(command);
            return Err(BridgeError::SessionClosed);
        }

        let code = shared
            .native
            .invoke(&call, command, CallbackFn::for_shape(shape));
        if !code.is_success() {
            shared.registry.retract(command);
            let message = shared.message(code);
            warn!(
                command_handle = %command,
                operation,
                code = code.0,
                %message,
                "Native call rejected"
            );
            return Err(BridgeError::Rejected {
                operation,
                code,
                message,
            });
        }

        debug!(command_handle = %command, operation, "Issued native call");
        Ok(PendingResult {
            command,
            operation,
            receiver,
            timeout,
            session: Arc::downgrade(shared),
            _result: PhantomData,
        })
    }

    /// Free a native object. Synchronous; there is no callback.
    pub fn release(&self, kind: ObjectKind, handle: u32) -> BridgeResult<()> {
        let code = self.shared.native.release(kind, handle);
        if code.is_success() {
            debug!(%kind, handle, "Released native object");
            return Ok(());
        }
        Err(BridgeError::Release {
            kind,
            handle,
            code,
            message: self.shared.message(code),
        })
    }

    /// Human-readable message for a native error code.
    pub fn error_message(&self, code: ErrorCode) -> String {
        self.shared.message(code)
    }

    /// Reject every call past its deadline. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.shared.registry.remove_expired()
    }

    /// Run [`sweep_expired`](Self::sweep_expired) every `sweep_interval`
    /// until the session ends.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let session = Arc::downgrade(&self.shared);
        let period = self.config.sweep_interval.max(MIN_SWEEP_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let Some(shared) = session.upgrade() else {
                    break;
                };
                let removed = shared.registry.remove_expired();
                if removed > 0 {
                    debug!(route_tag = shared.tag, removed, "Swept expired calls");
                }
            }
        })
    }

    /// Cancel a pending call. Its future resolves with `Cancelled`.
    pub fn cancel(&self, command: CommandHandle) -> bool {
        self.shared.registry.cancel(command)
    }

    /// Number of calls still waiting for a callback.
    pub fn pending_count(&self) -> usize {
        self.shared.registry.pending_count()
    }

    /// Age of the oldest pending call.
    pub fn oldest_pending_age(&self) -> Option<Duration> {
        self.shared.registry.oldest_pending_age()
    }

    pub fn stats(&self) -> BridgeStats {
        let stats = self.shared.registry.stats();
        BridgeStats {
            pending: self.pending_count(),
            registered: stats.total_registered.load(Ordering::Relaxed),
            completed: stats.total_completed.load(Ordering::Relaxed),
            orphaned: stats.total_orphaned.load(Ordering::Relaxed),
            timeouts: stats.total_timeouts.load(Ordering::Relaxed),
            cancelled: stats.total_cancelled.load(Ordering::Relaxed),
            closed: stats.total_closed.load(Ordering::Relaxed),
        }
    }

    /// Refuse new calls and fail pending ones with `SessionClosed`.
    pub fn close(&self) -> usize {
        let failed = self.shared.close();
        info!(route_tag = self.shared.tag, failed, "Closed bridge session");
        failed
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Native library version.
    pub fn version(&self) -> String {
        self.shared.native.version()
    }

    /// Shut the native library down and close this session.
    pub fn shutdown(&self, delete_wallet: bool) -> BridgeResult<()> {
        let code = self.shared.native.shutdown(delete_wallet);
        self.close();
        if code.is_success() {
            return Ok(());
        }
        Err(BridgeError::Rejected {
            operation: "vcx_shutdown",
            code,
            message: self.shared.message(code),
        })
    }
}

/// Result of an issued call, resolved by its callback.
///
/// Await it directly or through [`wait`](Self::wait). Dropping it does not
/// cancel the native operation; its callback is absorbed when it arrives.
#[must_use = "the call's outcome is only observed by awaiting it"]
pub struct PendingResult<T> {
    command: CommandHandle,
    operation: &'static str,
    receiver: oneshot::Receiver<Outcome>,
    timeout: Option<Duration>,
    session: Weak<Shared>,
    _result: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for PendingResult<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingResult")
            .field("command", &self.command)
            .field("operation", &self.operation)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<T: FromPayload> PendingResult<T> {
    /// Command handle the call was issued under.
    pub fn command_handle(&self) -> CommandHandle {
        self.command
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Wait for the callback.
    pub async fn wait(mut self) -> BridgeResult<T> {
        let received = match self.timeout {
            None => (&mut self.receiver).await,
            Some(limit) => match tokio::time::timeout(limit, &mut self.receiver).await {
                Ok(received) => received,
                Err(_) => {
                    let expired = self
                        .session
                        .upgrade()
                        .and_then(|shared| shared.registry.expire(self.command));
                    match expired {
                        Some(call) => {
                            return Err(BridgeError::Timeout {
                                command_handle: self.command,
                                operation: self.operation,
                                elapsed: call.age(),
                            })
                        }
                        // The callback or the sweeper got there first.
                        None => (&mut self.receiver).await,
                    }
                }
            },
        };

        let payload = received.map_err(|_| BridgeError::SessionClosed)??;
        T::from_payload(payload)
    }
}

impl<T: FromPayload> IntoFuture for PendingResult<T> {
    type Output = BridgeResult<T>;
    type IntoFuture = Pin<Box<dyn Future<Output = BridgeResult<T>> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::RawHandle;
    use crate::state::ObjectState;
    use std::ffi::CString;
    use std::sync::Mutex;

    #[derive(Clone, Copy)]
    enum Mode {
        /// Fire from another thread.
        Threaded,
        /// Fire before `invoke` returns.
        Inline,
        /// Fire twice.
        Twice,
        /// Never fire.
        Silent,
        /// Refuse synchronously.
        Reject(u32),
        /// Fire with an error code.
        Fail(u32),
    }

    struct FakeNative {
        mode: Mode,
        released: Mutex<Vec<(ObjectKind, u32)>>,
    }

    impl FakeNative {
        fn new(mode: Mode) -> Arc<Self> {
            Arc::new(Self {
                mode,
                released: Mutex::new(Vec::new()),
            })
        }
    }

    fn fire(cb: CallbackFn, command: u32, err: u32) {
        let text = CString::new("hello").unwrap();
        match cb {
            CallbackFn::Unit(f) => f(command, err),
            CallbackFn::Handle(f) => f(command, err, 7),
            CallbackFn::String(f) => f(command, err, text.as_ptr()),
            CallbackFn::State(f) => f(command, err, 4),
            CallbackFn::Bool(f) => f(command, err, true),
            CallbackFn::HandleAndBool(f) => f(command, err, 7, true),
            CallbackFn::StateAndString(f) => f(command, err, 4, text.as_ptr()),
        }
    }

    impl NativeLibrary for FakeNative {
        fn invoke(&self, _call: &NativeCall, command: CommandHandle, cb: CallbackFn) -> ErrorCode {
            let raw = command.as_raw();
            match self.mode {
                Mode::Threaded => {
                    std::thread::spawn(move || {
                        std::thread::sleep(Duration::from_millis(2));
                        fire(cb, raw, 0);
                    });
                }
                Mode::Inline => fire(cb, raw, 0),
                Mode::Twice => {
                    std::thread::spawn(move || {
                        fire(cb, raw, 0);
                        fire(cb, raw, 0);
                    });
                }
                Mode::Silent => {}
                Mode::Reject(code) => return ErrorCode(code),
                Mode::Fail(code) => {
                    std::thread::spawn(move || fire(cb, raw, code));
                }
            }
            ErrorCode::SUCCESS
        }

        fn error_message(&self, code: ErrorCode) -> Option<String> {
            match code.0 {
                0 => Some("Success".into()),
                1007 => Some("Invalid Option".into()),
                1081 => Some("Object is in invalid state for requested operation".into()),
                _ => None,
            }
        }

        fn release(&self, kind: ObjectKind, handle: u32) -> ErrorCode {
            if handle == 0 {
                return kind.invalid_handle_code();
            }
            self.released.lock().unwrap().push((kind, handle));
            ErrorCode::SUCCESS
        }

        fn version(&self) -> String {
            "0.0.0-fake".into()
        }

        fn shutdown(&self, _delete_wallet: bool) -> ErrorCode {
            ErrorCode::SUCCESS
        }
    }

    fn serialize(handle: u32) -> NativeCall {
        NativeCall::Serialize {
            kind: ObjectKind::Connection,
            handle,
        }
    }

    #[tokio::test]
    async fn string_round_trip() {
        let bridge = Bridge::new(FakeNative::new(Mode::Threaded)).unwrap();
        let value: String = bridge.call(serialize(1)).unwrap().await.unwrap();
        assert_eq!(value, "hello");
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test]
    async fn unit_round_trip() {
        let bridge = Bridge::new(FakeNative::new(Mode::Threaded)).unwrap();
        bridge
            .call::<()>(NativeCall::CloseMainWallet)
            .unwrap()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn callback_before_invoke_returns() {
        let bridge = Bridge::new(FakeNative::new(Mode::Inline)).unwrap();
        let handle: RawHandle = bridge
            .call(NativeCall::ConnectionCreate {
                source_id: "alice".into(),
            })
            .unwrap()
            .await
            .unwrap();
        assert_eq!(handle, RawHandle(7));
    }

    #[tokio::test]
    async fn command_handles_carry_route_tag() {
        let bridge = Bridge::new(FakeNative::new(Mode::Silent)).unwrap();
        let pending = bridge.call::<String>(serialize(1)).unwrap();
        assert_eq!(pending.command_handle().route_tag(), bridge.route_tag());
        assert_ne!(pending.command_handle().as_raw(), 0);
        assert!(bridge.cancel(pending.command_handle()));
        assert!(matches!(pending.await, Err(BridgeError::Cancelled)));
    }

    #[tokio::test]
    async fn sync_rejection_leaves_no_entry() {
        let bridge = Bridge::new(FakeNative::new(Mode::Reject(1007))).unwrap();
        let err = bridge.call::<String>(serialize(1)).unwrap_err();
        match err {
            BridgeError::Rejected {
                operation,
                code,
                message,
            } => {
                assert_eq!(operation, "vcx_connection_serialize");
                assert_eq!(code, ErrorCode::INVALID_OPTION);
                assert_eq!(message, "Invalid Option");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(bridge.pending_count(), 0);
        assert_eq!(bridge.stats().cancelled, 1);
    }

    #[tokio::test]
    async fn async_failure_is_translated() {
        let bridge = Bridge::new(FakeNative::new(Mode::Fail(1081))).unwrap();
        let err = bridge
            .call::<ObjectState>(NativeCall::GetState {
                kind: ObjectKind::Connection,
                handle: 1,
            })
            .unwrap()
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::INVALID_STATE));

        let err = Bridge::new(FakeNative::new(Mode::Fail(1001)))
            .unwrap()
            .call::<String>(serialize(1))
            .unwrap()
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Native { ref message, .. } if message == "Unknown Error"));
    }

    #[tokio::test]
    async fn wrong_result_type_is_refused_up_front() {
        let bridge = Bridge::new(FakeNative::new(Mode::Threaded)).unwrap();
        let err = bridge.call::<RawHandle>(serialize(1)).unwrap_err();
        assert!(matches!(err, BridgeError::ShapeMismatch { .. }));
        assert_eq!(bridge.stats().registered, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn no_leaks_after_many_calls() {
        let bridge = Bridge::new(FakeNative::new(Mode::Threaded)).unwrap();
        let calls: Vec<_> = (0..200)
            .map(|i| {
                let bridge = bridge.clone();
                tokio::spawn(async move { bridge.call::<String>(serialize(i)).unwrap().await })
            })
            .collect();
        for call in calls {
            assert_eq!(call.await.unwrap().unwrap(), "hello");
        }
        assert_eq!(bridge.pending_count(), 0);
        assert_eq!(bridge.stats().completed, 200);
    }

    #[tokio::test]
    async fn duplicate_callback_is_an_orphan() {
        let bridge = Bridge::new(FakeNative::new(Mode::Twice)).unwrap();
        let value: String = bridge.call(serialize(1)).unwrap().await.unwrap();
        assert_eq!(value, "hello");

        // Let the second delivery land.
        for _ in 0..100 {
            if bridge.stats().orphaned == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let stats = bridge.stats();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.orphaned, 1);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn deadline_rejects_with_timeout() {
        let bridge = Bridge::with_config(
            FakeNative::new(Mode::Silent),
            BridgeConfig::default().with_call_timeout(Duration::from_millis(20)),
        )
        .unwrap();

        let pending = bridge.call::<String>(serialize(1)).unwrap();
        let command = pending.command_handle();
        match pending.await {
            Err(BridgeError::Timeout {
                command_handle,
                operation,
                ..
            }) => {
                assert_eq!(command_handle, command);
                assert_eq!(operation, "vcx_connection_serialize");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(bridge.pending_count(), 0);
        assert_eq!(bridge.stats().timeouts, 1);

        // A late callback is now an orphan.
        callback::on_string(command.as_raw(), 0, std::ptr::null());
        assert_eq!(bridge.stats().orphaned, 1);
    }

    #[tokio::test]
    async fn sweeper_expires_abandoned_calls() {
        let bridge = Bridge::with_config(
            FakeNative::new(Mode::Silent),
            BridgeConfig::default()
                .with_call_timeout(Duration::from_millis(10))
                .with_sweep_interval(Duration::from_millis(5)),
        )
        .unwrap();
        let sweeper = bridge.spawn_sweeper();

        drop(bridge.call::<String>(serialize(1)).unwrap());
        assert_eq!(bridge.pending_count(), 1);

        for _ in 0..100 {
            if bridge.pending_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(bridge.pending_count(), 0);
        assert_eq!(bridge.stats().timeouts, 1);

        drop(bridge);
        sweeper.await.unwrap();
    }

    #[tokio::test]
    async fn sweeper_survives_zero_interval() {
        let config = BridgeConfig {
            call_timeout: Some(Duration::from_millis(10)),
            sweep_interval: Duration::ZERO,
        };
        let bridge = Bridge::with_config(FakeNative::new(Mode::Silent), config).unwrap();
        let sweeper = bridge.spawn_sweeper();

        drop(bridge.call::<String>(serialize(1)).unwrap());
        for _ in 0..100 {
            if bridge.pending_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(bridge.pending_count(), 0);
        assert!(!sweeper.is_finished());

        drop(bridge);
        sweeper.await.unwrap();
    }

    #[tokio::test]
    async fn reused_tag_does_not_reissue_old_handles() {
        let first = Bridge::new(FakeNative::new(Mode::Silent)).unwrap();
        let tag = first.route_tag();
        let stale = first.call::<String>(serialize(1)).unwrap().command_handle();
        drop(first);

        let bridge = (0..1024)
            .map(|_| Bridge::new(FakeNative::new(Mode::Silent)).unwrap())
            .find(|bridge| bridge.route_tag() == tag)
            .expect("route tag comes around again");
        let fresh = bridge.call::<String>(serialize(1)).unwrap();
        assert!(fresh.command_handle().sequence() > stale.sequence());

        // The earlier session's callback lands on the new one and misses.
        callback::on_string(stale.as_raw(), 0, std::ptr::null());
        assert_eq!(bridge.pending_count(), 1);
        assert_eq!(bridge.stats().orphaned, 1);
    }

    #[tokio::test]
    async fn dropping_the_session_fails_pending_calls() {
        let bridge = Bridge::new(FakeNative::new(Mode::Silent)).unwrap();
        let pending = bridge.call::<String>(serialize(1)).unwrap();
        let clone = bridge.clone();

        drop(bridge);
        assert_eq!(clone.pending_count(), 1);

        drop(clone);
        assert!(matches!(pending.await, Err(BridgeError::SessionClosed)));
    }

    #[tokio::test]
    async fn closed_session_refuses_calls() {
        let bridge = Bridge::new(FakeNative::new(Mode::Silent)).unwrap();
        let pending = bridge.call::<String>(serialize(1)).unwrap();

        assert_eq!(bridge.close(), 1);
        assert!(bridge.is_closed());
        assert!(matches!(pending.await, Err(BridgeError::SessionClosed)));
        assert!(matches!(
            bridge.call::<String>(serialize(1)),
            Err(BridgeError::SessionClosed)
        ));
    }

    #[test]
    fn release_and_messages() {
        let native = FakeNative::new(Mode::Silent);
        let bridge = Bridge::new(native.clone()).unwrap();

        bridge.release(ObjectKind::Proof, 12).unwrap();
        assert_eq!(*native.released.lock().unwrap(), vec![(ObjectKind::Proof, 12)]);

        let err = bridge.release(ObjectKind::Proof, 0).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::INVALID_PROOF_HANDLE));

        assert_eq!(bridge.error_message(ErrorCode::SUCCESS), "Success");
        assert_eq!(bridge.error_message(ErrorCode(1001)), "Unknown Error");
        assert_eq!(bridge.version(), "0.0.0-fake");
    }

    #[test]
    fn sessions_get_distinct_tags() {
        let a = Bridge::new(FakeNative::new(Mode::Silent)).unwrap();
        let b = Bridge::new(FakeNative::new(Mode::Silent)).unwrap();
        assert_ne!(a.route_tag(), b.route_tag());
        assert_eq!(a.clone().route_tag(), a.route_tag());
    }
}
