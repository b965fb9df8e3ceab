//! C-ABI callback adapters and the session route table.
//!
//! libvcx invokes these functions on its own threads. They never block beyond
//! one registry removal and a string copy, and never unwind into C.

use std::ffi::{c_char, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::{error, warn};

use crate::bridge::Shared;
use crate::error::{BridgeError, BridgeResult, ErrorCode};
use crate::handle::CommandHandle;
use crate::native::CallbackFn;
use crate::payload::{Payload, ResultShape};

/// Route tag to session. Tag 0 is never handed out.
static ROUTES: Lazy<DashMap<u8, Weak<Shared>>> = Lazy::new(DashMap::new);

/// Where the next free-tag search starts, so a released tag is not reused
/// while later tags are still free.
static NEXT_TAG: AtomicU8 = AtomicU8::new(1);

/// Sequence a tag resumes from when another session claims it. A late
/// callback from an earlier holder of the tag then finds no pending call
/// until the 24-bit sequence wraps.
static RESUME: Lazy<DashMap<u8, u32>> = Lazy::new(DashMap::new);

static UNROUTED: AtomicU64 = AtomicU64::new(0);

/// Claim a free route tag and the sequence its allocator starts from. The
/// slot stays empty until [`bind_route`].
pub(crate) fn reserve_route() -> BridgeResult<(u8, u32)> {
    let start = NEXT_TAG.fetch_add(1, Ordering::Relaxed);
    for offset in 0..=u8::MAX {
        let tag = start.wrapping_add(offset);
        if tag == 0 {
            continue;
        }
        if let Entry::Vacant(slot) = ROUTES.entry(tag) {
            slot.insert(Weak::new());
            let sequence = RESUME.get(&tag).map_or(1, |resume| *resume);
            return Ok((tag, sequence));
        }
    }
    Err(BridgeError::RouteTableFull)
}

pub(crate) fn bind_route(tag: u8, shared: &Arc<Shared>) {
    ROUTES.insert(tag, Arc::downgrade(shared));
}

/// Free `tag`, remembering where its sequence stopped.
pub(crate) fn unroute(tag: u8, resume: u32) {
    RESUME.insert(tag, resume);
    ROUTES.remove(&tag);
}

/// Number of route tags held by live sessions.
pub fn live_routes() -> usize {
    ROUTES.len()
}

/// Callbacks that arrived for a route tag with no live session.
pub fn unrouted_callbacks() -> u64 {
    UNROUTED.load(Ordering::Relaxed)
}

fn session_for(command: CommandHandle) -> Option<Arc<Shared>> {
    ROUTES
        .get(&command.route_tag())
        .and_then(|weak| weak.upgrade())
}

/// Route one callback to its session. The payload is only built on success.
fn dispatch(raw: u32, err: u32, payload: impl FnOnce() -> Payload) {
    let result = catch_unwind(AssertUnwindSafe(|| {
        let command = CommandHandle::from_raw(raw);
        let code = ErrorCode(err);
        let payload = if code.is_success() { payload() } else { Payload::Unit };

        match session_for(command) {
            Some(session) => session.complete(command, code, payload),
            None => {
                UNROUTED.fetch_add(1, Ordering::Relaxed);
                warn!(
                    command_handle = %command,
                    route_tag = command.route_tag(),
                    code = code.0,
                    "Callback for a closed or unknown session dropped"
                );
            }
        }
    }));

    if result.is_err() {
        error!(command_handle = raw, "Panic caught in native callback");
    }
}

/// Copy a C string before returning to C. Null reads as empty.
fn copy_c_string(value: *const c_char) -> String {
    if value.is_null() {
        return String::new();
    }
    // SAFETY: libvcx passes a NUL-terminated string valid for the duration
    // of the callback.
    unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned()
}

pub extern "C" fn on_unit(command_handle: u32, err: u32) {
    dispatch(command_handle, err, || Payload::Unit);
}

pub extern "C" fn on_handle(command_handle: u32, err: u32, handle: u32) {
    dispatch(command_handle, err, || Payload::Handle(handle));
}

pub extern "C" fn on_string(command_handle: u32, err: u32, value: *const c_char) {
    dispatch(command_handle, err, || Payload::String(copy_c_string(value)));
}

pub extern "C" fn on_state(command_handle: u32, err: u32, state: u32) {
    dispatch(command_handle, err, || Payload::State(state));
}

pub extern "C" fn on_bool(command_handle: u32, err: u32, flag: bool) {
    dispatch(command_handle, err, || Payload::Bool(flag));
}

pub extern "C" fn on_handle_and_bool(command_handle: u32, err: u32, handle: u32, found: bool) {
    dispatch(command_handle, err, || Payload::HandleAndBool(handle, found));
}

pub extern "C" fn on_state_and_string(
    command_handle: u32,
    err: u32,
    state: u32,
    value: *const c_char,
) {
    dispatch(command_handle, err, || {
        Payload::StateAndString(state, copy_c_string(value))
    });
}

impl CallbackFn {
    /// The bridge's adapter for `shape`.
    pub fn for_shape(shape: ResultShape) -> Self {
        match shape {
            ResultShape::Unit => Self::Unit(on_unit),
            ResultShape::Handle => Self::Handle(on_handle),
            ResultShape::String => Self::String(on_string),
            ResultShape::State => Self::State(on_state),
            ResultShape::Bool => Self::Bool(on_bool),
            ResultShape::HandleAndBool => Self::HandleAndBool(on_handle_and_bool),
            ResultShape::StateAndString => Self::StateAndString(on_state_and_string),
        }
    }
}
