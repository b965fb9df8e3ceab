//! # vcx-core
//!
//! Async command-correlation bridge for the libvcx C ABI.
//!
//! Every async libvcx entry point takes a command handle and a C callback.
//! This crate issues the handles, keeps one pending completion per handle,
//! routes callbacks arriving on native threads back to their caller exactly
//! once, and translates native error codes into [`BridgeError`]s.

pub mod bridge;
pub mod callback;
pub mod config;
pub mod error;
pub mod handle;
#[cfg(feature = "libvcx")]
pub mod libvcx;
pub mod native;
pub mod payload;
pub mod registry;
pub mod state;
pub mod translate;

pub use bridge::{Bridge, BridgeStats, PendingResult};
pub use config::{BridgeConfig, MIN_SWEEP_INTERVAL};
pub use error::{BridgeError, BridgeResult, ErrorCode, SUCCESS_MESSAGE, UNKNOWN_ERROR_MESSAGE};
pub use handle::{CommandHandle, HandleAllocator};
#[cfg(feature = "libvcx")]
pub use libvcx::LibVcx;
pub use native::{CallbackFn, NativeCall, NativeLibrary, ObjectKind};
pub use payload::{FromPayload, Payload, RawHandle, ResultShape};
pub use registry::{PendingCall, Registry, RegistryStats};
pub use state::ObjectState;
