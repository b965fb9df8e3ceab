//! Error types and native error codes for the bridge.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::handle::CommandHandle;
use crate::native::ObjectKind;
use crate::payload::ResultShape;
use crate::state::ObjectState;

/// Message rendered for any code libvcx has not classified.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown Error";

/// Message rendered for code zero.
pub const SUCCESS_MESSAGE: &str = "Success";

/// Numeric error code returned by libvcx. Zero is success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub u32);

impl ErrorCode {
    pub const SUCCESS: Self = Self(0);
    pub const UNKNOWN_ERROR: Self = Self(1001);
    pub const INVALID_CONNECTION_HANDLE: Self = Self(1003);
    pub const NOT_READY: Self = Self(1005);
    pub const INVALID_OPTION: Self = Self(1007);
    pub const INVALID_ISSUER_CREDENTIAL_HANDLE: Self = Self(1015);
    pub const INVALID_JSON: Self = Self(1016);
    pub const INVALID_PROOF_HANDLE: Self = Self(1017);
    pub const INVALID_HANDLE: Self = Self(1048);
    pub const INVALID_DISCLOSED_PROOF_HANDLE: Self = Self(1049);
    pub const INVALID_CREDENTIAL_HANDLE: Self = Self(1053);
    pub const INVALID_STATE: Self = Self(1081);
    pub const ACTION_NOT_SUPPORTED: Self = Self(1103);
    pub const INVALID_INPUT: Self = Self(1115);
    /// Raised by libvcx itself when an internal libindy callback times out.
    pub const TIMEOUT: Self = Self(5555);

    /// Whether this code denotes success.
    pub fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for ErrorCode {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

impl From<ErrorCode> for u32 {
    fn from(code: ErrorCode) -> u32 {
        code.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bridge errors.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The callback fired with a nonzero code.
    #[error("native error {code}: {message}")]
    Native { code: ErrorCode, message: String },

    /// The entry point refused the call before any callback could fire.
    #[error("{operation} rejected with {code}: {message}")]
    Rejected {
        operation: &'static str,
        code: ErrorCode,
        message: String,
    },

    /// The call outlived its deadline. A late callback is dropped.
    #[error("{operation} (command {command_handle}) timed out after {elapsed:?}")]
    Timeout {
        command_handle: CommandHandle,
        operation: &'static str,
        elapsed: Duration,
    },

    /// The pending call was cancelled by its owner.
    #[error("call cancelled")]
    Cancelled,

    /// The bridge session was torn down while the call was pending.
    #[error("bridge session closed")]
    SessionClosed,

    /// The callback payload does not match the shape the call site expects.
    #[error("result shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: ResultShape,
        actual: ResultShape,
    },

    /// A command handle was registered twice.
    #[error("command handle {0} is already pending")]
    DuplicateCommandHandle(CommandHandle),

    /// Every command handle in the session's sequence space is pending.
    #[error("no free command handle for route tag {0}")]
    HandlesExhausted(u8),

    /// Every callback route tag is held by a live session.
    #[error("callback route table is full")]
    RouteTableFull,

    /// A parameter failed its precondition check.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// A string argument cannot cross the C boundary.
    #[error("string `{name}` contains an interior NUL byte")]
    InvalidString { name: &'static str },

    /// Releasing a native object handle failed.
    #[error("releasing {kind} handle {handle} failed with {code}: {message}")]
    Release {
        kind: ObjectKind,
        handle: u32,
        code: ErrorCode,
        message: String,
    },

    /// A state wait gave up before reaching its target.
    #[error("state wait gave up after {attempts} attempts (last state {last_state:?})")]
    WaitExhausted {
        last_state: Option<ObjectState>,
        attempts: u32,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    /// Native code carried by this error, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Native { code, .. } | Self::Rejected { code, .. } | Self::Release { code, .. } => {
                Some(*code)
            }
            _ => None,
        }
    }

    /// Whether the error came from libvcx rather than from the bridge.
    pub fn is_native(&self) -> bool {
        self.code().is_some()
    }
}

/// Result type alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
