//! Failures of simulated operations and the libvcx codes they map to.

use thiserror::Error;
use vcx_core::{ErrorCode, ObjectKind, ObjectState};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("no {kind} with handle {handle}")]
    InvalidHandle { kind: ObjectKind, handle: u32 },

    #[error("{kind} in state {state} cannot {action}")]
    InvalidState {
        kind: ObjectKind,
        state: ObjectState,
        action: &'static str,
    },

    #[error("{0} is not ready")]
    NotReady(&'static str),

    #[error("invalid json: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("serialized object is a {found}, expected {expected}")]
    WrongKind {
        expected: ObjectKind,
        found: ObjectKind,
    },

    #[error("{0} data is not a JSON object")]
    MalformedData(ObjectKind),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("{0} is not supported")]
    NotSupported(&'static str),
}

impl SimError {
    /// Code the callback reports for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidHandle { kind, .. } => kind.invalid_handle_code(),
            Self::InvalidState { .. } => ErrorCode::INVALID_STATE,
            Self::NotReady(_) => ErrorCode::NOT_READY,
            Self::InvalidJson(_) | Self::WrongKind { .. } | Self::MalformedData(_) => {
                ErrorCode::INVALID_JSON
            }
            Self::InvalidOption(_) => ErrorCode::INVALID_OPTION,
            Self::NotSupported(_) => ErrorCode::ACTION_NOT_SUPPORTED,
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;
