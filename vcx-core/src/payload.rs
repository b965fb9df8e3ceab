//! Callback payloads and the shapes a call site can expect.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};
use crate::state::ObjectState;

/// Shape of the values a callback carries after `(command_handle, err)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultShape {
    /// No values; the call is fire-and-forget.
    Unit,
    /// A new object handle.
    Handle,
    /// A C string.
    String,
    /// A protocol state code.
    State,
    /// A boolean flag.
    Bool,
    /// A handle plus a "found" flag.
    HandleAndBool,
    /// A state code plus a C string.
    StateAndString,
}

/// Values delivered by a callback, copied out of C memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Unit,
    Handle(u32),
    String(String),
    State(u32),
    Bool(bool),
    HandleAndBool(u32, bool),
    StateAndString(u32, String),
}

impl Payload {
    /// Shape of this payload.
    pub fn shape(&self) -> ResultShape {
        match self {
            Self::Unit => ResultShape::Unit,
            Self::Handle(_) => ResultShape::Handle,
            Self::String(_) => ResultShape::String,
            Self::State(_) => ResultShape::State,
            Self::Bool(_) => ResultShape::Bool,
            Self::HandleAndBool(..) => ResultShape::HandleAndBool,
            Self::StateAndString(..) => ResultShape::StateAndString,
        }
    }

    fn mismatch(self, expected: ResultShape) -> BridgeError {
        BridgeError::ShapeMismatch {
            expected,
            actual: self.shape(),
        }
    }
}

/// Opaque native object handle as delivered by a create/deserialize callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawHandle(pub u32);

/// A typed value that can be extracted from a callback payload.
pub trait FromPayload: Sized + Send + 'static {
    /// Shape registered for calls resolving to this type.
    const SHAPE: ResultShape;

    /// Extract the value, rejecting payloads of any other shape.
    fn from_payload(payload: Payload) -> BridgeResult<Self>;
}

impl FromPayload for () {
    const SHAPE: ResultShape = ResultShape::Unit;

    fn from_payload(payload: Payload) -> BridgeResult<Self> {
        match payload {
            Payload::Unit => Ok(()),
            other => Err(other.mismatch(Self::SHAPE)),
        }
    }
}

impl FromPayload for RawHandle {
    const SHAPE: ResultShape = ResultShape::Handle;

    fn from_payload(payload: Payload) -> BridgeResult<Self> {
        match payload {
            Payload::Handle(handle) => Ok(RawHandle(handle)),
            other => Err(other.mismatch(Self::SHAPE)),
        }
    }
}

impl FromPayload for String {
    const SHAPE: ResultShape = ResultShape::String;

    fn from_payload(payload: Payload) -> BridgeResult<Self> {
        match payload {
            Payload::String(value) => Ok(value),
            other => Err(other.mismatch(Self::SHAPE)),
        }
    }
}

impl FromPayload for ObjectState {
    const SHAPE: ResultShape = ResultShape::State;

    fn from_payload(payload: Payload) -> BridgeResult<Self> {
        match payload {
            Payload::State(state) => Ok(ObjectState(state)),
            other => Err(other.mismatch(Self::SHAPE)),
        }
    }
}

impl FromPayload for bool {
    const SHAPE: ResultShape = ResultShape::Bool;

    fn from_payload(payload: Payload) -> BridgeResult<Self> {
        match payload {
            Payload::Bool(flag) => Ok(flag),
            other => Err(other.mismatch(Self::SHAPE)),
        }
    }
}

impl FromPayload for (RawHandle, bool) {
    const SHAPE: ResultShape = ResultShape::HandleAndBool;

    fn from_payload(payload: Payload) -> BridgeResult<Self> {
        match payload {
            Payload::HandleAndBool(handle, found) => Ok((RawHandle(handle), found)),
            other => Err(other.mismatch(Self::SHAPE)),
        }
    }
}

impl FromPayload for (ObjectState, String) {
    const SHAPE: ResultShape = ResultShape::StateAndString;

    fn from_payload(payload: Payload) -> BridgeResult<Self> {
        match payload {
            Payload::StateAndString(state, value) => Ok((ObjectState(state), value)),
            other => Err(other.mismatch(Self::SHAPE)),
        }
    }
}
