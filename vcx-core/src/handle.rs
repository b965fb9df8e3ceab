//! Command handle allocation.
//!
//! A command handle is the `u32` correlation id passed to every async libvcx
//! entry point and echoed back as the first callback argument. The top byte
//! carries the owning session's route tag so the C callback can find its
//! registry; the low 24 bits are a sequence that wraps. A session that
//! reuses a tag picks the sequence up where the previous holder left it.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{BridgeError, BridgeResult};
use crate::registry::Registry;

const SEQUENCE_BITS: u32 = 24;

/// Mask selecting the sequence part of a command handle.
pub const SEQUENCE_MASK: u32 = (1 << SEQUENCE_BITS) - 1;

/// Correlation id linking an issued call to its callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandHandle(u32);

impl CommandHandle {
    /// Wrap a raw handle received from C.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub(crate) fn compose(tag: u8, sequence: u32) -> Self {
        Self((u32::from(tag) << SEQUENCE_BITS) | (sequence & SEQUENCE_MASK))
    }

    /// Raw value handed to C.
    pub fn as_raw(self) -> u32 {
        self.0
    }

    /// Route tag of the session that issued this handle.
    pub fn route_tag(self) -> u8 {
        (self.0 >> SEQUENCE_BITS) as u8
    }

    /// Per-session sequence number.
    pub fn sequence(self) -> u32 {
        self.0 & SEQUENCE_MASK
    }
}

impl fmt::Display for CommandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues command handles for one session.
#[derive(Debug)]
pub struct HandleAllocator {
    tag: u8,
    next: AtomicU32,
}

impl HandleAllocator {
    /// Create an allocator for the given route tag.
    pub fn new(tag: u8) -> Self {
        Self::starting_at(tag, 1)
    }

    /// Create an allocator whose first candidate is `sequence`.
    pub fn starting_at(tag: u8, sequence: u32) -> Self {
        Self {
            tag,
            next: AtomicU32::new(sequence & SEQUENCE_MASK),
        }
    }

    /// Route tag stamped on every issued handle.
    pub fn tag(&self) -> u8 {
        self.tag
    }

    /// Sequence the next candidate is drawn from.
    pub fn resume_point(&self) -> u32 {
        self.next.load(Ordering::Relaxed) & SEQUENCE_MASK
    }

    /// Next candidate from the counter, skipping sequence zero.
    fn candidate(&self) -> CommandHandle {
        loop {
            let sequence = self.next.fetch_add(1, Ordering::Relaxed) & SEQUENCE_MASK;
            if sequence != 0 {
                return CommandHandle::compose(self.tag, sequence);
            }
        }
    }

    /// Return a handle that is not pending in `registry` at the moment of return.
    ///
    /// After the sequence wraps, candidates still held by long-running calls
    /// are skipped. Fails only when the whole sequence space is pending.
    pub fn next_id(&self, registry: &Registry) -> BridgeResult<CommandHandle> {
        for _ in 0..SEQUENCE_MASK {
            let candidate = self.candidate();
            if !registry.contains(candidate) {
                return Ok(candidate);
            }
            tracing::debug!(
                command_handle = %candidate,
                "Skipping command handle still pending after wraparound"
            );
        }
        Err(BridgeError::HandlesExhausted(self.tag))
    }
}
