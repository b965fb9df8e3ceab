//! Protocol state codes surfaced by libvcx.
//!
//! The native library owns every protocol state machine. The binding only
//! carries the current state as an integer; the named constants exist so
//! callers can say what they are waiting for, not to validate transitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// State code reported by an `update_state`/`get_state` callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectState(pub u32);

impl ObjectState {
    pub const NONE: Self = Self(0);
    pub const INITIALIZED: Self = Self(1);
    pub const OFFER_SENT: Self = Self(2);
    pub const REQUEST_RECEIVED: Self = Self(3);
    pub const ACCEPTED: Self = Self(4);
    pub const UNFULFILLED: Self = Self(5);
    pub const EXPIRED: Self = Self(6);
    pub const REVOKED: Self = Self(7);

    /// Raw code.
    pub fn code(self) -> u32 {
        self.0
    }

    /// Conventional name for the code, if it has one.
    pub fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("None"),
            1 => Some("Initialized"),
            2 => Some("OfferSent"),
            3 => Some("RequestReceived"),
            4 => Some("Accepted"),
            5 => Some("Unfulfilled"),
            6 => Some("Expired"),
            7 => Some("Revoked"),
            _ => None,
        }
    }
}

impl From<u32> for ObjectState {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

impl fmt::Display for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}
