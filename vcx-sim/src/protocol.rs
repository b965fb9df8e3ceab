//! Protocol progression and error messages of the simulated library.
//!
//! Each family walks the state codes libvcx reports for it. Local actions
//! (connect, send offer, ...) move an object out of a waiting state; every
//! `update_state` moves it one step closer to `Accepted`.

use vcx_core::{ErrorCode, ObjectKind, ObjectState};

use crate::error::{SimError, SimResult};

/// Something that can move an object to another state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Connect,
    Update,
    SendOffer,
    SendRequest,
    SendCredential,
    SendProof,
}

impl Step {
    fn action(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Update => "update state",
            Self::SendOffer => "send offer",
            Self::SendRequest => "send request",
            Self::SendCredential => "send credential",
            Self::SendProof => "send proof",
        }
    }
}

/// State a family starts in when created by its usual constructor.
pub fn initial_state(kind: ObjectKind) -> ObjectState {
    match kind {
        ObjectKind::Connection | ObjectKind::IssuerCredential | ObjectKind::Proof => {
            ObjectState::INITIALIZED
        }
        // Created from a received offer or request.
        ObjectKind::Credential | ObjectKind::DisclosedProof => ObjectState::REQUEST_RECEIVED,
        ObjectKind::OutOfBandSender | ObjectKind::OutOfBandReceiver => ObjectState::NONE,
    }
}

/// Apply `step` to an object of `kind` in `state`.
pub fn transition(kind: ObjectKind, state: ObjectState, step: Step) -> SimResult<ObjectState> {
    use ObjectKind as K;
    use ObjectState as S;
    use Step::*;

    let next = match (kind, state, step) {
        // Inviter connects, invitee (already holding an invite) only answers.
        (K::Connection, S::INITIALIZED, Connect) => S::OFFER_SENT,
        (K::Connection, S::REQUEST_RECEIVED, Connect) => S::REQUEST_RECEIVED,
        (K::Connection, S::INITIALIZED, Update) => S::INITIALIZED,
        (K::Connection, S::OFFER_SENT, Update) => S::REQUEST_RECEIVED,
        (K::Connection, S::REQUEST_RECEIVED | S::ACCEPTED, Update) => S::ACCEPTED,

        (K::IssuerCredential, S::INITIALIZED, SendOffer) => S::OFFER_SENT,
        (K::IssuerCredential, S::OFFER_SENT, Update) => S::REQUEST_RECEIVED,
        (K::IssuerCredential, S::REQUEST_RECEIVED, SendCredential) => S::ACCEPTED,
        (K::IssuerCredential, S::INITIALIZED | S::REQUEST_RECEIVED | S::ACCEPTED, Update) => state,

        (K::Credential, S::REQUEST_RECEIVED, SendRequest) => S::OFFER_SENT,
        (K::Credential, S::OFFER_SENT | S::ACCEPTED, Update) => S::ACCEPTED,
        (K::Credential, S::REQUEST_RECEIVED, Update) => state,

        (K::Proof, S::INITIALIZED, SendRequest) => S::OFFER_SENT,
        (K::Proof, S::OFFER_SENT | S::ACCEPTED, Update) => S::ACCEPTED,
        (K::Proof, S::INITIALIZED, Update) => state,

        (K::DisclosedProof, S::REQUEST_RECEIVED, SendProof) => S::OFFER_SENT,
        (K::DisclosedProof, S::OFFER_SENT | S::ACCEPTED, Update) => S::ACCEPTED,
        (K::DisclosedProof, S::REQUEST_RECEIVED, Update) => state,

        (K::OutOfBandSender | K::OutOfBandReceiver, _, _) => {
            return Err(SimError::NotSupported(step.action()))
        }
        _ => {
            return Err(SimError::InvalidState {
                kind,
                state,
                action: step.action(),
            })
        }
    };

    if next != state {
        tracing::debug!(%kind, from = %state, to = %next, "Simulated state transition");
    }
    Ok(next)
}

/// Message libvcx renders for `code`, if it classifies it.
pub fn message_for(code: ErrorCode) -> Option<&'static str> {
    let message = match code.0 {
        0 => "Success",
        1001 => "Unknown Error",
        1003 => "Invalid Connection Handle",
        1005 => "Object not ready for specified action",
        1007 => "Invalid Option",
        1015 => "Invalid Credential Issuer Handle",
        1016 => "Invalid JSON string",
        1017 => "Invalid proof handle",
        1048 => "Obj was not found with handle",
        1049 => "Obj was not found with handle",
        1053 => "Invalid credential handle",
        1081 => "Object is in invalid state for requested operation",
        1103 => "Action is not supported",
        1115 => "Invalid input parameter",
        5555 => "Waiting for callback timed out",
        _ => return None,
    };
    Some(message)
}
