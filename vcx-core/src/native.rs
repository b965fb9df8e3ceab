//! The seam between the bridge and the native library.
//!
//! Every async libvcx entry point has the form
//! `fn(command_handle, args..., cb) -> error_code`. [`NativeCall`] names the
//! entry point and carries its arguments, [`CallbackFn`] is the C callback
//! pointer handed over with it, and [`NativeLibrary`] performs the call.

use std::ffi::{c_char, CString};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult, ErrorCode};
use crate::handle::CommandHandle;
use crate::payload::ResultShape;

pub type UnitCallback = extern "C" fn(command_handle: u32, err: u32);
pub type HandleCallback = extern "C" fn(command_handle: u32, err: u32, handle: u32);
pub type StringCallback = extern "C" fn(command_handle: u32, err: u32, value: *const c_char);
pub type StateCallback = extern "C" fn(command_handle: u32, err: u32, state: u32);
pub type BoolCallback = extern "C" fn(command_handle: u32, err: u32, flag: bool);
pub type HandleAndBoolCallback =
    extern "C" fn(command_handle: u32, err: u32, handle: u32, found: bool);
pub type StateAndStringCallback =
    extern "C" fn(command_handle: u32, err: u32, state: u32, value: *const c_char);

/// C callback pointer for one result shape.
#[derive(Debug, Clone, Copy)]
pub enum CallbackFn {
    Unit(UnitCallback),
    Handle(HandleCallback),
    String(StringCallback),
    State(StateCallback),
    Bool(BoolCallback),
    HandleAndBool(HandleAndBoolCallback),
    StateAndString(StateAndStringCallback),
}

impl CallbackFn {
    /// Shape of the values this callback reports.
    pub fn shape(&self) -> ResultShape {
        match self {
            Self::Unit(_) => ResultShape::Unit,
            Self::Handle(_) => ResultShape::Handle,
            Self::String(_) => ResultShape::String,
            Self::State(_) => ResultShape::State,
            Self::Bool(_) => ResultShape::Bool,
            Self::HandleAndBool(_) => ResultShape::HandleAndBool,
            Self::StateAndString(_) => ResultShape::StateAndString,
        }
    }
}

/// Copy `value` into a C string.
pub fn to_c_string(name: &'static str, value: &str) -> BridgeResult<CString> {
    CString::new(value).map_err(|_| BridgeError::InvalidString { name })
}

/// Native object families that hand out releasable handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Connection,
    OutOfBandSender,
    OutOfBandReceiver,
    Credential,
    IssuerCredential,
    Proof,
    DisclosedProof,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 7] = [
        Self::Connection,
        Self::OutOfBandSender,
        Self::OutOfBandReceiver,
        Self::Credential,
        Self::IssuerCredential,
        Self::Proof,
        Self::DisclosedProof,
    ];

    /// Whether libvcx tracks a protocol state for this family.
    pub fn has_state(self) -> bool {
        !matches!(self, Self::OutOfBandSender | Self::OutOfBandReceiver)
    }

    /// Error code libvcx reports for an unknown handle of this family.
    pub fn invalid_handle_code(self) -> ErrorCode {
        match self {
            Self::Connection => ErrorCode::INVALID_CONNECTION_HANDLE,
            Self::Credential => ErrorCode::INVALID_CREDENTIAL_HANDLE,
            Self::IssuerCredential => ErrorCode::INVALID_ISSUER_CREDENTIAL_HANDLE,
            Self::Proof => ErrorCode::INVALID_PROOF_HANDLE,
            Self::DisclosedProof => ErrorCode::INVALID_DISCLOSED_PROOF_HANDLE,
            Self::OutOfBandSender | Self::OutOfBandReceiver => ErrorCode::INVALID_HANDLE,
        }
    }

    /// Name of the synchronous release entry point.
    pub fn release_symbol(self) -> &'static str {
        match self {
            Self::Connection => "vcx_connection_release",
            Self::OutOfBandSender => "vcx_out_of_band_sender_release",
            Self::OutOfBandReceiver => "vcx_out_of_band_receiver_release",
            Self::Credential => "vcx_credential_release",
            Self::IssuerCredential => "vcx_issuer_credential_release",
            Self::Proof => "vcx_proof_release",
            Self::DisclosedProof => "vcx_disclosed_proof_release",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connection => "connection",
            Self::OutOfBandSender => "out_of_band_sender",
            Self::OutOfBandReceiver => "out_of_band_receiver",
            Self::Credential => "credential",
            Self::IssuerCredential => "issuer_credential",
            Self::Proof => "proof",
            Self::DisclosedProof => "disclosed_proof",
        };
        f.write_str(name)
    }
}

/// One async libvcx entry point with its arguments.
///
/// Family-generic operations (`Serialize`, `GetState`, ...) carry the
/// [`ObjectKind`] that selects the concrete symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
    CreateWallet { config: String },
    OpenMainWallet { config: String },
    CloseMainWallet,
    OpenMainPool { config: String },

    Serialize { kind: ObjectKind, handle: u32 },
    Deserialize { kind: ObjectKind, data: String },
    GetState { kind: ObjectKind, handle: u32 },
    /// `connection` is required by every family except connections.
    UpdateState { kind: ObjectKind, handle: u32, connection: Option<u32> },
    GetThreadId { kind: ObjectKind, handle: u32 },

    ConnectionCreate { source_id: String },
    ConnectionCreateWithInvite { source_id: String, invite: String },
    ConnectionConnect { handle: u32, options: Option<String> },
    ConnectionUpdateStateWithMessage { handle: u32, message: String },
    ConnectionInviteDetails { handle: u32, abbreviated: bool },
    ConnectionGetPwDid { handle: u32 },
    ConnectionSendMessage { handle: u32, message: String, options: String },
    ConnectionDelete { handle: u32 },

    OutOfBandSenderCreate { config: String },
    OutOfBandSenderAppendMessage { handle: u32, message: String },
    OutOfBandSenderAppendService { handle: u32, service: String },
    OutOfBandToMessage { handle: u32 },
    OutOfBandReceiverCreate { message: String },
    OutOfBandReceiverExtractMessage { handle: u32 },
    OutOfBandReceiverConnectionExists { handle: u32, connections: Vec<u32> },
    OutOfBandReceiverBuildConnection { handle: u32 },

    CredentialCreateWithOffer { source_id: String, offer: String },
    CredentialSendRequest { handle: u32, connection: u32 },
    CredentialGetAttributes { handle: u32 },

    IssuerCredentialCreate { source_id: String },
    IssuerCredentialSendOffer { handle: u32, connection: u32 },
    IssuerCredentialSendCredential { handle: u32, connection: u32 },
    IssuerCredentialIsRevokable { handle: u32 },

    ProofCreate {
        source_id: String,
        requested_attrs: String,
        requested_predicates: String,
        revocation_interval: String,
        name: String,
    },
    ProofSendRequest { handle: u32, connection: u32 },
    ProofGetPresentation { handle: u32 },

    DisclosedProofCreateWithRequest { source_id: String, request: String },
    DisclosedProofRetrieveCredentials { handle: u32 },
    DisclosedProofGenerateProof {
        handle: u32,
        selected_credentials: String,
        self_attested_attrs: String,
    },
    DisclosedProofSendProof { handle: u32, connection: u32 },
}

impl NativeCall {
    /// Shape of the callback this entry point fires.
    pub fn shape(&self) -> ResultShape {
        use NativeCall::*;
        match self {
            CreateWallet { .. }
            | CloseMainWallet
            | OpenMainPool { .. }
            | ConnectionDelete { .. }
            | OutOfBandSenderAppendMessage { .. }
            | OutOfBandSenderAppendService { .. }
            | CredentialSendRequest { .. }
            | IssuerCredentialSendOffer { .. }
            | ProofSendRequest { .. }
            | DisclosedProofGenerateProof { .. }
            | DisclosedProofSendProof { .. } => ResultShape::Unit,

            OpenMainWallet { .. }
            | Deserialize { .. }
            | ConnectionCreate { .. }
            | ConnectionCreateWithInvite { .. }
            | OutOfBandSenderCreate { .. }
            | OutOfBandReceiverCreate { .. }
            | CredentialCreateWithOffer { .. }
            | IssuerCredentialCreate { .. }
            | ProofCreate { .. }
            | DisclosedProofCreateWithRequest { .. } => ResultShape::Handle,

            Serialize { .. }
            | GetThreadId { .. }
            | ConnectionConnect { .. }
            | ConnectionInviteDetails { .. }
            | ConnectionGetPwDid { .. }
            | ConnectionSendMessage { .. }
            | OutOfBandToMessage { .. }
            | OutOfBandReceiverExtractMessage { .. }
            | OutOfBandReceiverBuildConnection { .. }
            | CredentialGetAttributes { .. }
            | DisclosedProofRetrieveCredentials { .. } => ResultShape::String,

            GetState { .. }
            | UpdateState { .. }
            | ConnectionUpdateStateWithMessage { .. }
            | IssuerCredentialSendCredential { .. } => ResultShape::State,

            IssuerCredentialIsRevokable { .. } => ResultShape::Bool,
            OutOfBandReceiverConnectionExists { .. } => ResultShape::HandleAndBool,
            ProofGetPresentation { .. } => ResultShape::StateAndString,
        }
    }

    /// Object family the call targets, if any.
    pub fn kind(&self) -> Option<ObjectKind> {
        use NativeCall::*;
        match self {
            CreateWallet { .. } | OpenMainWallet { .. } | CloseMainWallet | OpenMainPool { .. } => {
                None
            }
            Serialize { kind, .. }
            | Deserialize { kind, .. }
            | GetState { kind, .. }
            | UpdateState { kind, .. }
            | GetThreadId { kind, .. } => Some(*kind),
            ConnectionCreate { .. }
            | ConnectionCreateWithInvite { .. }
            | ConnectionConnect { .. }
            | ConnectionUpdateStateWithMessage { .. }
            | ConnectionInviteDetails { .. }
            | ConnectionGetPwDid { .. }
            | ConnectionSendMessage { .. }
            | ConnectionDelete { .. } => Some(ObjectKind::Connection),
            OutOfBandSenderCreate { .. }
            | OutOfBandSenderAppendMessage { .. }
            | OutOfBandSenderAppendService { .. }
            | OutOfBandToMessage { .. } => Some(ObjectKind::OutOfBandSender),
            OutOfBandReceiverCreate { .. }
            | OutOfBandReceiverExtractMessage { .. }
            | OutOfBandReceiverConnectionExists { .. }
            | OutOfBandReceiverBuildConnection { .. } => Some(ObjectKind::OutOfBandReceiver),
            CredentialCreateWithOffer { .. }
            | CredentialSendRequest { .. }
            | CredentialGetAttributes { .. } => Some(ObjectKind::Credential),
            IssuerCredentialCreate { .. }
            | IssuerCredentialSendOffer { .. }
            | IssuerCredentialSendCredential { .. }
            | IssuerCredentialIsRevokable { .. } => Some(ObjectKind::IssuerCredential),
            ProofCreate { .. } | ProofSendRequest { .. } | ProofGetPresentation { .. } => {
                Some(ObjectKind::Proof)
            }
            DisclosedProofCreateWithRequest { .. }
            | DisclosedProofRetrieveCredentials { .. }
            | DisclosedProofGenerateProof { .. }
            | DisclosedProofSendProof { .. } => Some(ObjectKind::DisclosedProof),
        }
    }

    /// C symbol of the entry point, used in diagnostics.
    pub fn name(&self) -> &'static str {
        use NativeCall::*;
        use ObjectKind as K;
        match self {
            CreateWallet { .. } => "vcx_create_wallet",
            OpenMainWallet { .. } => "vcx_open_main_wallet",
            CloseMainWallet => "vcx_close_main_wallet",
            OpenMainPool { .. } => "vcx_open_main_pool",

            Serialize { kind, .. } => match kind {
                K::Connection => "vcx_connection_serialize",
                K::OutOfBandSender => "vcx_out_of_band_sender_serialize",
                K::OutOfBandReceiver => "vcx_out_of_band_receiver_serialize",
                K::Credential => "vcx_credential_serialize",
                K::IssuerCredential => "vcx_issuer_credential_serialize",
                K::Proof => "vcx_proof_serialize",
                K::DisclosedProof => "vcx_disclosed_proof_serialize",
            },
            Deserialize { kind, .. } => match kind {
                K::Connection => "vcx_connection_deserialize",
                K::OutOfBandSender => "vcx_out_of_band_sender_deserialize",
                K::OutOfBandReceiver => "vcx_out_of_band_receiver_deserialize",
                K::Credential => "vcx_credential_deserialize",
                K::IssuerCredential => "vcx_issuer_credential_deserialize",
                K::Proof => "vcx_proof_deserialize",
                K::DisclosedProof => "vcx_disclosed_proof_deserialize",
            },
            GetState { kind, .. } => match kind {
                K::Connection => "vcx_connection_get_state",
                K::Credential => "vcx_credential_get_state",
                K::IssuerCredential => "vcx_issuer_credential_get_state",
                K::Proof => "vcx_proof_get_state",
                K::DisclosedProof => "vcx_disclosed_proof_get_state",
                K::OutOfBandSender | K::OutOfBandReceiver => "vcx_out_of_band_get_state",
            },
            UpdateState { kind, .. } => match kind {
                K::Connection => "vcx_connection_update_state",
                K::Credential => "vcx_v2_credential_update_state",
                K::IssuerCredential => "vcx_v2_issuer_credential_update_state",
                K::Proof => "vcx_v2_proof_update_state",
                K::DisclosedProof => "vcx_v2_disclosed_proof_update_state",
                K::OutOfBandSender | K::OutOfBandReceiver => "vcx_out_of_band_update_state",
            },
            GetThreadId { kind, .. } => match kind {
                K::Connection => "vcx_connection_get_thread_id",
                K::OutOfBandSender => "vcx_out_of_band_sender_get_thread_id",
                K::OutOfBandReceiver => "vcx_out_of_band_receiver_get_thread_id",
                K::Credential => "vcx_credential_get_thread_id",
                K::IssuerCredential => "vcx_issuer_credential_get_thread_id",
                K::Proof => "vcx_proof_get_thread_id",
                K::DisclosedProof => "vcx_disclosed_proof_get_thread_id",
            },

            ConnectionCreate { .. } => "vcx_connection_create",
            ConnectionCreateWithInvite { .. } => "vcx_connection_create_with_invite",
            ConnectionConnect { .. } => "vcx_connection_connect",
            ConnectionUpdateStateWithMessage { .. } => "vcx_connection_update_state_with_message",
            ConnectionInviteDetails { .. } => "vcx_connection_invite_details",
            ConnectionGetPwDid { .. } => "vcx_connection_get_pw_did",
            ConnectionSendMessage { .. } => "vcx_connection_send_message",
            ConnectionDelete { .. } => "vcx_connection_delete_connection",

            OutOfBandSenderCreate { .. } => "vcx_out_of_band_sender_create",
            OutOfBandSenderAppendMessage { .. } => "vcx_out_of_band_sender_append_message",
            OutOfBandSenderAppendService { .. } => "vcx_out_of_band_sender_append_service",
            OutOfBandToMessage { .. } => "vcx_out_of_band_to_message",
            OutOfBandReceiverCreate { .. } => "vcx_out_of_band_receiver_create",
            OutOfBandReceiverExtractMessage { .. } => "vcx_out_of_band_receiver_extract_message",
            OutOfBandReceiverConnectionExists { .. } => {
                "vcx_out_of_band_receiver_connection_exists"
            }
            OutOfBandReceiverBuildConnection { .. } => "vcx_out_of_band_receiver_build_connection",

            CredentialCreateWithOffer { .. } => "vcx_credential_create_with_offer",
            CredentialSendRequest { .. } => "vcx_credential_send_request",
            CredentialGetAttributes { .. } => "vcx_credential_get_attributes",

            IssuerCredentialCreate { .. } => "vcx_issuer_create_credential",
            IssuerCredentialSendOffer { .. } => "vcx_issuer_send_credential_offer_v2",
            IssuerCredentialSendCredential { .. } => "vcx_issuer_send_credential",
            IssuerCredentialIsRevokable { .. } => "vcx_issuer_credential_is_revokable",

            ProofCreate { .. } => "vcx_proof_create",
            ProofSendRequest { .. } => "vcx_proof_send_request",
            ProofGetPresentation { .. } => "vcx_get_proof_msg",

            DisclosedProofCreateWithRequest { .. } => "vcx_disclosed_proof_create_with_request",
            DisclosedProofRetrieveCredentials { .. } => "vcx_disclosed_proof_retrieve_credentials",
            DisclosedProofGenerateProof { .. } => "vcx_disclosed_proof_generate_proof",
            DisclosedProofSendProof { .. } => "vcx_disclosed_proof_send_proof",
        }
    }
}

/// A native identity library reachable through the libvcx calling convention.
///
/// Implementations must return without waiting for the operation to finish.
/// A nonzero return from [`invoke`](Self::invoke) means the call was refused
/// and `cb` will never fire for `command`; on zero, `cb` fires exactly once,
/// from any thread, possibly before `invoke` returns.
///
/// The library serialises conflicting operations on the same object handle;
/// the bridge adds no per-handle locking.
pub trait NativeLibrary: Send + Sync {
    /// Start an async operation.
    fn invoke(&self, call: &NativeCall, command: CommandHandle, cb: CallbackFn) -> ErrorCode;

    /// Message for `code` (`vcx_error_c_message`), if the library classifies it.
    fn error_message(&self, code: ErrorCode) -> Option<String>;

    /// Free the native object behind `handle`. Synchronous, no callback.
    fn release(&self, kind: ObjectKind, handle: u32) -> ErrorCode;

    /// Library version string.
    fn version(&self) -> String;

    /// Shut the library down, optionally deleting the main wallet.
    fn shutdown(&self, delete_wallet: bool) -> ErrorCode;
}
