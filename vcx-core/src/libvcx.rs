//! [`NativeLibrary`] over the real `libvcx` shared library.

use std::ffi::{c_char, CStr};

use tracing::warn;

use crate::error::ErrorCode;
use crate::handle::CommandHandle;
use crate::native::{
    to_c_string, BoolCallback, CallbackFn, HandleAndBoolCallback, HandleCallback, NativeCall,
    NativeLibrary, ObjectKind, StateAndStringCallback, StateCallback, StringCallback,
    UnitCallback,
};

#[link(name = "vcx")]
extern "C" {
    fn vcx_error_c_message(code: u32) -> *const c_char;
    fn vcx_version() -> *const c_char;
    fn vcx_shutdown(delete_wallet: bool) -> u32;

    fn vcx_create_wallet(command: u32, config: *const c_char, cb: UnitCallback) -> u32;
    fn vcx_open_main_wallet(command: u32, config: *const c_char, cb: HandleCallback) -> u32;
    fn vcx_close_main_wallet(command: u32, cb: UnitCallback) -> u32;
    fn vcx_open_main_pool(command: u32, config: *const c_char, cb: UnitCallback) -> u32;

    fn vcx_connection_create(command: u32, source_id: *const c_char, cb: HandleCallback) -> u32;
    fn vcx_connection_create_with_invite(
        command: u32,
        source_id: *const c_char,
        invite: *const c_char,
        cb: HandleCallback,
    ) -> u32;
    fn vcx_connection_connect(
        command: u32,
        handle: u32,
        options: *const c_char,
        cb: StringCallback,
    ) -> u32;
    fn vcx_connection_update_state(command: u32, handle: u32, cb: StateCallback) -> u32;
    fn vcx_connection_update_state_with_message(
        command: u32,
        handle: u32,
        message: *const c_char,
        cb: StateCallback,
    ) -> u32;
    fn vcx_connection_get_state(command: u32, handle: u32, cb: StateCallback) -> u32;
    fn vcx_connection_serialize(command: u32, handle: u32, cb: StringCallback) -> u32;
    fn vcx_connection_deserialize(command: u32, data: *const c_char, cb: HandleCallback) -> u32;
    fn vcx_connection_invite_details(
        command: u32,
        handle: u32,
        abbreviated: bool,
        cb: StringCallback,
    ) -> u32;
    fn vcx_connection_get_thread_id(command: u32, handle: u32, cb: StringCallback) -> u32;
    fn vcx_connection_get_pw_did(command: u32, handle: u32, cb: StringCallback) -> u32;
    fn vcx_connection_send_message(
        command: u32,
        handle: u32,
        message: *const c_char,
        options: *const c_char,
        cb: StringCallback,
    ) -> u32;
    fn vcx_connection_delete_connection(command: u32, handle: u32, cb: UnitCallback) -> u32;
    fn vcx_connection_release(handle: u32) -> u32;

    fn vcx_out_of_band_sender_create(command: u32, config: *const c_char, cb: HandleCallback)
        -> u32;
    fn vcx_out_of_band_sender_append_message(
        command: u32,
        handle: u32,
        message: *const c_char,
        cb: UnitCallback,
    ) -> u32;
    fn vcx_out_of_band_sender_append_service(
        command: u32,
        handle: u32,
        service: *const c_char,
        cb: UnitCallback,
    ) -> u32;
    fn vcx_out_of_band_sender_get_thread_id(command: u32, handle: u32, cb: StringCallback) -> u32;
    fn vcx_out_of_band_to_message(command: u32, handle: u32, cb: StringCallback) -> u32;
    fn vcx_out_of_band_sender_serialize(command: u32, handle: u32, cb: StringCallback) -> u32;
    fn vcx_out_of_band_sender_deserialize(
        command: u32,
        data: *const c_char,
        cb: HandleCallback,
    ) -> u32;
    fn vcx_out_of_band_sender_release(handle: u32) -> u32;
    fn vcx_out_of_band_receiver_create(
        command: u32,
        message: *const c_char,
        cb: HandleCallback,
    ) -> u32;
    fn vcx_out_of_band_receiver_extract_message(
        command: u32,
        handle: u32,
        cb: StringCallback,
    ) -> u32;
    fn vcx_out_of_band_receiver_connection_exists(
        command: u32,
        handle: u32,
        connections: *const c_char,
        cb: HandleAndBoolCallback,
    ) -> u32;
    fn vcx_out_of_band_receiver_build_connection(
        command: u32,
        handle: u32,
        cb: StringCallback,
    ) -> u32;
    fn vcx_out_of_band_receiver_get_thread_id(command: u32, handle: u32, cb: StringCallback)
        -> u32;
    fn vcx_out_of_band_receiver_serialize(command: u32, handle: u32, cb: StringCallback) -> u32;
    fn vcx_out_of_band_receiver_deserialize(
        command: u32,
        data: *const c_char,
        cb: HandleCallback,
    ) -> u32;
    fn vcx_out_of_band_receiver_release(handle: u32) -> u32;

    fn vcx_credential_create_with_offer(
        command: u32,
        source_id: *const c_char,
        offer: *const c_char,
        cb: HandleCallback,
    ) -> u32;
    fn vcx_credential_send_request(
        command: u32,
        handle: u32,
        connection: u32,
        payment_handle: u32,
        cb: UnitCallback,
    ) -> u32;
    fn vcx_credential_get_attributes(command: u32, handle: u32, cb: StringCallback) -> u32;
    fn vcx_credential_get_state(command: u32, handle: u32, cb: StateCallback) -> u32;
    fn vcx_v2_credential_update_state(
        command: u32,
        handle: u32,
        connection: u32,
        cb: StateCallback,
    ) -> u32;
    fn vcx_credential_get_thread_id(command: u32, handle: u32, cb: StringCallback) -> u32;
    fn vcx_credential_serialize(command: u32, handle: u32, cb: StringCallback) -> u32;
    fn vcx_credential_deserialize(command: u32, data: *const c_char, cb: HandleCallback) -> u32;
    fn vcx_credential_release(handle: u32) -> u32;

    fn vcx_issuer_create_credential(command: u32, source_id: *const c_char, cb: HandleCallback)
        -> u32;
    fn vcx_issuer_send_credential_offer_v2(
        command: u32,
        handle: u32,
        connection: u32,
        cb: UnitCallback,
    ) -> u32;
    fn vcx_issuer_send_credential(
        command: u32,
        handle: u32,
        connection: u32,
        cb: StateCallback,
    ) -> u32;
    fn vcx_issuer_credential_is_revokable(command: u32, handle: u32, cb: BoolCallback) -> u32;
    fn vcx_issuer_credential_get_state(command: u32, handle: u32, cb: StateCallback) -> u32;
    fn vcx_v2_issuer_credential_update_state(
        command: u32,
        handle: u32,
        connection: u32,
        cb: StateCallback,
    ) -> u32;
    fn vcx_issuer_credential_get_thread_id(command: u32, handle: u32, cb: StringCallback) -> u32;
    fn vcx_issuer_credential_serialize(command: u32, handle: u32, cb: StringCallback) -> u32;
    fn vcx_issuer_credential_deserialize(
        command: u32,
        data: *const c_char,
        cb: HandleCallback,
    ) -> u32;
    fn vcx_issuer_credential_release(handle: u32) -> u32;

    fn vcx_proof_create(
        command: u32,
        source_id: *const c_char,
        requested_attrs: *const c_char,
        requested_predicates: *const c_char,
        revocation_interval: *const c_char,
        name: *const c_char,
        cb: HandleCallback,
    ) -> u32;
    fn vcx_proof_send_request(command: u32, handle: u32, connection: u32, cb: UnitCallback)
        -> u32;
    fn vcx_get_proof_msg(command: u32, handle: u32, cb: StateAndStringCallback) -> u32;
    fn vcx_proof_get_state(command: u32, handle: u32, cb: StateCallback) -> u32;
    fn vcx_v2_proof_update_state(
        command: u32,
        handle: u32,
        connection: u32,
        cb: StateCallback,
    ) -> u32;
    fn vcx_proof_get_thread_id(command: u32, handle: u32, cb: StringCallback) -> u32;
    fn vcx_proof_serialize(command: u32, handle: u32, cb: StringCallback) -> u32;
    fn vcx_proof_deserialize(command: u32, data: *const c_char, cb: HandleCallback) -> u32;
    fn vcx_proof_release(handle: u32) -> u32;

    fn vcx_disclosed_proof_create_with_request(
        command: u32,
        source_id: *const c_char,
        request: *const c_char,
        cb: HandleCallback,
    ) -> u32;
    fn vcx_disclosed_proof_retrieve_credentials(
        command: u32,
        handle: u32,
        cb: StringCallback,
    ) -> u32;
    fn vcx_disclosed_proof_generate_proof(
        command: u32,
        handle: u32,
        selected_credentials: *const c_char,
        self_attested_attrs: *const c_char,
        cb: UnitCallback,
    ) -> u32;
    fn vcx_disclosed_proof_send_proof(
        command: u32,
        handle: u32,
        connection: u32,
        cb: UnitCallback,
    ) -> u32;
    fn vcx_disclosed_proof_get_state(command: u32, handle: u32, cb: StateCallback) -> u32;
    fn vcx_v2_disclosed_proof_update_state(
        command: u32,
        handle: u32,
        connection: u32,
        cb: StateCallback,
    ) -> u32;
    fn vcx_disclosed_proof_get_thread_id(command: u32, handle: u32, cb: StringCallback) -> u32;
    fn vcx_disclosed_proof_serialize(command: u32, handle: u32, cb: StringCallback) -> u32;
    fn vcx_disclosed_proof_deserialize(
        command: u32,
        data: *const c_char,
        cb: HandleCallback,
    ) -> u32;
    fn vcx_disclosed_proof_release(handle: u32) -> u32;
}

/// Unwrap the callback variant an entry point needs.
macro_rules! callback {
    ($cb:expr, $variant:ident) => {
        match $cb {
            CallbackFn::$variant(f) => f,
            other => {
                warn!(shape = ?other.shape(), "Callback does not fit the entry point");
                return ErrorCode::INVALID_INPUT;
            }
        }
    };
}

/// Marshal a string argument, refusing the call on an interior NUL.
macro_rules! c_str {
    ($name:literal, $value:expr) => {
        match to_c_string($name, $value) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "Argument cannot cross the C boundary");
                return ErrorCode::INVALID_INPUT;
            }
        }
    };
}

/// The process-wide libvcx instance.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibVcx;

impl LibVcx {
    pub fn new() -> Self {
        Self
    }
}

fn owned(value: *const c_char) -> Option<String> {
    if value.is_null() {
        return None;
    }
    // SAFETY: libvcx returns static, NUL-terminated strings here.
    Some(unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned())
}

impl NativeLibrary for LibVcx {
    fn invoke(&self, call: &NativeCall, command: CommandHandle, cb: CallbackFn) -> ErrorCode {
        use NativeCall::*;
        use ObjectKind as K;

        let cmd = command.as_raw();
        // SAFETY: every pointer passed below outlives the call; libvcx copies
        // its string arguments before returning.
        let code = unsafe {
            match call {
                CreateWallet { config } => {
                    let config = c_str!("config", config);
                    vcx_create_wallet(cmd, config.as_ptr(), callback!(cb, Unit))
                }
                OpenMainWallet { config } => {
                    let config = c_str!("config", config);
                    vcx_open_main_wallet(cmd, config.as_ptr(), callback!(cb, Handle))
                }
                CloseMainWallet => vcx_close_main_wallet(cmd, callback!(cb, Unit)),
                OpenMainPool { config } => {
                    let config = c_str!("config", config);
                    vcx_open_main_pool(cmd, config.as_ptr(), callback!(cb, Unit))
                }

                Serialize { kind, handle } => {
                    let cb = callback!(cb, String);
                    let handle = *handle;
                    match kind {
                        K::Connection => vcx_connection_serialize(cmd, handle, cb),
                        K::OutOfBandSender => vcx_out_of_band_sender_serialize(cmd, handle, cb),
                        K::OutOfBandReceiver => {
                            vcx_out_of_band_receiver_serialize(cmd, handle, cb)
                        }
                        K::Credential => vcx_credential_serialize(cmd, handle, cb),
                        K::IssuerCredential => vcx_issuer_credential_serialize(cmd, handle, cb),
                        K::Proof => vcx_proof_serialize(cmd, handle, cb),
                        K::DisclosedProof => vcx_disclosed_proof_serialize(cmd, handle, cb),
                    }
                }
                Deserialize { kind, data } => {
                    let cb = callback!(cb, Handle);
                    let data = c_str!("data", data);
                    let data = data.as_ptr();
                    match kind {
                        K::Connection => vcx_connection_deserialize(cmd, data, cb),
                        K::OutOfBandSender => vcx_out_of_band_sender_deserialize(cmd, data, cb),
                        K::OutOfBandReceiver => {
                            vcx_out_of_band_receiver_deserialize(cmd, data, cb)
                        }
                        K::Credential => vcx_credential_deserialize(cmd, data, cb),
                        K::IssuerCredential => vcx_issuer_credential_deserialize(cmd, data, cb),
                        K::Proof => vcx_proof_deserialize(cmd, data, cb),
                        K::DisclosedProof => vcx_disclosed_proof_deserialize(cmd, data, cb),
                    }
                }
                GetState { kind, handle } => {
                    let cb = callback!(cb, State);
                    let handle = *handle;
                    match kind {
                        K::Connection => vcx_connection_get_state(cmd, handle, cb),
                        K::Credential => vcx_credential_get_state(cmd, handle, cb),
                        K::IssuerCredential => vcx_issuer_credential_get_state(cmd, handle, cb),
                        K::Proof => vcx_proof_get_state(cmd, handle, cb),
                        K::DisclosedProof => vcx_disclosed_proof_get_state(cmd, handle, cb),
                        K::OutOfBandSender | K::OutOfBandReceiver => {
                            ErrorCode::ACTION_NOT_SUPPORTED.0
                        }
                    }
                }
                UpdateState {
                    kind,
                    handle,
                    connection,
                } => {
                    let cb = callback!(cb, State);
                    let handle = *handle;
                    match (kind, connection) {
                        (K::Connection, _) => vcx_connection_update_state(cmd, handle, cb),
                        (K::Credential, Some(conn)) => {
                            vcx_v2_credential_update_state(cmd, handle, *conn, cb)
                        }
                        (K::IssuerCredential, Some(conn)) => {
                            vcx_v2_issuer_credential_update_state(cmd, handle, *conn, cb)
                        }
                        (K::Proof, Some(conn)) => vcx_v2_proof_update_state(cmd, handle, *conn, cb),
                        (K::DisclosedProof, Some(conn)) => {
                            vcx_v2_disclosed_proof_update_state(cmd, handle, *conn, cb)
                        }
                        (K::OutOfBandSender | K::OutOfBandReceiver, _) => {
                            ErrorCode::ACTION_NOT_SUPPORTED.0
                        }
                        (_, None) => ErrorCode::INVALID_CONNECTION_HANDLE.0,
                    }
                }
                GetThreadId { kind, handle } => {
                    let cb = callback!(cb, String);
                    let handle = *handle;
                    match kind {
                        K::Connection => vcx_connection_get_thread_id(cmd, handle, cb),
                        K::OutOfBandSender => {
                            vcx_out_of_band_sender_get_thread_id(cmd, handle, cb)
                        }
                        K::OutOfBandReceiver => {
                            vcx_out_of_band_receiver_get_thread_id(cmd, handle, cb)
                        }
                        K::IssuerCredential => {
                            vcx_issuer_credential_get_thread_id(cmd, handle, cb)
                        }
                        K::Proof => vcx_proof_get_thread_id(cmd, handle, cb),
                        K::DisclosedProof => vcx_disclosed_proof_get_thread_id(cmd, handle, cb),
                        K::Credential => vcx_credential_get_thread_id(cmd, handle, cb),
                    }
                }

                ConnectionCreate { source_id } => {
                    let source_id = c_str!("source_id", source_id);
                    vcx_connection_create(cmd, source_id.as_ptr(), callback!(cb, Handle))
                }
                ConnectionCreateWithInvite { source_id, invite } => {
                    let source_id = c_str!("source_id", source_id);
                    let invite = c_str!("invite", invite);
                    vcx_connection_create_with_invite(
                        cmd,
                        source_id.as_ptr(),
                        invite.as_ptr(),
                        callback!(cb, Handle),
                    )
                }
                ConnectionConnect { handle, options } => {
                    let options = match options {
                        Some(options) => Some(c_str!("options", options)),
                        None => None,
                    };
                    let options = options.as_ref().map_or(std::ptr::null(), |o| o.as_ptr());
                    vcx_connection_connect(cmd, *handle, options, callback!(cb, String))
                }
                ConnectionUpdateStateWithMessage { handle, message } => {
                    let message = c_str!("message", message);
                    vcx_connection_update_state_with_message(
                        cmd,
                        *handle,
                        message.as_ptr(),
                        callback!(cb, State),
                    )
                }
                ConnectionInviteDetails {
                    handle,
                    abbreviated,
                } => vcx_connection_invite_details(cmd, *handle, *abbreviated, callback!(cb, String)),
                ConnectionGetPwDid { handle } => {
                    vcx_connection_get_pw_did(cmd, *handle, callback!(cb, String))
                }
                ConnectionSendMessage {
                    handle,
                    message,
                    options,
                } => {
                    let message = c_str!("message", message);
                    let options = c_str!("options", options);
                    vcx_connection_send_message(
                        cmd,
                        *handle,
                        message.as_ptr(),
                        options.as_ptr(),
                        callback!(cb, String),
                    )
                }
                ConnectionDelete { handle } => {
                    vcx_connection_delete_connection(cmd, *handle, callback!(cb, Unit))
                }

                OutOfBandSenderCreate { config } => {
                    let config = c_str!("config", config);
                    vcx_out_of_band_sender_create(cmd, config.as_ptr(), callback!(cb, Handle))
                }
                OutOfBandSenderAppendMessage { handle, message } => {
                    let message = c_str!("message", message);
                    vcx_out_of_band_sender_append_message(
                        cmd,
                        *handle,
                        message.as_ptr(),
                        callback!(cb, Unit),
                    )
                }
                OutOfBandSenderAppendService { handle, service } => {
                    let service = c_str!("service", service);
                    vcx_out_of_band_sender_append_service(
                        cmd,
                        *handle,
                        service.as_ptr(),
                        callback!(cb, Unit),
                    )
                }
                OutOfBandToMessage { handle } => {
                    vcx_out_of_band_to_message(cmd, *handle, callback!(cb, String))
                }
                OutOfBandReceiverCreate { message } => {
                    let message = c_str!("message", message);
                    vcx_out_of_band_receiver_create(cmd, message.as_ptr(), callback!(cb, Handle))
                }
                OutOfBandReceiverExtractMessage { handle } => {
                    vcx_out_of_band_receiver_extract_message(cmd, *handle, callback!(cb, String))
                }
                OutOfBandReceiverConnectionExists {
                    handle,
                    connections,
                } => {
                    let connections = match serde_json::to_string(connections) {
                        Ok(json) => json,
                        Err(_) => return ErrorCode::INVALID_JSON,
                    };
                    let connections = c_str!("connections", &connections);
                    vcx_out_of_band_receiver_connection_exists(
                        cmd,
                        *handle,
                        connections.as_ptr(),
                        callback!(cb, HandleAndBool),
                    )
                }
                OutOfBandReceiverBuildConnection { handle } => {
                    vcx_out_of_band_receiver_build_connection(cmd, *handle, callback!(cb, String))
                }

                CredentialCreateWithOffer { source_id, offer } => {
                    let source_id = c_str!("source_id", source_id);
                    let offer = c_str!("offer", offer);
                    vcx_credential_create_with_offer(
                        cmd,
                        source_id.as_ptr(),
                        offer.as_ptr(),
                        callback!(cb, Handle),
                    )
                }
                CredentialSendRequest { handle, connection } => {
                    vcx_credential_send_request(cmd, *handle, *connection, 0, callback!(cb, Unit))
                }
                CredentialGetAttributes { handle } => {
                    vcx_credential_get_attributes(cmd, *handle, callback!(cb, String))
                }

                IssuerCredentialCreate { source_id } => {
                    let source_id = c_str!("source_id", source_id);
                    vcx_issuer_create_credential(cmd, source_id.as_ptr(), callback!(cb, Handle))
                }
                IssuerCredentialSendOffer { handle, connection } => {
                    vcx_issuer_send_credential_offer_v2(
                        cmd,
                        *handle,
                        *connection,
                        callback!(cb, Unit),
                    )
                }
                IssuerCredentialSendCredential { handle, connection } => {
                    vcx_issuer_send_credential(cmd, *handle, *connection, callback!(cb, State))
                }
                IssuerCredentialIsRevokable { handle } => {
                    vcx_issuer_credential_is_revokable(cmd, *handle, callback!(cb, Bool))
                }

                ProofCreate {
                    source_id,
                    requested_attrs,
                    requested_predicates,
                    revocation_interval,
                    name,
                } => {
                    let source_id = c_str!("source_id", source_id);
                    let requested_attrs = c_str!("requested_attrs", requested_attrs);
                    let requested_predicates = c_str!("requested_predicates", requested_predicates);
                    let revocation_interval = c_str!("revocation_interval", revocation_interval);
                    let name = c_str!("name", name);
                    vcx_proof_create(
                        cmd,
                        source_id.as_ptr(),
                        requested_attrs.as_ptr(),
                        requested_predicates.as_ptr(),
                        revocation_interval.as_ptr(),
                        name.as_ptr(),
                        callback!(cb, Handle),
                    )
                }
                ProofSendRequest { handle, connection } => {
                    vcx_proof_send_request(cmd, *handle, *connection, callback!(cb, Unit))
                }
                ProofGetPresentation { handle } => {
                    vcx_get_proof_msg(cmd, *handle, callback!(cb, StateAndString))
                }

                DisclosedProofCreateWithRequest { source_id, request } => {
                    let source_id = c_str!("source_id", source_id);
                    let request = c_str!("request", request);
                    vcx_disclosed_proof_create_with_request(
                        cmd,
                        source_id.as_ptr(),
                        request.as_ptr(),
                        callback!(cb, Handle),
                    )
                }
                DisclosedProofRetrieveCredentials { handle } => {
                    vcx_disclosed_proof_retrieve_credentials(cmd, *handle, callback!(cb, String))
                }
                DisclosedProofGenerateProof {
                    handle,
                    selected_credentials,
                    self_attested_attrs,
                } => {
                    let selected = c_str!("selected_credentials", selected_credentials);
                    let self_attested = c_str!("self_attested_attrs", self_attested_attrs);
                    vcx_disclosed_proof_generate_proof(
                        cmd,
                        *handle,
                        selected.as_ptr(),
                        self_attested.as_ptr(),
                        callback!(cb, Unit),
                    )
                }
                DisclosedProofSendProof { handle, connection } => {
                    vcx_disclosed_proof_send_proof(cmd, *handle, *connection, callback!(cb, Unit))
                }
            }
        };
        ErrorCode(code)
    }

    fn error_message(&self, code: ErrorCode) -> Option<String> {
        // SAFETY: vcx_error_c_message accepts any code.
        owned(unsafe { vcx_error_c_message(code.0) })
    }

    fn release(&self, kind: ObjectKind, handle: u32) -> ErrorCode {
        // SAFETY: release functions validate the handle themselves.
        let code = unsafe {
            match kind {
                ObjectKind::Connection => vcx_connection_release(handle),
                ObjectKind::OutOfBandSender => vcx_out_of_band_sender_release(handle),
                ObjectKind::OutOfBandReceiver => vcx_out_of_band_receiver_release(handle),
                ObjectKind::Credential => vcx_credential_release(handle),
                ObjectKind::IssuerCredential => vcx_issuer_credential_release(handle),
                ObjectKind::Proof => vcx_proof_release(handle),
                ObjectKind::DisclosedProof => vcx_disclosed_proof_release(handle),
            }
        };
        ErrorCode(code)
    }

    fn version(&self) -> String {
        // SAFETY: returns a static string.
        owned(unsafe { vcx_version() }).unwrap_or_default()
    }

    fn shutdown(&self, delete_wallet: bool) -> ErrorCode {
        // SAFETY: no arguments beyond a flag.
        ErrorCode(unsafe { vcx_shutdown(delete_wallet) })
    }
}
