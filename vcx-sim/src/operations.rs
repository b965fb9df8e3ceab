//! What each simulated entry point does.

use serde_json::{json, Map, Value};
use uuid::Uuid;
use vcx_core::{ErrorCode, NativeCall, ObjectKind, ObjectState, Payload};

use crate::error::{SimError, SimResult};
use crate::objects::{ObjectTable, SimObject, Wallets};
use crate::protocol::{initial_state, transition, Step};

const SERVICE_ENDPOINT: &str = "http://localhost:8080/agency/msg";

/// Proof state `vcx_get_proof_msg` reports for a verified presentation.
pub const PROOF_VERIFIED: u32 = 1;

/// Name of the first blank string argument of `call`, if any.
pub fn blank_argument(call: &NativeCall) -> Option<&'static str> {
    use NativeCall::*;

    let args: Vec<(&'static str, &String)> = match call {
        CreateWallet { config } | OpenMainWallet { config } | OpenMainPool { config } => {
            vec![("config", config)]
        }
        Deserialize { data, .. } => vec![("data", data)],
        ConnectionCreate { source_id } | IssuerCredentialCreate { source_id } => {
            vec![("source_id", source_id)]
        }
        ConnectionCreateWithInvite { source_id, invite } => {
            vec![("source_id", source_id), ("invite", invite)]
        }
        ConnectionUpdateStateWithMessage { message, .. }
        | ConnectionSendMessage { message, .. }
        | OutOfBandSenderAppendMessage { message, .. }
        | OutOfBandReceiverCreate { message } => vec![("message", message)],
        OutOfBandSenderCreate { config } => vec![("config", config)],
        OutOfBandSenderAppendService { service, .. } => vec![("service", service)],
        CredentialCreateWithOffer { source_id, offer } => {
            vec![("source_id", source_id), ("offer", offer)]
        }
        ProofCreate {
            source_id,
            requested_attrs,
            ..
        } => vec![("source_id", source_id), ("requested_attrs", requested_attrs)],
        DisclosedProofCreateWithRequest { source_id, request } => {
            vec![("source_id", source_id), ("request", request)]
        }
        DisclosedProofGenerateProof {
            selected_credentials,
            ..
        } => vec![("selected_credentials", selected_credentials)],
        _ => Vec::new(),
    };

    args.into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
}

/// Object handle `call` targets, for the synchronous validity check.
pub fn target(call: &NativeCall) -> Option<(ObjectKind, u32)> {
    use NativeCall::*;

    let handle = match call {
        Serialize { handle, .. }
        | GetState { handle, .. }
        | UpdateState { handle, .. }
        | GetThreadId { handle, .. }
        | ConnectionConnect { handle, .. }
        | ConnectionUpdateStateWithMessage { handle, .. }
        | ConnectionInviteDetails { handle, .. }
        | ConnectionGetPwDid { handle }
        | ConnectionSendMessage { handle, .. }
        | ConnectionDelete { handle }
        | OutOfBandSenderAppendMessage { handle, .. }
        | OutOfBandSenderAppendService { handle, .. }
        | OutOfBandToMessage { handle }
        | OutOfBandReceiverExtractMessage { handle }
        | OutOfBandReceiverConnectionExists { handle, .. }
        | OutOfBandReceiverBuildConnection { handle }
        | CredentialSendRequest { handle, .. }
        | CredentialGetAttributes { handle }
        | IssuerCredentialSendOffer { handle, .. }
        | IssuerCredentialSendCredential { handle, .. }
        | IssuerCredentialIsRevokable { handle }
        | ProofSendRequest { handle, .. }
        | ProofGetPresentation { handle }
        | DisclosedProofRetrieveCredentials { handle }
        | DisclosedProofGenerateProof { handle, .. }
        | DisclosedProofSendProof { handle, .. } => *handle,
        _ => return None,
    };
    call.kind().map(|kind| (kind, handle))
}

fn parse(text: &str) -> SimResult<Value> {
    Ok(serde_json::from_str(text)?)
}

/// Parse an optional options string; blank means none.
fn parse_options(text: &str) -> SimResult<Value> {
    if text.trim().is_empty() {
        return Ok(json!({}));
    }
    parse(text)
}

/// The connection must exist and be `Accepted` before anything is sent over it.
fn require_connection(table: &ObjectTable, connection: u32) -> SimResult<()> {
    let connection = table.snapshot(ObjectKind::Connection, connection)?;
    if connection.state != ObjectState::ACCEPTED {
        return Err(SimError::NotReady("connection"));
    }
    Ok(())
}

fn step(table: &ObjectTable, kind: ObjectKind, handle: u32, step: Step) -> SimResult<ObjectState> {
    table.with(kind, handle, |object| {
        object.state = transition(kind, object.state, step)?;
        Ok(object.state)
    })
}

fn invite_details(object: &SimObject, abbreviated: bool) -> SimResult<String> {
    if let Some(invite) = object.data.get("invite") {
        return Ok(invite.to_string());
    }
    if object.state == ObjectState::INITIALIZED {
        return Err(SimError::NotReady("invite details"));
    }

    let details = if abbreviated {
        json!({
            "id": object.thread_id,
            "l": object.source_id,
            "rk": [object.pw_did],
            "se": SERVICE_ENDPOINT,
        })
    } else {
        json!({
            "@type": "https://didcomm.org/connections/1.0/invitation",
            "@id": object.thread_id,
            "label": object.source_id,
            "recipientKeys": [object.pw_did],
            "routingKeys": [],
            "serviceEndpoint": SERVICE_ENDPOINT,
        })
    };
    Ok(details.to_string())
}

/// Mutable view of the object's data; absent data becomes `{}`.
fn fields(object: &mut SimObject) -> SimResult<&mut Map<String, Value>> {
    if object.data.is_null() {
        object.data = json!({});
    }
    let kind = object.kind;
    object.data.as_object_mut().ok_or(SimError::MalformedData(kind))
}

fn push(object: &mut SimObject, field: &str, value: Value) -> SimResult<()> {
    let slot = fields(object)?.entry(field).or_insert(Value::Null);
    if !slot.is_array() {
        *slot = json!([]);
    }
    if let Value::Array(items) = slot {
        items.push(value);
    }
    Ok(())
}

/// Run `call` against the table and wallet state.
pub fn execute(table: &ObjectTable, wallets: &Wallets, call: &NativeCall) -> SimResult<Payload> {
    use NativeCall::*;
    use ObjectKind as K;

    let payload = match call {
        CreateWallet { config } => {
            wallets.create(config)?;
            Payload::Unit
        }
        OpenMainWallet { config } => Payload::Handle(wallets.open(config)?),
        CloseMainWallet => {
            wallets.close()?;
            Payload::Unit
        }
        OpenMainPool { config } => {
            wallets.open_pool(config)?;
            Payload::Unit
        }

        Serialize { kind, handle } => {
            let object = table.snapshot(*kind, *handle)?;
            Payload::String(serde_json::to_string(&object)?)
        }
        Deserialize { kind, data } => {
            let object: SimObject = serde_json::from_str(data)?;
            if object.kind != *kind {
                return Err(SimError::WrongKind {
                    expected: *kind,
                    found: object.kind,
                });
            }
            if !(object.data.is_null() || object.data.is_object()) {
                return Err(SimError::MalformedData(object.kind));
            }
            Payload::Handle(table.insert(object))
        }
        GetState { kind, handle } => {
            if !kind.has_state() {
                return Err(SimError::NotSupported("get state"));
            }
            Payload::State(table.snapshot(*kind, *handle)?.state.code())
        }
        UpdateState {
            kind,
            handle,
            connection,
        } => {
            if *kind != K::Connection {
                let connection = connection.ok_or(SimError::InvalidHandle {
                    kind: K::Connection,
                    handle: 0,
                })?;
                table.snapshot(K::Connection, connection)?;
            }
            Payload::State(step(table, *kind, *handle, Step::Update)?.code())
        }
        GetThreadId { kind, handle } => {
            Payload::String(table.snapshot(*kind, *handle)?.thread_id.to_string())
        }

        ConnectionCreate { source_id } => Payload::Handle(table.insert(SimObject::new(
            K::Connection,
            source_id,
            initial_state(K::Connection),
            json!({"role": "inviter"}),
        ))),
        ConnectionCreateWithInvite { source_id, invite } => {
            let invite = parse(invite)?;
            let object = SimObject::new(
                K::Connection,
                source_id,
                ObjectState::REQUEST_RECEIVED,
                json!({"role": "invitee", "invite": invite.clone()}),
            )
            .with_thread_from(&invite);
            Payload::Handle(table.insert(object))
        }
        ConnectionConnect { handle, options } => {
            if let Some(options) = options {
                parse_options(options)?;
            }
            let details = table.with(K::Connection, *handle, |object| {
                object.state = transition(K::Connection, object.state, Step::Connect)?;
                invite_details(object, false)
            })?;
            Payload::String(details)
        }
        ConnectionUpdateStateWithMessage { handle, message } => {
            parse(message)?;
            Payload::State(step(table, K::Connection, *handle, Step::Update)?.code())
        }
        ConnectionInviteDetails {
            handle,
            abbreviated,
        } => {
            let object = table.snapshot(K::Connection, *handle)?;
            Payload::String(invite_details(&object, *abbreviated)?)
        }
        ConnectionGetPwDid { handle } => {
            Payload::String(table.snapshot(K::Connection, *handle)?.pw_did)
        }
        ConnectionSendMessage {
            handle,
            message,
            options,
        } => {
            parse_options(options)?;
            require_connection(table, *handle)?;
            let message_id = Uuid::new_v4();
            table.with(K::Connection, *handle, |object| {
                push(object, "sent", json!({"id": message_id, "message": message}))
            })?;
            Payload::String(message_id.to_string())
        }
        ConnectionDelete { handle } => {
            if !table.remove(K::Connection, *handle) {
                return Err(SimError::InvalidHandle {
                    kind: K::Connection,
                    handle: *handle,
                });
            }
            Payload::Unit
        }

        OutOfBandSenderCreate { config } => {
            let config = parse(config)?;
            let source_id = config["source_id"].as_str().unwrap_or_default().to_string();
            let object = SimObject::new(
                K::OutOfBandSender,
                &source_id,
                initial_state(K::OutOfBandSender),
                json!({
                    "label": config["label"],
                    "goal": config["goal"],
                    "requests": [],
                    "services": [],
                }),
            );
            Payload::Handle(table.insert(object))
        }
        OutOfBandSenderAppendMessage { handle, message } => {
            let message = parse(message)?;
            table.with(K::OutOfBandSender, *handle, |object| {
                push(object, "requests", message)
            })?;
            Payload::Unit
        }
        OutOfBandSenderAppendService { handle, service } => {
            let service = parse(service)?;
            table.with(K::OutOfBandSender, *handle, |object| {
                push(object, "services", service)
            })?;
            Payload::Unit
        }
        OutOfBandToMessage { handle } => {
            let object = table.snapshot(K::OutOfBandSender, *handle)?;
            let message = json!({
                "@type": "https://didcomm.org/out-of-band/1.1/invitation",
                "@id": object.thread_id,
                "label": object.data["label"],
                "goal": object.data["goal"],
                "handshake_protocols": ["https://didcomm.org/connections/1.0"],
                "requests~attach": object.data["requests"],
                "services": object.data["services"],
            });
            Payload::String(message.to_string())
        }
        OutOfBandReceiverCreate { message } => {
            let message = parse(message)?;
            let object = SimObject::new(
                K::OutOfBandReceiver,
                "",
                initial_state(K::OutOfBandReceiver),
                json!({"message": message.clone()}),
            )
            .with_thread_from(&message);
            Payload::Handle(table.insert(object))
        }
        OutOfBandReceiverExtractMessage { handle } => {
            let object = table.snapshot(K::OutOfBandReceiver, *handle)?;
            let attached = &object.data["message"]["requests~attach"][0];
            Payload::String(if attached.is_null() {
                String::new()
            } else {
                attached.to_string()
            })
        }
        OutOfBandReceiverConnectionExists {
            handle,
            connections,
        } => {
            let invitation = table.snapshot(K::OutOfBandReceiver, *handle)?.thread_id;
            let mut found = None;
            for connection in connections {
                let object = table.snapshot(K::Connection, *connection)?;
                if found.is_none() && object.data["oob_id"] == json!(invitation) {
                    found = Some(*connection);
                }
            }
            match found {
                Some(connection) => Payload::HandleAndBool(connection, true),
                None => Payload::HandleAndBool(0, false),
            }
        }
        OutOfBandReceiverBuildConnection { handle } => {
            let receiver = table.snapshot(K::OutOfBandReceiver, *handle)?;
            let mut connection = SimObject::new(
                K::Connection,
                &receiver.source_id,
                ObjectState::REQUEST_RECEIVED,
                json!({
                    "role": "invitee",
                    "oob_id": receiver.thread_id,
                    "invite": receiver.data["message"],
                }),
            );
            connection.thread_id = receiver.thread_id;
            Payload::String(serde_json::to_string(&connection)?)
        }

        CredentialCreateWithOffer { source_id, offer } => {
            let offer = parse(offer)?;
            let object = SimObject::new(
                K::Credential,
                source_id,
                initial_state(K::Credential),
                json!({"offer": offer.clone()}),
            )
            .with_thread_from(&offer);
            Payload::Handle(table.insert(object))
        }
        CredentialSendRequest { handle, connection } => {
            require_connection(table, *connection)?;
            step(table, K::Credential, *handle, Step::SendRequest)?;
            Payload::Unit
        }
        CredentialGetAttributes { handle } => {
            let object = table.snapshot(K::Credential, *handle)?;
            if object.state != ObjectState::ACCEPTED {
                return Err(SimError::NotReady("credential"));
            }
            let offer = &object.data["offer"];
            let attrs = if offer["credential_attrs"].is_null() {
                json!({})
            } else {
                offer["credential_attrs"].clone()
            };
            Payload::String(attrs.to_string())
        }

        IssuerCredentialCreate { source_id } => Payload::Handle(table.insert(SimObject::new(
            K::IssuerCredential,
            source_id,
            initial_state(K::IssuerCredential),
            json!({"revokable": false}),
        ))),
        IssuerCredentialSendOffer { handle, connection } => {
            require_connection(table, *connection)?;
            step(table, K::IssuerCredential, *handle, Step::SendOffer)?;
            Payload::Unit
        }
        IssuerCredentialSendCredential { handle, connection } => {
            require_connection(table, *connection)?;
            Payload::State(step(table, K::IssuerCredential, *handle, Step::SendCredential)?.code())
        }
        IssuerCredentialIsRevokable { handle } => {
            let object = table.snapshot(K::IssuerCredential, *handle)?;
            Payload::Bool(object.data["revokable"].as_bool().unwrap_or(false))
        }

        ProofCreate {
            source_id,
            requested_attrs,
            requested_predicates,
            revocation_interval,
            name,
        } => {
            let object = SimObject::new(
                K::Proof,
                source_id,
                initial_state(K::Proof),
                json!({
                    "name": name,
                    "requested_attrs": parse(requested_attrs)?,
                    "requested_predicates": parse_options(requested_predicates)?,
                    "revocation_interval": parse_options(revocation_interval)?,
                }),
            );
            Payload::Handle(table.insert(object))
        }
        ProofSendRequest { handle, connection } => {
            require_connection(table, *connection)?;
            step(table, K::Proof, *handle, Step::SendRequest)?;
            Payload::Unit
        }
        ProofGetPresentation { handle } => {
            let object = table.snapshot(K::Proof, *handle)?;
            if object.state != ObjectState::ACCEPTED {
                return Err(SimError::NotReady("presentation"));
            }
            let revealed: serde_json::Map<String, Value> = object.data["requested_attrs"]
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|attr| attr["name"].as_str())
                .map(|name| (name.to_string(), json!({"raw": "", "encoded": ""})))
                .collect();
            let presentation = json!({
                "@id": object.thread_id,
                "requested_proof": {"revealed_attrs": revealed},
            });
            Payload::StateAndString(PROOF_VERIFIED, presentation.to_string())
        }

        DisclosedProofCreateWithRequest { source_id, request } => {
            let request = parse(request)?;
            let object = SimObject::new(
                K::DisclosedProof,
                source_id,
                initial_state(K::DisclosedProof),
                json!({"request": request.clone(), "generated": false}),
            )
            .with_thread_from(&request);
            Payload::Handle(table.insert(object))
        }
        DisclosedProofRetrieveCredentials { handle } => {
            let object = table.snapshot(K::DisclosedProof, *handle)?;
            let attrs: serde_json::Map<String, Value> = object.data["request"]
                ["requested_attributes"]
                .as_object()
                .into_iter()
                .flatten()
                .map(|(referent, _)| (referent.clone(), json!([])))
                .collect();
            Payload::String(json!({ "attrs": attrs }).to_string())
        }
        DisclosedProofGenerateProof {
            handle,
            selected_credentials,
            self_attested_attrs,
        } => {
            parse(selected_credentials)?;
            parse_options(self_attested_attrs)?;
            table.with(K::DisclosedProof, *handle, |object| {
                if object.state != ObjectState::REQUEST_RECEIVED {
                    return Err(SimError::InvalidState {
                        kind: K::DisclosedProof,
                        state: object.state,
                        action: "generate proof",
                    });
                }
                fields(object)?.insert("generated".to_string(), json!(true));
                Ok(())
            })?;
            Payload::Unit
        }
        DisclosedProofSendProof { handle, connection } => {
            require_connection(table, *connection)?;
            let generated = table.snapshot(K::DisclosedProof, *handle)?.data["generated"]
                .as_bool()
                .unwrap_or(false);
            if !generated {
                return Err(SimError::NotReady("presentation"));
            }
            step(table, K::DisclosedProof, *handle, Step::SendProof)?;
            Payload::Unit
        }
    };
    Ok(payload)
}

/// Code `call` is refused with synchronously, if any.
pub fn precheck(table: &ObjectTable, call: &NativeCall, reject_blank: bool) -> Option<ErrorCode> {
    if reject_blank {
        if let Some(name) = blank_argument(call) {
            tracing::debug!(operation = call.name(), argument = name, "Blank argument refused");
            return Some(ErrorCode::INVALID_OPTION);
        }
    }

    if let NativeCall::GetState { kind, .. } | NativeCall::UpdateState { kind, .. } = call {
        if !kind.has_state() {
            return Some(ErrorCode::ACTION_NOT_SUPPORTED);
        }
    }

    match target(call) {
        Some((kind, handle)) if !table.contains(kind, handle) => Some(kind.invalid_handle_code()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(table: &ObjectTable, call: NativeCall) -> SimResult<Payload> {
        execute(table, &Wallets::default(), &call)
    }

    fn handle(payload: Payload) -> u32 {
        match payload {
            Payload::Handle(handle) => handle,
            other => panic!("expected handle, got {other:?}"),
        }
    }

    fn accepted_connection(table: &ObjectTable) -> u32 {
        let conn = handle(
            run(table, NativeCall::ConnectionCreate { source_id: "alice".into() }).unwrap(),
        );
        run(table, NativeCall::ConnectionConnect { handle: conn, options: None }).unwrap();
        for _ in 0..2 {
            run(
                table,
                NativeCall::UpdateState {
                    kind: ObjectKind::Connection,
                    handle: conn,
                    connection: None,
                },
            )
            .unwrap();
        }
        conn
    }

    #[test]
    fn blank_arguments_are_found() {
        let call = NativeCall::ConnectionCreateWithInvite {
            source_id: "bob".into(),
            invite: "  ".into(),
        };
        assert_eq!(blank_argument(&call), Some("invite"));
        assert_eq!(blank_argument(&NativeCall::CloseMainWallet), None);
    }

    #[test]
    fn precheck_refuses_unknown_handles() {
        let table = ObjectTable::new();
        let call = NativeCall::ProofSendRequest { handle: 9, connection: 1 };
        assert_eq!(precheck(&table, &call, true), Some(ErrorCode::INVALID_PROOF_HANDLE));

        let call = NativeCall::GetState { kind: ObjectKind::OutOfBandSender, handle: 9 };
        assert_eq!(precheck(&table, &call, true), Some(ErrorCode::ACTION_NOT_SUPPORTED));

        let call = NativeCall::ConnectionCreate { source_id: "".into() };
        assert_eq!(precheck(&table, &call, true), Some(ErrorCode::INVALID_OPTION));
        assert_eq!(precheck(&table, &call, false), None);
    }

    #[test]
    fn connection_serialize_round_trip() {
        let table = ObjectTable::new();
        let conn = accepted_connection(&table);

        let Payload::String(json) = run(
            &table,
            NativeCall::Serialize { kind: ObjectKind::Connection, handle: conn },
        )
        .unwrap() else {
            panic!("expected string");
        };
        let copy = handle(
            run(&table, NativeCall::Deserialize { kind: ObjectKind::Connection, data: json.clone() })
                .unwrap(),
        );
        assert_ne!(copy, conn);
        assert_eq!(
            table.snapshot(ObjectKind::Connection, copy).unwrap().state,
            ObjectState::ACCEPTED
        );

        let err = run(&table, NativeCall::Deserialize { kind: ObjectKind::Proof, data: json })
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::INVALID_JSON);
    }

    #[test]
    fn non_object_data_is_refused() {
        let table = ObjectTable::new();
        let sender = table.insert(SimObject::new(
            ObjectKind::OutOfBandSender,
            "oob",
            initial_state(ObjectKind::OutOfBandSender),
            json!([1]),
        ));
        let err = run(
            &table,
            NativeCall::OutOfBandSenderAppendMessage {
                handle: sender,
                message: "{}".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, SimError::MalformedData(ObjectKind::OutOfBandSender)));
        assert_eq!(err.code(), ErrorCode::INVALID_JSON);

        let Payload::String(json) = run(
            &table,
            NativeCall::Serialize { kind: ObjectKind::OutOfBandSender, handle: sender },
        )
        .unwrap() else {
            panic!("expected string");
        };
        let err = run(
            &table,
            NativeCall::Deserialize { kind: ObjectKind::OutOfBandSender, data: json },
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::INVALID_JSON);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn send_requires_accepted_connection() {
        let table = ObjectTable::new();
        let conn = handle(
            run(&table, NativeCall::ConnectionCreate { source_id: "alice".into() }).unwrap(),
        );
        let cred = handle(
            run(&table, NativeCall::IssuerCredentialCreate { source_id: "degree".into() }).unwrap(),
        );
        let err = run(
            &table,
            NativeCall::IssuerCredentialSendOffer { handle: cred, connection: conn },
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NOT_READY);
    }

    #[test]
    fn issuance_over_connection() {
        let table = ObjectTable::new();
        let conn = accepted_connection(&table);
        let cred = handle(
            run(&table, NativeCall::IssuerCredentialCreate { source_id: "degree".into() }).unwrap(),
        );

        run(&table, NativeCall::IssuerCredentialSendOffer { handle: cred, connection: conn })
            .unwrap();
        let state = run(
            &table,
            NativeCall::UpdateState {
                kind: ObjectKind::IssuerCredential,
                handle: cred,
                connection: Some(conn),
            },
        )
        .unwrap();
        assert_eq!(state, Payload::State(ObjectState::REQUEST_RECEIVED.code()));

        let state = run(
            &table,
            NativeCall::IssuerCredentialSendCredential { handle: cred, connection: conn },
        )
        .unwrap();
        assert_eq!(state, Payload::State(ObjectState::ACCEPTED.code()));
    }

    #[test]
    fn out_of_band_reuse() {
        let table = ObjectTable::new();
        let sender = handle(
            run(&table, NativeCall::OutOfBandSenderCreate { config: r#"{"label":"faber"}"#.into() })
                .unwrap(),
        );
        run(
            &table,
            NativeCall::OutOfBandSenderAppendMessage {
                handle: sender,
                message: r#"{"@type":"ping"}"#.into(),
            },
        )
        .unwrap();
        let Payload::String(message) =
            run(&table, NativeCall::OutOfBandToMessage { handle: sender }).unwrap()
        else {
            panic!("expected string");
        };

        let receiver =
            handle(run(&table, NativeCall::OutOfBandReceiverCreate { message }).unwrap());
        assert_eq!(
            run(&table, NativeCall::OutOfBandReceiverExtractMessage { handle: receiver }).unwrap(),
            Payload::String(r#"{"@type":"ping"}"#.into())
        );

        let Payload::String(serialized) =
            run(&table, NativeCall::OutOfBandReceiverBuildConnection { handle: receiver }).unwrap()
        else {
            panic!("expected string");
        };
        let unrelated = accepted_connection(&table);
        let built = handle(
            run(
                &table,
                NativeCall::Deserialize { kind: ObjectKind::Connection, data: serialized },
            )
            .unwrap(),
        );

        let found = run(
            &table,
            NativeCall::OutOfBandReceiverConnectionExists {
                handle: receiver,
                connections: vec![unrelated, built],
            },
        )
        .unwrap();
        assert_eq!(found, Payload::HandleAndBool(built, true));

        let missing = run(
            &table,
            NativeCall::OutOfBandReceiverConnectionExists {
                handle: receiver,
                connections: vec![unrelated],
            },
        )
        .unwrap();
        assert_eq!(missing, Payload::HandleAndBool(0, false));
    }

    #[test]
    fn presentation_requires_generated_proof() {
        let table = ObjectTable::new();
        let conn = accepted_connection(&table);
        let request = r#"{"@id":"6a2e7b44-8f7d-4c1e-9b2a-0c4f5d3e2a10","requested_attributes":{"name_0":{"name":"name"}}}"#;
        let proof = handle(
            run(
                &table,
                NativeCall::DisclosedProofCreateWithRequest {
                    source_id: "prover".into(),
                    request: request.into(),
                },
            )
            .unwrap(),
        );

        let err = run(&table, NativeCall::DisclosedProofSendProof { handle: proof, connection: conn })
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NOT_READY);

        let creds = run(&table, NativeCall::DisclosedProofRetrieveCredentials { handle: proof })
            .unwrap();
        assert_eq!(creds, Payload::String(r#"{"attrs":{"name_0":[]}}"#.into()));

        run(
            &table,
            NativeCall::DisclosedProofGenerateProof {
                handle: proof,
                selected_credentials: "{}".into(),
                self_attested_attrs: "{}".into(),
            },
        )
        .unwrap();
        run(&table, NativeCall::DisclosedProofSendProof { handle: proof, connection: conn })
            .unwrap();
        assert_eq!(
            table.snapshot(ObjectKind::DisclosedProof, proof).unwrap().state,
            ObjectState::OFFER_SENT
        );
    }
}
