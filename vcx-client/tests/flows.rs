//! Protocol walks across object families against the simulated library.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use vcx_client::{
    wait_for_state, BridgeError, CancelToken, Connection, Credential, DisclosedProof, ErrorCode,
    IssuerCredential, ObjectKind, ObjectState, OutOfBandReceiver, OutOfBandSender, Proof,
    ProofRequest, Vcx, VcxObject, WaitPolicy,
};
use vcx_sim::{SimConfig, SimLibrary, PROOF_VERIFIED};

fn start() -> (Arc<SimLibrary>, Vcx) {
    let sim = Arc::new(SimLibrary::new(SimConfig::default()));
    let vcx = Vcx::new(sim.clone()).unwrap();
    (sim, vcx)
}

fn quick() -> WaitPolicy {
    WaitPolicy::default().with_backoff(Duration::from_millis(1), Duration::from_millis(8), 2.0)
}

fn parse(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

/// Inviter and invitee connections, both `Accepted`.
async fn connected_pair(vcx: &Vcx) -> (Connection, Connection) {
    let inviter = Connection::create(vcx.bridge(), "faber").await.unwrap();
    let invite = inviter.connect().await.unwrap();

    let invitee = Connection::create_with_invite(vcx.bridge(), "alice", &invite)
        .await
        .unwrap();
    invitee.connect().await.unwrap();

    let policy = quick();
    inviter.wait_for_state(ObjectState::ACCEPTED, &policy).await.unwrap();
    invitee.wait_for_state(ObjectState::ACCEPTED, &policy).await.unwrap();
    (inviter, invitee)
}

#[tokio::test]
async fn connections_reach_accepted() {
    let (sim, vcx) = start();
    let (faber, alice) = connected_pair(&vcx).await;

    assert_eq!(faber.get_state().await.unwrap(), ObjectState::ACCEPTED);
    assert_eq!(alice.get_state().await.unwrap(), ObjectState::ACCEPTED);
    assert_eq!(
        faber.get_thread_id().await.unwrap(),
        alice.get_thread_id().await.unwrap()
    );

    let abbreviated = parse(&faber.invite_details(true).await.unwrap());
    assert_eq!(abbreviated["l"], "faber");

    let message_id = alice
        .send_message(r#"{"content":"hello"}"#, r#"{"msg_type":"chat"}"#)
        .await
        .unwrap();
    assert!(!message_id.is_empty());

    drop((faber, alice));
    assert_eq!(sim.live_objects(), 0);
    assert_eq!(vcx.bridge().pending_count(), 0);
}

#[tokio::test]
async fn handshake_with_received_message() {
    let (_sim, vcx) = start();
    let faber = Connection::create(vcx.bridge(), "faber").await.unwrap();
    faber.connect().await.unwrap();

    let request = json!({"@type": "https://didcomm.org/connections/1.0/request"}).to_string();
    let state = faber.update_state_with_message(&request).await.unwrap();
    assert_eq!(state, ObjectState::REQUEST_RECEIVED);

    let err = faber.update_state_with_message("{not json").await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::INVALID_JSON));
}

#[tokio::test]
async fn credential_issuance() {
    let (_sim, vcx) = start();
    let (faber, alice) = connected_pair(&vcx).await;

    let issuer = IssuerCredential::create(vcx.bridge(), "degree").await.unwrap();
    assert_eq!(issuer.get_state().await.unwrap(), ObjectState::INITIALIZED);
    assert!(!issuer.is_revokable().await.unwrap());
    issuer.send_offer(&faber).await.unwrap();
    assert_eq!(issuer.get_state().await.unwrap(), ObjectState::OFFER_SENT);

    let offer = json!({
        "@id": issuer.get_thread_id().await.unwrap(),
        "credential_attrs": {"name": "Alice", "degree": "Maths"},
    })
    .to_string();
    let holder = Credential::create_with_offer(vcx.bridge(), "degree", &offer)
        .await
        .unwrap();
    assert_eq!(
        holder.get_thread_id().await.unwrap(),
        issuer.get_thread_id().await.unwrap()
    );
    assert_eq!(holder.get_state().await.unwrap(), ObjectState::REQUEST_RECEIVED);

    let err = holder.get_attributes().await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::NOT_READY));

    holder.send_request(&alice).await.unwrap();
    assert_eq!(issuer.update_state(&faber).await.unwrap(), ObjectState::REQUEST_RECEIVED);
    assert_eq!(issuer.send_credential(&faber).await.unwrap(), ObjectState::ACCEPTED);

    let policy = quick();
    let state = wait_for_state(
        || holder.update_state(&alice),
        |state| state == ObjectState::ACCEPTED,
        &policy,
        None,
    )
    .await
    .unwrap();
    assert_eq!(state, ObjectState::ACCEPTED);

    let attrs = parse(&holder.get_attributes().await.unwrap());
    assert_eq!(attrs, json!({"name": "Alice", "degree": "Maths"}));
}

#[tokio::test]
async fn sending_before_connected_fails() {
    let (_sim, vcx) = start();
    let faber = Connection::create(vcx.bridge(), "faber").await.unwrap();
    let issuer = IssuerCredential::create(vcx.bridge(), "degree").await.unwrap();

    let err = issuer.send_offer(&faber).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::NOT_READY));

    let err = issuer.send_credential(&faber).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::NOT_READY));
    assert_eq!(issuer.get_state().await.unwrap(), ObjectState::INITIALIZED);
}

#[tokio::test]
async fn proof_presentation() {
    let (_sim, vcx) = start();
    let (faber, alice) = connected_pair(&vcx).await;

    let request = ProofRequest::new("verifier", "degree proof", r#"[{"name":"degree"}]"#);
    let verifier = Proof::create(vcx.bridge(), &request).await.unwrap();
    verifier.send_request(&faber).await.unwrap();
    assert_eq!(verifier.get_state().await.unwrap(), ObjectState::OFFER_SENT);

    let presentation_request = json!({
        "@id": verifier.get_thread_id().await.unwrap(),
        "requested_attributes": {"attr_0": {"name": "degree"}},
    })
    .to_string();
    let prover = DisclosedProof::create_with_request(vcx.bridge(), "prover", &presentation_request)
        .await
        .unwrap();

    let credentials = parse(&prover.retrieve_credentials().await.unwrap());
    assert_eq!(credentials, json!({"attrs": {"attr_0": []}}));

    let err = prover.send_proof(&alice).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::NOT_READY));

    prover.generate_proof(r#"{"attrs":{}}"#, "{}").await.unwrap();
    prover.send_proof(&alice).await.unwrap();
    assert_eq!(prover.get_state().await.unwrap(), ObjectState::OFFER_SENT);

    assert_eq!(verifier.update_state(&faber).await.unwrap(), ObjectState::ACCEPTED);
    let presentation = verifier.get_proof().await.unwrap();
    assert_eq!(presentation.proof_state, PROOF_VERIFIED);
    let message = parse(&presentation.message);
    assert!(message["requested_proof"]["revealed_attrs"]["degree"].is_object());

    assert_eq!(prover.update_state(&alice).await.unwrap(), ObjectState::ACCEPTED);
}

#[tokio::test]
async fn out_of_band_invitation() {
    let (sim, vcx) = start();
    let (faber, _alice) = connected_pair(&vcx).await;

    let config = json!({"source_id": "oob", "label": "Faber College", "goal": "issue"});
    let sender = OutOfBandSender::create(vcx.bridge(), &config.to_string())
        .await
        .unwrap();
    let attached = json!({"@type": "https://didcomm.org/issue-credential/1.0/offer-credential"});
    sender.append_message(&attached.to_string()).await.unwrap();
    sender
        .append_service(r#"{"id":"did:example:faber;indy","type":"IndyAgent"}"#)
        .await
        .unwrap();

    let invitation = sender.to_message().await.unwrap();
    assert_eq!(parse(&invitation)["label"], "Faber College");

    let receiver = OutOfBandReceiver::create(vcx.bridge(), &invitation).await.unwrap();
    assert_eq!(
        receiver.get_thread_id().await.unwrap(),
        sender.get_thread_id().await.unwrap()
    );
    assert_eq!(parse(&receiver.extract_message().await.unwrap()), attached);

    assert_eq!(receiver.connection_exists(&[&faber]).await.unwrap(), None);
    let built = receiver.build_connection().await.unwrap();
    let connection = Connection::deserialize(vcx.bridge(), &built).await.unwrap();
    assert_eq!(connection.get_state().await.unwrap(), ObjectState::REQUEST_RECEIVED);

    let found = receiver
        .connection_exists(&[&faber, &connection])
        .await
        .unwrap();
    assert_eq!(found, Some(connection.handle()));

    let copy = OutOfBandSender::deserialize(vcx.bridge(), &sender.serialize().await.unwrap())
        .await
        .unwrap();
    assert_eq!(copy.to_message().await.unwrap(), invitation);
    assert_eq!(sim.live_objects_of(ObjectKind::OutOfBandSender), 2);
}

#[tokio::test]
async fn out_of_band_has_no_state() {
    let (_sim, vcx) = start();
    let sender = OutOfBandSender::create(vcx.bridge(), r#"{"source_id":"oob"}"#)
        .await
        .unwrap();

    let err = vcx
        .bridge()
        .call::<ObjectState>(vcx_core::NativeCall::GetState {
            kind: ObjectKind::OutOfBandSender,
            handle: sender.handle(),
        })
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::ACTION_NOT_SUPPORTED));
}

#[tokio::test]
async fn deserialize_checks_family() {
    let (_sim, vcx) = start();
    let issuer = IssuerCredential::create(vcx.bridge(), "degree").await.unwrap();
    let data = issuer.serialize().await.unwrap();

    let err = Proof::deserialize(vcx.bridge(), &data).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::INVALID_JSON));

    let err = Proof::deserialize(vcx.bridge(), "").await.unwrap_err();
    assert!(matches!(err, BridgeError::InvalidParameter { name: "data", .. }));

    let copy = IssuerCredential::deserialize(vcx.bridge(), &data).await.unwrap();
    assert_eq!(copy.get_state().await.unwrap(), ObjectState::INITIALIZED);
}

#[tokio::test]
async fn wait_is_cancellable_and_bounded() {
    let (_sim, vcx) = start();
    let faber = Connection::create(vcx.bridge(), "faber").await.unwrap();

    // Never connected, so updates keep reporting `Initialized`.
    let bounded = quick().with_max_attempts(4);
    let err = faber
        .wait_for_state(ObjectState::ACCEPTED, &bounded)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BridgeError::WaitExhausted {
            last_state: Some(ObjectState::INITIALIZED),
            attempts: 4
        }
    ));

    let token = CancelToken::new();
    let slow = WaitPolicy::default()
        .unlimited()
        .with_backoff(Duration::from_secs(30), Duration::from_secs(30), 1.0);
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });
    let err = faber
        .wait_for_state_or_cancel(ObjectState::ACCEPTED, &slow, Some(&token))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Cancelled));
    assert_eq!(vcx.bridge().pending_count(), 0);
}
