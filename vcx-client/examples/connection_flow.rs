//! Two agents connect and exchange a credential over the simulated library.
//!
//! Run with: cargo run -p vcx-client --example connection_flow
//!
//! Timeouts and polling come from the environment, e.g.
//!   VCX_CALL_TIMEOUT_MS=2000 VCX_POLL_INITIAL_MS=5 cargo run -p vcx-client --example connection_flow

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use vcx_client::{
    ClientConfig, Connection, Credential, IssuerCredential, ObjectState, Vcx, VcxObject,
};
use vcx_sim::{SimConfig, SimLibrary};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let sim = Arc::new(SimLibrary::new(SimConfig::default().with_latency(
        Duration::from_millis(5),
        Duration::from_millis(20),
    )));
    let config = ClientConfig::from_env()?;
    let vcx = Vcx::with_config(sim.clone(), config)?;
    println!(" Library version {}", vcx.version());

    let wallet = r#"{"wallet_name":"demo","wallet_key":"8dvfYSt5d1taSd6yJdpjq4emkwsPDDLYxkNFysFD2cZY"}"#;
    vcx.create_wallet(wallet).await?;
    vcx.open_main_wallet(wallet).await?;

    // Faber invites, Alice accepts
    let faber = Connection::create(vcx.bridge(), "faber").await?;
    let invite = faber.connect().await?;
    println!(" Invite: {}", invite);

    let alice = Connection::create_with_invite(vcx.bridge(), "alice", &invite).await?;
    alice.connect().await?;

    let (faber_state, alice_state) = tokio::try_join!(
        faber.wait_for_state(ObjectState::ACCEPTED, vcx.wait_policy()),
        alice.wait_for_state(ObjectState::ACCEPTED, vcx.wait_policy()),
    )?;
    println!(" Connected: faber {}, alice {}", faber_state, alice_state);

    // Faber issues a degree to Alice
    let issuer = IssuerCredential::create(vcx.bridge(), "degree").await?;
    issuer.send_offer(&faber).await?;

    let offer = json!({
        "@id": issuer.get_thread_id().await?,
        "credential_attrs": {"name": "Alice", "degree": "Maths"},
    });
    let credential =
        Credential::create_with_offer(vcx.bridge(), "degree", &offer.to_string()).await?;
    credential.send_request(&alice).await?;

    issuer.update_state(&faber).await?;
    let issued = issuer.send_credential(&faber).await?;
    let received = vcx_client::wait_for_state(
        || credential.update_state(&alice),
        |state| state == ObjectState::ACCEPTED,
        vcx.wait_policy(),
        None,
    )
    .await?;
    println!(" Issuer {}, holder {}", issued, received);
    println!(" Attributes: {}", credential.get_attributes().await?);

    // Hand the connection to storage and bring it back
    let saved = alice.serialize().await?;
    alice.release()?;
    let restored = Connection::deserialize(vcx.bridge(), &saved).await?;
    println!(" Restored connection in state {}", restored.get_state().await?);

    drop((faber, restored, issuer, credential));
    vcx.close_main_wallet().await?;

    let stats = vcx.bridge().stats();
    println!(
        "\n Calls: {} completed, {} pending, {} live objects",
        stats.completed,
        stats.pending,
        sim.live_objects()
    );

    vcx.shutdown(false)?;
    Ok(())
}
