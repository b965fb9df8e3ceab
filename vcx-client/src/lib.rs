//! vcx client - async object families over the libvcx bridge.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vcx_client::{Connection, NativeLibrary, ObjectState, Vcx, VcxObject};
//!
//! async fn invite(native: Arc<dyn NativeLibrary>) -> Result<(), Box<dyn std::error::Error>> {
//!     let vcx = Vcx::new(native)?;
//!
//!     let connection = Connection::create(vcx.bridge(), "alice").await?;
//!     let invite = connection.connect().await?;
//!     println!("Invite: {}", invite);
//!
//!     connection.wait_for_state(ObjectState::ACCEPTED, vcx.wait_policy()).await?;
//!     connection.release()?;
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod credential;
mod disclosed_proof;
mod guard;
mod issuer_credential;
mod object;
mod out_of_band;
mod proof;
mod vcx;
mod wait;

pub use config::{ClientConfig, WaitPolicy};
pub use connection::Connection;
pub use credential::Credential;
pub use disclosed_proof::DisclosedProof;
pub use issuer_credential::IssuerCredential;
pub use object::VcxObject;
pub use out_of_band::{OutOfBandReceiver, OutOfBandSender};
pub use proof::{Presentation, Proof, ProofRequest};
pub use vcx::Vcx;
pub use wait::{wait_for_state, CancelToken};

pub use vcx_core::{
    Bridge, BridgeConfig, BridgeError, BridgeResult, ErrorCode, NativeLibrary, ObjectKind,
    ObjectState,
};
#[cfg(feature = "libvcx")]
pub use vcx_core::LibVcx;
