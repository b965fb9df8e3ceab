//! Proof requests on the verifier side.

use serde::{Deserialize, Serialize};
use vcx_core::{Bridge, BridgeResult, NativeCall, ObjectKind, ObjectState};

use crate::connection::Connection;
use crate::guard;
use crate::object::{vcx_object, ObjectHandle, VcxObject};

/// What a proof request asks for. Each field is a JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequest {
    pub source_id: String,
    pub requested_attrs: String,
    #[serde(default)]
    pub requested_predicates: String,
    #[serde(default)]
    pub revocation_interval: String,
    pub name: String,
}

impl ProofRequest {
    pub fn new(
        source_id: impl Into<String>,
        name: impl Into<String>,
        requested_attrs: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            name: name.into(),
            requested_attrs: requested_attrs.into(),
            requested_predicates: "[]".to_string(),
            revocation_interval: "{}".to_string(),
        }
    }

    pub fn with_predicates(mut self, predicates: impl Into<String>) -> Self {
        self.requested_predicates = predicates.into();
        self
    }

    pub fn with_revocation_interval(mut self, interval: impl Into<String>) -> Self {
        self.revocation_interval = interval.into();
        self
    }
}

/// Verification outcome and the presentation it was reached from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    /// Proof state code (`1` verified).
    pub proof_state: u32,
    pub message: String,
}

/// A proof request being verified.
#[derive(Debug)]
pub struct Proof {
    object: ObjectHandle,
}

vcx_object!(Proof, ObjectKind::Proof);

impl Proof {
    pub async fn create(bridge: &Bridge, request: &ProofRequest) -> BridgeResult<Self> {
        guard::no_nul("source_id", &request.source_id)?;
        guard::not_blank("requested_attrs", &request.requested_attrs)?;
        guard::no_nul("requested_predicates", &request.requested_predicates)?;
        guard::no_nul("revocation_interval", &request.revocation_interval)?;
        guard::no_nul("name", &request.name)?;
        let call = NativeCall::ProofCreate {
            source_id: request.source_id.clone(),
            requested_attrs: request.requested_attrs.clone(),
            requested_predicates: request.requested_predicates.clone(),
            revocation_interval: request.revocation_interval.clone(),
            name: request.name.clone(),
        };
        let object = ObjectHandle::create(bridge, Self::KIND, call).await?;
        Ok(Self { object })
    }

    pub async fn deserialize(bridge: &Bridge, data: &str) -> BridgeResult<Self> {
        let object = ObjectHandle::deserialize(bridge, Self::KIND, data).await?;
        Ok(Self { object })
    }

    pub async fn send_request(&self, connection: &Connection) -> BridgeResult<()> {
        self.object
            .call(NativeCall::ProofSendRequest {
                handle: self.handle(),
                connection: connection.handle(),
            })
            .await
    }

    pub async fn update_state(&self, connection: &Connection) -> BridgeResult<ObjectState> {
        self.object.update_state(Some(connection.handle())).await
    }

    pub async fn get_state(&self) -> BridgeResult<ObjectState> {
        self.object.get_state().await
    }

    /// The received presentation.
    pub async fn get_proof(&self) -> BridgeResult<Presentation> {
        let (ObjectState(proof_state), message) = self
            .object
            .call::<(ObjectState, String)>(NativeCall::ProofGetPresentation {
                handle: self.handle(),
            })
            .await?;
        Ok(Presentation {
            proof_state,
            message,
        })
    }

    pub async fn get_thread_id(&self) -> BridgeResult<String> {
        self.object.get_thread_id().await
    }

    pub async fn serialize(&self) -> BridgeResult<String> {
        self.object.serialize().await
    }
}
