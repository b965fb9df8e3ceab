//! Proofs on the prover side.

use vcx_core::{Bridge, BridgeResult, NativeCall, ObjectKind, ObjectState};

use crate::connection::Connection;
use crate::guard;
use crate::object::{vcx_object, ObjectHandle, VcxObject};

/// A proof being presented in answer to a request.
#[derive(Debug)]
pub struct DisclosedProof {
    object: ObjectHandle,
}

vcx_object!(DisclosedProof, ObjectKind::DisclosedProof);

impl DisclosedProof {
    pub async fn create_with_request(
        bridge: &Bridge,
        source_id: &str,
        request: &str,
    ) -> BridgeResult<Self> {
        guard::no_nul("source_id", source_id)?;
        guard::not_blank("request", request)?;
        let call = NativeCall::DisclosedProofCreateWithRequest {
            source_id: source_id.to_string(),
            request: request.to_string(),
        };
        let object = ObjectHandle::create(bridge, Self::KIND, call).await?;
        Ok(Self { object })
    }

    pub async fn deserialize(bridge: &Bridge, data: &str) -> BridgeResult<Self> {
        let object = ObjectHandle::deserialize(bridge, Self::KIND, data).await?;
        Ok(Self { object })
    }

    /// Wallet credentials matching each requested attribute.
    pub async fn retrieve_credentials(&self) -> BridgeResult<String> {
        self.object
            .call(NativeCall::DisclosedProofRetrieveCredentials {
                handle: self.handle(),
            })
            .await
    }

    pub async fn generate_proof(
        &self,
        selected_credentials: &str,
        self_attested_attrs: &str,
    ) -> BridgeResult<()> {
        guard::not_blank("selected_credentials", selected_credentials)?;
        guard::no_nul("self_attested_attrs", self_attested_attrs)?;
        self.object
            .call(NativeCall::DisclosedProofGenerateProof {
                handle: self.handle(),
                selected_credentials: selected_credentials.to_string(),
                self_attested_attrs: self_attested_attrs.to_string(),
            })
            .await
    }

    pub async fn send_proof(&self, connection: &Connection) -> BridgeResult<()> {
        self.object
            .call(NativeCall::DisclosedProofSendProof {
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

    pub async fn get_thread_id(&self) -> BridgeResult<String> {
        self.object.get_thread_id().await
    }

    pub async fn serialize(&self) -> BridgeResult<String> {
        self.object.serialize().await
    }
}
