//! Credentials on the holder side.

use vcx_core::{Bridge, BridgeResult, NativeCall, ObjectKind, ObjectState};

use crate::connection::Connection;
use crate::guard;
use crate::object::{vcx_object, ObjectHandle, VcxObject};

/// A credential being received.
#[derive(Debug)]
pub struct Credential {
    object: ObjectHandle,
}

vcx_object!(Credential, ObjectKind::Credential);

impl Credential {
    /// Start from a received credential offer.
    pub async fn create_with_offer(
        bridge: &Bridge,
        source_id: &str,
        offer: &str,
    ) -> BridgeResult<Self> {
        guard::no_nul("source_id", source_id)?;
        guard::not_blank("offer", offer)?;
        let call = NativeCall::CredentialCreateWithOffer {
            source_id: source_id.to_string(),
            offer: offer.to_string(),
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
            .call(NativeCall::CredentialSendRequest {
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

    /// Attributes of the issued credential as JSON.
    pub async fn get_attributes(&self) -> BridgeResult<String> {
        self.object
            .call(NativeCall::CredentialGetAttributes {
                handle: self.handle(),
            })
            .await
    }

    pub async fn get_thread_id(&self) -> BridgeResult<String> {
        self.object.get_thread_id().await
    }

    pub async fn serialize(&self) -> BridgeResult<String> {
        self.object.serialize().await
    }
}
