//! Credentials on the issuer side.

use vcx_core::{Bridge, BridgeResult, NativeCall, ObjectKind, ObjectState};

use crate::connection::Connection;
use crate::guard;
use crate::object::{vcx_object, ObjectHandle, VcxObject};

/// A credential being issued.
#[derive(Debug)]
pub struct IssuerCredential {
    object: ObjectHandle,
}

vcx_object!(IssuerCredential, ObjectKind::IssuerCredential);

impl IssuerCredential {
    pub async fn create(bridge: &Bridge, source_id: &str) -> BridgeResult<Self> {
        guard::no_nul("source_id", source_id)?;
        let call = NativeCall::IssuerCredentialCreate {
            source_id: source_id.to_string(),
        };
        let object = ObjectHandle::create(bridge, Self::KIND, call).await?;
        Ok(Self { object })
    }

    pub async fn deserialize(bridge: &Bridge, data: &str) -> BridgeResult<Self> {
        let object = ObjectHandle::deserialize(bridge, Self::KIND, data).await?;
        Ok(Self { object })
    }

    pub async fn send_offer(&self, connection: &Connection) -> BridgeResult<()> {
        self.object
            .call(NativeCall::IssuerCredentialSendOffer {
                handle: self.handle(),
                connection: connection.handle(),
            })
            .await
    }

    /// Send the credential once the holder has requested it. Returns the
    /// new state.
    pub async fn send_credential(&self, connection: &Connection) -> BridgeResult<ObjectState> {
        self.object
            .call(NativeCall::IssuerCredentialSendCredential {
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

    pub async fn is_revokable(&self) -> BridgeResult<bool> {
        self.object
            .call(NativeCall::IssuerCredentialIsRevokable {
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
