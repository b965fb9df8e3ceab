//! Out-of-band invitations.
//!
//! Out-of-band objects carry no protocol state; `get_state` and
//! `update_state` are not offered for them.

use vcx_core::{Bridge, BridgeResult, NativeCall, ObjectKind, RawHandle};

use crate::connection::Connection;
use crate::guard;
use crate::object::{vcx_object, ObjectHandle, VcxObject};

/// Builds an out-of-band invitation.
#[derive(Debug)]
pub struct OutOfBandSender {
    object: ObjectHandle,
}

vcx_object!(OutOfBandSender, ObjectKind::OutOfBandSender);

impl OutOfBandSender {
    /// `config` is a JSON document with `source_id`, `label`, `goal_code`
    /// and `goal`.
    pub async fn create(bridge: &Bridge, config: &str) -> BridgeResult<Self> {
        guard::not_blank("config", config)?;
        let call = NativeCall::OutOfBandSenderCreate {
            config: config.to_string(),
        };
        let object = ObjectHandle::create(bridge, Self::KIND, call).await?;
        Ok(Self { object })
    }

    pub async fn deserialize(bridge: &Bridge, data: &str) -> BridgeResult<Self> {
        let object = ObjectHandle::deserialize(bridge, Self::KIND, data).await?;
        Ok(Self { object })
    }

    /// Attach a protocol message to the invitation.
    pub async fn append_message(&self, message: &str) -> BridgeResult<()> {
        guard::not_blank("message", message)?;
        self.object
            .call(NativeCall::OutOfBandSenderAppendMessage {
                handle: self.handle(),
                message: message.to_string(),
            })
            .await
    }

    pub async fn append_service(&self, service: &str) -> BridgeResult<()> {
        guard::not_blank("service", service)?;
        self.object
            .call(NativeCall::OutOfBandSenderAppendService {
                handle: self.handle(),
                service: service.to_string(),
            })
            .await
    }

    pub async fn get_thread_id(&self) -> BridgeResult<String> {
        self.object.get_thread_id().await
    }

    /// The invitation message.
    pub async fn to_message(&self) -> BridgeResult<String> {
        self.object
            .call(NativeCall::OutOfBandToMessage {
                handle: self.handle(),
            })
            .await
    }

    pub async fn serialize(&self) -> BridgeResult<String> {
        self.object.serialize().await
    }
}

/// A received out-of-band invitation.
#[derive(Debug)]
pub struct OutOfBandReceiver {
    object: ObjectHandle,
}

vcx_object!(OutOfBandReceiver, ObjectKind::OutOfBandReceiver);

impl OutOfBandReceiver {
    pub async fn create(bridge: &Bridge, message: &str) -> BridgeResult<Self> {
        guard::not_blank("message", message)?;
        let call = NativeCall::OutOfBandReceiverCreate {
            message: message.to_string(),
        };
        let object = ObjectHandle::create(bridge, Self::KIND, call).await?;
        Ok(Self { object })
    }

    pub async fn deserialize(bridge: &Bridge, data: &str) -> BridgeResult<Self> {
        let object = ObjectHandle::deserialize(bridge, Self::KIND, data).await?;
        Ok(Self { object })
    }

    pub async fn get_thread_id(&self) -> BridgeResult<String> {
        self.object.get_thread_id().await
    }

    /// The first attached message, or an empty string.
    pub async fn extract_message(&self) -> BridgeResult<String> {
        self.object
            .call(NativeCall::OutOfBandReceiverExtractMessage {
                handle: self.handle(),
            })
            .await
    }

    /// Handle of the first of `connections` made from this invitation.
    pub async fn connection_exists(
        &self,
        connections: &[&Connection],
    ) -> BridgeResult<Option<u32>> {
        let call = NativeCall::OutOfBandReceiverConnectionExists {
            handle: self.handle(),
            connections: connections.iter().map(|c| c.handle()).collect(),
        };
        let (RawHandle(handle), found) = self.object.call::<(RawHandle, bool)>(call).await?;
        Ok(found.then_some(handle))
    }

    /// Serialized connection for this invitation; load it with
    /// [`Connection::deserialize`].
    pub async fn build_connection(&self) -> BridgeResult<String> {
        self.object
            .call(NativeCall::OutOfBandReceiverBuildConnection {
                handle: self.handle(),
            })
            .await
    }

    pub async fn serialize(&self) -> BridgeResult<String> {
        self.object.serialize().await
    }
}
