//! Pairwise connections.

use tracing::debug;
use vcx_core::{Bridge, BridgeResult, NativeCall, ObjectKind, ObjectState};

use crate::config::WaitPolicy;
use crate::guard;
use crate::object::{vcx_object, ObjectHandle, VcxObject};
use crate::wait::{wait_for_state, CancelToken};

/// A connection to another agent.
#[derive(Debug)]
pub struct Connection {
    object: ObjectHandle,
}

vcx_object!(Connection, ObjectKind::Connection);

impl Connection {
    /// Create an inviting connection.
    pub async fn create(bridge: &Bridge, source_id: &str) -> BridgeResult<Self> {
        guard::no_nul("source_id", source_id)?;
        let call = NativeCall::ConnectionCreate {
            source_id: source_id.to_string(),
        };
        let object = ObjectHandle::create(bridge, Self::KIND, call).await?;
        debug!(handle = object.handle(), source_id, "Created connection");
        Ok(Self { object })
    }

    /// Create a connection from a received invitation.
    pub async fn create_with_invite(
        bridge: &Bridge,
        source_id: &str,
        invite: &str,
    ) -> BridgeResult<Self> {
        guard::no_nul("source_id", source_id)?;
        guard::not_blank("invite", invite)?;
        let call = NativeCall::ConnectionCreateWithInvite {
            source_id: source_id.to_string(),
            invite: invite.to_string(),
        };
        let object = ObjectHandle::create(bridge, Self::KIND, call).await?;
        Ok(Self { object })
    }

    pub async fn deserialize(bridge: &Bridge, data: &str) -> BridgeResult<Self> {
        let object = ObjectHandle::deserialize(bridge, Self::KIND, data).await?;
        Ok(Self { object })
    }

    /// Start the handshake. Returns the invite details.
    pub async fn connect(&self) -> BridgeResult<String> {
        self.object
            .call(NativeCall::ConnectionConnect {
                handle: self.handle(),
                options: None,
            })
            .await
    }

    /// [`connect`](Self::connect) with a JSON options document.
    pub async fn connect_with_options(&self, options: &str) -> BridgeResult<String> {
        guard::no_nul("options", options)?;
        self.object
            .call(NativeCall::ConnectionConnect {
                handle: self.handle(),
                options: Some(options.to_string()),
            })
            .await
    }

    /// Poll the agency and advance the handshake.
    pub async fn update_state(&self) -> BridgeResult<ObjectState> {
        self.object.update_state(None).await
    }

    /// Advance the handshake with a message received out of band.
    pub async fn update_state_with_message(&self, message: &str) -> BridgeResult<ObjectState> {
        guard::not_blank("message", message)?;
        self.object
            .call(NativeCall::ConnectionUpdateStateWithMessage {
                handle: self.handle(),
                message: message.to_string(),
            })
            .await
    }

    pub async fn get_state(&self) -> BridgeResult<ObjectState> {
        self.object.get_state().await
    }

    pub async fn serialize(&self) -> BridgeResult<String> {
        self.object.serialize().await
    }

    pub async fn invite_details(&self, abbreviated: bool) -> BridgeResult<String> {
        self.object
            .call(NativeCall::ConnectionInviteDetails {
                handle: self.handle(),
                abbreviated,
            })
            .await
    }

    pub async fn get_thread_id(&self) -> BridgeResult<String> {
        self.object.get_thread_id().await
    }

    /// Our pairwise DID.
    pub async fn get_pw_did(&self) -> BridgeResult<String> {
        self.object
            .call(NativeCall::ConnectionGetPwDid {
                handle: self.handle(),
            })
            .await
    }

    /// Send a generic message. Returns the message id.
    pub async fn send_message(&self, message: &str, options: &str) -> BridgeResult<String> {
        guard::not_blank("message", message)?;
        guard::no_nul("options", options)?;
        self.object
            .call(NativeCall::ConnectionSendMessage {
                handle: self.handle(),
                message: message.to_string(),
                options: options.to_string(),
            })
            .await
    }

    /// Delete the connection. The handle is gone afterwards.
    pub async fn delete(self) -> BridgeResult<()> {
        self.object
            .call::<()>(NativeCall::ConnectionDelete {
                handle: self.handle(),
            })
            .await?;
        let handle = self.into_raw();
        debug!(handle, "Deleted connection");
        Ok(())
    }

    /// Call [`update_state`](Self::update_state) until it reports `target`.
    pub async fn wait_for_state(
        &self,
        target: ObjectState,
        policy: &WaitPolicy,
    ) -> BridgeResult<ObjectState> {
        self.wait_for_state_or_cancel(target, policy, None).await
    }

    pub async fn wait_for_state_or_cancel(
        &self,
        target: ObjectState,
        policy: &WaitPolicy,
        cancel: Option<&CancelToken>,
    ) -> BridgeResult<ObjectState> {
        wait_for_state(|| self.update_state(), |state| state == target, policy, cancel).await
    }
}
