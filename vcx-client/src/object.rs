//! Ownership of native object handles.

use tracing::warn;
use vcx_core::{Bridge, BridgeResult, FromPayload, NativeCall, ObjectKind, ObjectState, RawHandle};

use crate::guard;

/// A live native object. Released when dropped unless handed off with
/// [`into_raw`](Self::into_raw).
#[derive(Debug)]
pub struct ObjectHandle {
    bridge: Bridge,
    kind: ObjectKind,
    /// Zero once ownership has been given up.
    handle: u32,
}

impl ObjectHandle {
    pub(crate) fn adopt(bridge: &Bridge, kind: ObjectKind, handle: u32) -> BridgeResult<Self> {
        guard::not_zero("handle", handle)?;
        Ok(Self {
            bridge: bridge.clone(),
            kind,
            handle,
        })
    }

    /// Issue a constructor call and take ownership of the handle it yields.
    pub(crate) async fn create(
        bridge: &Bridge,
        kind: ObjectKind,
        call: NativeCall,
    ) -> BridgeResult<Self> {
        let RawHandle(handle) = bridge.call::<RawHandle>(call)?.await?;
        Self::adopt(bridge, kind, handle)
    }

    pub(crate) async fn deserialize(
        bridge: &Bridge,
        kind: ObjectKind,
        data: &str,
    ) -> BridgeResult<Self> {
        guard::not_blank("data", data)?;
        Self::create(
            bridge,
            kind,
            NativeCall::Deserialize {
                kind,
                data: data.to_string(),
            },
        )
        .await
    }

    pub(crate) fn handle(&self) -> u32 {
        self.handle
    }

    pub(crate) async fn call<T: FromPayload>(&self, call: NativeCall) -> BridgeResult<T> {
        self.bridge.call::<T>(call)?.await
    }

    pub(crate) async fn serialize(&self) -> BridgeResult<String> {
        self.call(NativeCall::Serialize {
            kind: self.kind,
            handle: self.handle,
        })
        .await
    }

    pub(crate) async fn get_thread_id(&self) -> BridgeResult<String> {
        self.call(NativeCall::GetThreadId {
            kind: self.kind,
            handle: self.handle,
        })
        .await
    }

    pub(crate) async fn get_state(&self) -> BridgeResult<ObjectState> {
        self.call(NativeCall::GetState {
            kind: self.kind,
            handle: self.handle,
        })
        .await
    }

    pub(crate) async fn update_state(&self, connection: Option<u32>) -> BridgeResult<ObjectState> {
        self.call(NativeCall::UpdateState {
            kind: self.kind,
            handle: self.handle,
            connection,
        })
        .await
    }

    /// Give up ownership without releasing.
    pub(crate) fn into_raw(mut self) -> u32 {
        std::mem::take(&mut self.handle)
    }

    pub(crate) fn release(mut self) -> BridgeResult<()> {
        let handle = std::mem::take(&mut self.handle);
        self.bridge.release(self.kind, handle)
    }
}

impl Drop for ObjectHandle {
    fn drop(&mut self) {
        if self.handle == 0 {
            return;
        }
        if let Err(e) = self.bridge.release(self.kind, self.handle) {
            warn!(
                kind = %self.kind,
                handle = self.handle,
                error = %e,
                "Failed to release native object"
            );
        }
    }
}

/// Methods shared by every object family.
pub trait VcxObject: Sized {
    const KIND: ObjectKind;

    #[doc(hidden)]
    fn from_object(object: ObjectHandle) -> Self;

    #[doc(hidden)]
    fn object(&self) -> &ObjectHandle;

    #[doc(hidden)]
    fn into_object(self) -> ObjectHandle;

    /// Native handle of this object.
    fn handle(&self) -> u32 {
        self.object().handle()
    }

    /// Release the native object now, reporting failure.
    fn release(self) -> BridgeResult<()> {
        self.into_object().release()
    }

    /// Give up ownership; the caller must release the handle.
    fn into_raw(self) -> u32 {
        self.into_object().into_raw()
    }

    /// Take ownership of a handle obtained elsewhere.
    fn from_raw(bridge: &Bridge, handle: u32) -> BridgeResult<Self> {
        ObjectHandle::adopt(bridge, Self::KIND, handle).map(Self::from_object)
    }
}

/// Implements [`VcxObject`] for a struct whose only field is `object`.
macro_rules! vcx_object {
    ($family:ty, $kind:expr) => {
        impl $crate::object::VcxObject for $family {
            const KIND: vcx_core::ObjectKind = $kind;

            fn from_object(object: $crate::object::ObjectHandle) -> Self {
                Self { object }
            }

            fn object(&self) -> &$crate::object::ObjectHandle {
                &self.object
            }

            fn into_object(self) -> $crate::object::ObjectHandle {
                self.object
            }
        }
    };
}

pub(crate) use vcx_object;
