//! Object table of the simulated library.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use vcx_core::{ObjectKind, ObjectState};

use crate::error::{SimError, SimResult};

const SERIALIZE_VERSION: &str = "1.0";

/// A simulated native object, in the form `serialize` returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimObject {
    pub version: String,
    pub kind: ObjectKind,
    pub source_id: String,
    pub state: ObjectState,
    pub thread_id: Uuid,
    pub pw_did: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub data: Value,
}

impl SimObject {
    pub fn new(kind: ObjectKind, source_id: &str, state: ObjectState, data: Value) -> Self {
        Self {
            version: SERIALIZE_VERSION.to_string(),
            kind,
            source_id: source_id.to_string(),
            state,
            thread_id: Uuid::new_v4(),
            pw_did: pairwise_did(),
            created_at: Utc::now(),
            data,
        }
    }

    /// Use the thread id of a received message, if it carries one.
    pub fn with_thread_from(mut self, message: &Value) -> Self {
        if let Some(id) = message["@id"].as_str().and_then(|id| Uuid::parse_str(id).ok()) {
            self.thread_id = id;
        }
        self
    }
}

/// A DID-shaped identifier; 22 characters like an unqualified sov DID.
fn pairwise_did() -> String {
    Uuid::new_v4().simple().to_string()[..22].to_string()
}

/// Live objects keyed by handle.
#[derive(Debug)]
pub struct ObjectTable {
    objects: Mutex<HashMap<u32, SimObject>>,
    next_handle: AtomicU32,
}

impl Default for ObjectTable {
    fn default() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            next_handle: AtomicU32::new(1),
        }
    }
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `object` under a fresh handle.
    pub fn insert(&self, object: SimObject) -> u32 {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(kind = %object.kind, handle, "Created simulated object");
        self.objects.lock().insert(handle, object);
        handle
    }

    /// Whether `handle` names a live object of `kind`.
    pub fn contains(&self, kind: ObjectKind, handle: u32) -> bool {
        self.objects
            .lock()
            .get(&handle)
            .is_some_and(|object| object.kind == kind)
    }

    /// Run `f` on the object, holding the table lock.
    pub fn with<R>(
        &self,
        kind: ObjectKind,
        handle: u32,
        f: impl FnOnce(&mut SimObject) -> SimResult<R>,
    ) -> SimResult<R> {
        let mut objects = self.objects.lock();
        match objects.get_mut(&handle) {
            Some(object) if object.kind == kind => f(object),
            _ => Err(SimError::InvalidHandle { kind, handle }),
        }
    }

    /// Copy of the object.
    pub fn snapshot(&self, kind: ObjectKind, handle: u32) -> SimResult<SimObject> {
        self.with(kind, handle, |object| Ok(object.clone()))
    }

    /// Remove the object. Returns false for an unknown handle.
    pub fn remove(&self, kind: ObjectKind, handle: u32) -> bool {
        let mut objects = self.objects.lock();
        match objects.get(&handle) {
            Some(object) if object.kind == kind => {
                objects.remove(&handle);
                true
            }
            _ => false,
        }
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live objects of `kind`.
    pub fn count(&self, kind: ObjectKind) -> usize {
        self.objects
            .lock()
            .values()
            .filter(|object| object.kind == kind)
            .count()
    }

    /// Drop every object.
    pub fn clear(&self) -> usize {
        let mut objects = self.objects.lock();
        let cleared = objects.len();
        objects.clear();
        cleared
    }
}

#[derive(Debug, Default)]
struct WalletState {
    created: HashSet<String>,
    open: Option<(String, u32)>,
    next_handle: u32,
    pool_open: bool,
}

/// Wallets and the pool connection.
#[derive(Debug, Default)]
pub struct Wallets {
    state: Mutex<WalletState>,
}

fn wallet_name(config: &str) -> SimResult<String> {
    let config: Value = serde_json::from_str(config)?;
    config["wallet_name"]
        .as_str()
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| SimError::InvalidOption("wallet_name is missing".to_string()))
}

impl Wallets {
    pub fn create(&self, config: &str) -> SimResult<()> {
        let name = wallet_name(config)?;
        self.state.lock().created.insert(name);
        Ok(())
    }

    pub fn open(&self, config: &str) -> SimResult<u32> {
        let name = wallet_name(config)?;
        let mut state = self.state.lock();
        if !state.created.contains(&name) {
            return Err(SimError::NotReady("wallet"));
        }
        state.next_handle += 1;
        let handle = state.next_handle;
        state.open = Some((name, handle));
        Ok(handle)
    }

    pub fn close(&self) -> SimResult<()> {
        match self.state.lock().open.take() {
            Some(_) => Ok(()),
            None => Err(SimError::NotReady("wallet")),
        }
    }

    pub fn open_pool(&self, config: &str) -> SimResult<()> {
        let _: Value = serde_json::from_str(config)?;
        self.state.lock().pool_open = true;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open.is_some()
    }

    /// Close everything; forget the open wallet if `delete_wallet`.
    pub fn shutdown(&self, delete_wallet: bool) {
        let mut state = self.state.lock();
        if let Some((name, _)) = state.open.take() {
            if delete_wallet {
                state.created.remove(&name);
            }
        }
        state.pool_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data() -> Value {
        json!({})
    }

    #[test]
    fn insert_and_lookup() {
        let table = ObjectTable::new();
        let handle = table.insert(SimObject::new(
            ObjectKind::Connection,
            "alice",
            ObjectState::INITIALIZED,
            data(),
        ));

        assert!(table.contains(ObjectKind::Connection, handle));
        assert!(!table.contains(ObjectKind::Proof, handle));
        assert_eq!(table.snapshot(ObjectKind::Connection, handle).unwrap().source_id, "alice");

        let err = table.snapshot(ObjectKind::Proof, handle).unwrap_err();
        assert!(matches!(err, SimError::InvalidHandle { kind: ObjectKind::Proof, .. }));
    }

    #[test]
    fn remove_once() {
        let table = ObjectTable::new();
        let handle = table.insert(SimObject::new(
            ObjectKind::Proof,
            "proof",
            ObjectState::INITIALIZED,
            data(),
        ));
        assert!(!table.remove(ObjectKind::Connection, handle));
        assert!(table.remove(ObjectKind::Proof, handle));
        assert!(!table.remove(ObjectKind::Proof, handle));
        assert!(table.is_empty());
    }

    #[test]
    fn serialized_form() {
        let object = SimObject::new(
            ObjectKind::IssuerCredential,
            "degree",
            ObjectState::OFFER_SENT,
            json!({"revokable": true}),
        );
        let json = serde_json::to_value(&object).unwrap();
        assert_eq!(json["kind"], "issuer_credential");
        assert_eq!(json["state"], 2);
        assert_eq!(json["version"], "1.0");
        assert_eq!(object.pw_did.len(), 22);

        let parsed: SimObject = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, object);
    }

    #[test]
    fn thread_from_message() {
        let id = Uuid::new_v4();
        let object = SimObject::new(ObjectKind::OutOfBandReceiver, "", ObjectState::NONE, data())
            .with_thread_from(&json!({"@id": id.to_string()}));
        assert_eq!(object.thread_id, id);
    }

    #[test]
    fn wallet_lifecycle() {
        let wallets = Wallets::default();
        let config = r#"{"wallet_name":"alice","wallet_key":"8dvfYSt5d1taSd6yJdpjq4emkwsPDDLYxkNFysFD2cZY"}"#;

        assert!(matches!(wallets.open(config), Err(SimError::NotReady(_))));
        wallets.create(config).unwrap();
        let handle = wallets.open(config).unwrap();
        assert!(handle > 0);
        assert!(wallets.is_open());
        wallets.close().unwrap();
        assert!(wallets.close().is_err());

        let err = wallets.create(r#"{"wallet_key":"k"}"#).unwrap_err();
        assert_eq!(err.code(), vcx_core::ErrorCode::INVALID_OPTION);
    }
}
