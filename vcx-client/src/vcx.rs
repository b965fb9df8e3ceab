//! Library-wide operations: wallet, pool, version, shutdown.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};
use vcx_core::{Bridge, BridgeResult, ErrorCode, NativeCall, NativeLibrary, RawHandle};

use crate::config::{ClientConfig, WaitPolicy};
use crate::guard;

/// Entry point to a native library.
///
/// Owns the bridge session that object families are created on. When the
/// configuration sets a call timeout and a tokio runtime is running, a
/// sweeper task rejects expired calls whose futures are not being polled.
#[derive(Debug)]
pub struct Vcx {
    bridge: Bridge,
    config: ClientConfig,
    sweeper: Option<JoinHandle<()>>,
}

impl Vcx {
    pub fn new(native: Arc<dyn NativeLibrary>) -> BridgeResult<Self> {
        Self::with_config(native, ClientConfig::default())
    }

    pub fn with_config(
        native: Arc<dyn NativeLibrary>,
        config: ClientConfig,
    ) -> BridgeResult<Self> {
        let bridge = Bridge::with_config(native, config.bridge.clone())?;
        let runtime = tokio::runtime::Handle::try_current();
        let sweeper = match (config.bridge.call_timeout, runtime) {
            (Some(_), Ok(_)) => Some(bridge.spawn_sweeper()),
            _ => None,
        };
        info!(
            version = %bridge.version(),
            route_tag = bridge.route_tag(),
            sweeper = sweeper.is_some(),
            "Started vcx client"
        );
        Ok(Self {
            bridge,
            config,
            sweeper,
        })
    }

    /// Session to create objects on.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Default policy for state waits.
    pub fn wait_policy(&self) -> &WaitPolicy {
        &self.config.wait
    }

    pub async fn create_wallet(&self, config: &str) -> BridgeResult<()> {
        guard::not_blank("config", config)?;
        self.bridge
            .call::<()>(NativeCall::CreateWallet {
                config: config.to_string(),
            })?
            .await
    }

    /// Open the wallet all later operations use. Returns its handle.
    pub async fn open_main_wallet(&self, config: &str) -> BridgeResult<u32> {
        guard::not_blank("config", config)?;
        let RawHandle(handle) = self
            .bridge
            .call::<RawHandle>(NativeCall::OpenMainWallet {
                config: config.to_string(),
            })?
            .await?;
        debug!(handle, "Opened main wallet");
        Ok(handle)
    }

    pub async fn close_main_wallet(&self) -> BridgeResult<()> {
        self.bridge.call::<()>(NativeCall::CloseMainWallet)?.await
    }

    pub async fn open_main_pool(&self, config: &str) -> BridgeResult<()> {
        guard::not_blank("config", config)?;
        self.bridge
            .call::<()>(NativeCall::OpenMainPool {
                config: config.to_string(),
            })?
            .await
    }

    pub fn version(&self) -> String {
        self.bridge.version()
    }

    /// Message for a native error code.
    pub fn error_message(&self, code: ErrorCode) -> String {
        self.bridge.error_message(code)
    }

    /// Shut the library down. Objects created before are invalid afterwards
    /// and no further calls are accepted on this session.
    pub fn shutdown(&self, delete_wallet: bool) -> BridgeResult<()> {
        self.bridge.shutdown(delete_wallet)
    }
}

impl Drop for Vcx {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vcx_core::BridgeError;
    use vcx_sim::{SimConfig, SimLibrary};

    const WALLET: &str = r#"{"wallet_name":"alice","wallet_key":"8dvfYSt5d1taSd6yJdpjq4emkwsPDDLYxkNFysFD2cZY"}"#;

    fn vcx() -> Vcx {
        Vcx::new(Arc::new(SimLibrary::new(SimConfig::default()))).unwrap()
    }

    #[tokio::test]
    async fn wallet_lifecycle() {
        let vcx = vcx();
        vcx.create_wallet(WALLET).await.unwrap();
        let handle = vcx.open_main_wallet(WALLET).await.unwrap();
        assert!(handle > 0);
        vcx.open_main_pool(r#"{"genesis_path":"/tmp/genesis.txn"}"#).await.unwrap();
        vcx.close_main_wallet().await.unwrap();

        let err = vcx.close_main_wallet().await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NOT_READY));
        assert_eq!(vcx.bridge().pending_count(), 0);
    }

    #[tokio::test]
    async fn blank_config_never_reaches_native() {
        let vcx = vcx();
        let err = vcx.create_wallet(" ").await.unwrap_err();
        assert!(matches!(err, BridgeError::InvalidParameter { name: "config", .. }));
        assert_eq!(vcx.bridge().stats().registered, 0);
    }

    #[tokio::test]
    async fn messages_and_version() {
        let vcx = vcx();
        assert_eq!(vcx.error_message(ErrorCode::SUCCESS), "Success");
        assert_eq!(vcx.error_message(ErrorCode(424242)), "Unknown Error");
        assert!(vcx.version().ends_with("-sim"));
    }

    #[tokio::test]
    async fn shutdown_closes_session() {
        let vcx = vcx();
        vcx.shutdown(true).unwrap();
        assert!(vcx.bridge().is_closed());

        let err = vcx.create_wallet(WALLET).await.unwrap_err();
        assert!(matches!(err, BridgeError::SessionClosed));
    }

    #[tokio::test]
    async fn sweeper_runs_with_call_timeout() {
        let config = ClientConfig::default().with_bridge(
            vcx_core::BridgeConfig::default()
                .with_call_timeout(Duration::from_millis(50))
                .with_sweep_interval(Duration::from_millis(10)),
        );
        let vcx = Vcx::with_config(Arc::new(SimLibrary::new(SimConfig::default())), config)
            .unwrap();
        assert!(vcx.sweeper.is_some());
        assert!(Vcx::new(Arc::new(SimLibrary::default())).unwrap().sweeper.is_none());
    }
}
