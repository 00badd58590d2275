use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{
    DisconnectReason, InjectedAccount, SignPayload, SignRaw, SignerResult, TabId, WalletMetadata,
    WcConnectParams, WcMetadata, WcRpcRequest, WcSession,
};
use crate::message::{RuntimeRequest, RuntimeResponse, TabNotification};

#[derive(Debug, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("policy error: {0}")]
    Policy(String),
    #[error("timed out: {0}")]
    TimedOut(String),
    #[error("cancelled: {0}")]
    Cancelled(String),
    #[error("session expired: {0}")]
    SessionExpired(String),
}

pub trait ClockPort {
    fn now_ms(&self) -> Result<u64, PortError>;
}

/// A page's `window.postMessage` surface. Every listener in the page sees
/// every posted message, including ones it posted itself.
pub trait WindowPort: Send + Sync {
    fn post_message(&self, message: Value) -> Result<(), PortError>;
}

#[async_trait]
pub trait WindowListener: Send + Sync {
    async fn on_window_message(&self, message: Value);
}

/// Content script's view of the extension runtime.
#[async_trait]
pub trait RuntimePort: Send + Sync {
    async fn send_message(
        &self,
        request: RuntimeRequest,
    ) -> Result<Option<RuntimeResponse>, PortError>;

    /// Long-lived `runtime.connect()` port to the background.
    fn post_to_port(&self, data: Value) -> Result<(), PortError>;
}

/// Background's `tabs.sendMessage`.
pub trait TabMessenger: Send + Sync {
    fn send_to_tab(&self, tab_id: TabId, notification: TabNotification) -> Result<(), PortError>;
}

/// Persistent hostname -> enabled flags.
#[async_trait]
pub trait OriginStore: Send + Sync {
    async fn load_all(&self) -> Result<HashMap<String, bool>, PortError>;
    async fn get(&self, hostname: &str) -> Result<Option<bool>, PortError>;
    async fn set(&self, hostname: &str, enabled: bool) -> Result<(), PortError>;
}

/// Approval half of a session proposal.
pub struct PendingSession {
    /// Present only when a new pairing has to be shown to the user.
    pub uri: Option<String>,
    pub approval: oneshot::Receiver<Result<WcSession, PortError>>,
}

#[async_trait]
pub trait SignClient: Send + Sync {
    async fn connect(&self, params: WcConnectParams) -> Result<PendingSession, PortError>;
    /// Sessions recovered from the client's own persistence, oldest first.
    fn sessions(&self) -> Vec<WcSession>;
    async fn disconnect(&self, topic: &str, reason: DisconnectReason) -> Result<(), PortError>;
    async fn request(
        &self,
        topic: &str,
        chain_id: &str,
        request: WcRpcRequest,
    ) -> Result<Value, PortError>;
}

#[async_trait]
pub trait SignClientFactory: Send + Sync {
    type Client: SignClient + 'static;

    async fn init(&self, metadata: &WcMetadata) -> Result<Arc<Self::Client>, PortError>;
}

/// QR modal shown while pairing.
pub trait PairingModal: Send + Sync {
    /// Resolves when the user dismisses the modal.
    fn open(&self, uri: &str) -> oneshot::Receiver<()>;
    fn close(&self);
}

#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign_payload(&self, payload: &SignPayload) -> Result<SignerResult, PortError>;
    async fn sign_raw(&self, raw: &SignRaw) -> Result<SignerResult, PortError>;
}

/// Capability set every wallet in the gateway exposes.
#[async_trait]
pub trait BaseWallet: Send + Sync {
    fn metadata(&self) -> WalletMetadata;
    async fn connect(&self) -> Result<(), PortError>;
    async fn auto_connect(&self) -> Result<(), PortError>;
    async fn disconnect(&self) -> Result<(), PortError>;
    fn is_connected(&self) -> bool;
    async fn get_accounts(&self) -> Result<Vec<InjectedAccount>, PortError>;
    fn signer(&self) -> Option<Arc<dyn Signer>>;
}

pub trait WalletProvider: Send + Sync {
    fn get_wallets(&self) -> Vec<Arc<dyn BaseWallet>>;
}
