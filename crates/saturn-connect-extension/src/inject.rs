use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use saturn_connect_core::{
    AccountsCallback, InjectedAccount, InjectedMetadata, InjectedWeb3, MessageOrigin,
    MultisigRecord, PortError, RequestId, SignPayload, SignRaw, SignerResult, Unsubscribe,
    WalletIdentity, WalletRegistry, WindowEnvelope, WindowListener, WindowMessage, WindowPort,
};

use crate::config::BridgeConfig;

type PendingTable = HashMap<RequestId, oneshot::Sender<Vec<MultisigRecord>>>;

/// One per page. Talks to the content script over `window` messages and is
/// advertised twice in the page's registry, see [`inject_wallets`].
pub struct InjectedProvider<W: WindowPort> {
    window: W,
    config: BridgeConfig,
    next_request: AtomicU64,
    next_sign_id: AtomicU64,
    pending: Mutex<PendingTable>,
    metadata: Mutex<BTreeMap<String, InjectedMetadata>>,
}

impl<W: WindowPort> InjectedProvider<W> {
    pub fn new(window: W, config: BridgeConfig) -> Self {
        Self {
            window,
            config,
            next_request: AtomicU64::new(0),
            next_sign_id: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
            metadata: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    fn pending(&self) -> Result<MutexGuard<'_, PendingTable>, PortError> {
        self.pending
            .lock()
            .map_err(|e| PortError::Transport(format!("pending table lock poisoned: {e}")))
    }

    fn post(&self, message: WindowMessage) -> Result<(), PortError> {
        self.window
            .post_message(WindowEnvelope::page(message).to_value()?)
    }

    pub fn pending_requests(&self) -> usize {
        self.pending().map(|g| g.len()).unwrap_or(0)
    }

    /// Asks the content script for the multisigs visible to this origin.
    /// Settles with `TimedOut` if no response arrives within the configured
    /// request timeout.
    pub async fn accounts_get(&self) -> Result<Vec<InjectedAccount>, PortError> {
        let request_id = RequestId(self.next_request.fetch_add(1, Ordering::SeqCst) + 1);
        let (tx, rx) = oneshot::channel();
        self.pending()?.insert(request_id, tx);

        if let Err(e) = self.post(WindowMessage::GetMultisigs { request_id }) {
            self.pending()?.remove(&request_id);
            return Err(e);
        }

        match tokio::time::timeout(self.config.request_timeout(), rx).await {
            Ok(Ok(multisigs)) => Ok(multisigs
                .iter()
                .filter_map(InjectedAccount::from_record)
                .collect()),
            Ok(Err(_)) => Err(PortError::Transport(format!(
                "get_multisigs {request_id} abandoned"
            ))),
            Err(_) => {
                self.pending()?.remove(&request_id);
                tracing::warn!(%request_id, "get_multisigs timed out");
                Err(PortError::TimedOut(format!(
                    "get_multisigs {request_id} after {}ms",
                    self.config.request_timeout_ms
                )))
            }
        }
    }

    /// Emits the sign request and resolves at once with the "proposed to
    /// multisig" sentinel. The real signature, if any, happens out of band.
    pub fn propose_sign_payload(&self, payload: &SignPayload) -> SignerResult {
        let id = self.next_sign_id.fetch_add(1, Ordering::SeqCst) + 1;
        if let Err(e) = self.post(WindowMessage::ProposeSignPayload {
            payload: payload.clone(),
        }) {
            tracing::warn!(error = %e, "sign_payload post failed");
        }
        SignerResult::proposed(
            id,
            self.config.proposed_error_code,
            self.config.proposed_message.clone(),
        )
    }

    /// Resolves without emitting anything.
    pub fn unhandled_sign_payload(&self) -> SignerResult {
        let id = self.next_sign_id.fetch_add(1, Ordering::SeqCst) + 1;
        SignerResult::proposed(
            id,
            self.config.unhandled_error_code,
            self.config.unhandled_message.clone(),
        )
    }

    pub fn metadata_get(&self) -> Vec<InjectedMetadata> {
        match self.metadata.lock() {
            Ok(g) => g.values().cloned().collect(),
            Err(e) => {
                tracing::warn!(error = %e, "metadata lock poisoned");
                Vec::new()
            }
        }
    }

    /// Last write per genesis hash wins.
    pub fn metadata_provide(&self, metadata: InjectedMetadata) -> bool {
        match self.metadata.lock() {
            Ok(mut g) => {
                g.insert(metadata.genesis_hash.clone(), metadata);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "metadata lock poisoned");
                false
            }
        }
    }

    fn resolve(&self, request_id: RequestId, multisigs: Vec<MultisigRecord>) {
        let sender = match self.pending() {
            Ok(mut g) => g.remove(&request_id),
            Err(e) => {
                tracing::warn!(error = %e, "cannot resolve get_multisigs");
                return;
            }
        };
        match sender {
            Some(tx) => {
                if tx.send(multisigs).is_err() {
                    tracing::debug!(%request_id, "get_multisigs caller went away");
                }
            }
            None => tracing::debug!(%request_id, "multisigs response with no pending request"),
        }
    }
}

#[async_trait]
impl<W: WindowPort> WindowListener for InjectedProvider<W> {
    async fn on_window_message(&self, message: Value) {
        let Some(envelope) = WindowEnvelope::accept(&message, MessageOrigin::Content) else {
            return;
        };
        if let WindowMessage::Multisigs {
            request_id,
            multisigs,
        } = envelope.message
        {
            self.resolve(request_id, multisigs);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderRole {
    SaturnConnect,
    /// Registered under another wallet's name with a sentinel version.
    Masquerade,
}

/// One advertised identity of the shared provider.
pub struct InjectedWallet<W: WindowPort> {
    provider: Arc<InjectedProvider<W>>,
    identity: WalletIdentity,
    role: ProviderRole,
    registry: WalletRegistry,
    using_saturn_connect: Arc<AtomicBool>,
}

impl<W: WindowPort> InjectedWallet<W> {
    pub fn identity(&self) -> &WalletIdentity {
        &self.identity
    }

    pub fn role(&self) -> ProviderRole {
        self.role
    }

    /// A masquerade steps aside for good once the wallet it imitates has
    /// been enabled by the page.
    fn deactivated(&self) -> bool {
        if self.role == ProviderRole::SaturnConnect {
            return false;
        }
        match self.registry.has_enabled_rival(&self.identity) {
            Ok(true) => {
                match self.registry.deregister(&self.identity) {
                    Ok(true) => tracing::info!(name = %self.identity.name, "real wallet enabled, masquerade withdrawn"),
                    Ok(false) => {}
                    Err(e) => tracing::warn!(error = %e, "masquerade deregistration failed"),
                }
                true
            }
            Ok(false) => !self.registry.contains(&self.identity).unwrap_or(false),
            Err(e) => {
                tracing::warn!(error = %e, "registry unavailable, masquerade stays neutral");
                true
            }
        }
    }

    /// Metadata is left to the real wallet once Saturn Connect is in use.
    fn metadata_suppressed(&self) -> bool {
        self.role == ProviderRole::Masquerade
            && (self.deactivated() || self.using_saturn_connect.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl<W: WindowPort> InjectedWeb3 for InjectedWallet<W> {
    async fn enable(&self, origin: &str) -> Result<(), PortError> {
        match self.role {
            ProviderRole::SaturnConnect => {
                // stays set for the life of the page
                self.using_saturn_connect.store(true, Ordering::SeqCst);
                tracing::info!(%origin, "saturn connect enabled");
            }
            ProviderRole::Masquerade => {
                tracing::debug!(%origin, deactivated = self.deactivated(), "masquerade enabled");
            }
        }
        Ok(())
    }

    async fn accounts_get(&self) -> Result<Vec<InjectedAccount>, PortError> {
        if self.deactivated() {
            return Ok(Vec::new());
        }
        self.provider.accounts_get().await
    }

    /// Accepted but inert: multisig accounts are never pushed.
    fn accounts_subscribe(&self, _callback: AccountsCallback) -> Unsubscribe {
        Unsubscribe::inert()
    }

    async fn sign_payload(&self, payload: &SignPayload) -> Result<SignerResult, PortError> {
        if self.deactivated() {
            return Ok(self.provider.unhandled_sign_payload());
        }
        Ok(self.provider.propose_sign_payload(payload))
    }

    async fn sign_raw(&self, _raw: &SignRaw) -> Result<SignerResult, PortError> {
        Err(PortError::NotImplemented("signer.signRaw"))
    }

    fn metadata_get(&self) -> Vec<InjectedMetadata> {
        if self.metadata_suppressed() {
            return Vec::new();
        }
        self.provider.metadata_get()
    }

    fn metadata_provide(&self, metadata: InjectedMetadata) -> bool {
        if self.metadata_suppressed() {
            return false;
        }
        self.provider.metadata_provide(metadata)
    }
}

/// Both registered identities of one page's provider.
pub struct InjectedWallets<W: WindowPort> {
    pub provider: Arc<InjectedProvider<W>>,
    pub saturn_connect: Arc<InjectedWallet<W>>,
    pub masquerade: Arc<InjectedWallet<W>>,
}

/// Registers the provider as Saturn Connect and as the masquerade.
pub fn inject_wallets<W>(
    provider: Arc<InjectedProvider<W>>,
    registry: &WalletRegistry,
) -> Result<InjectedWallets<W>, PortError>
where
    W: WindowPort + 'static,
{
    let using_saturn_connect = Arc::new(AtomicBool::new(false));
    let config = provider.config().clone();

    let saturn_connect = Arc::new(InjectedWallet {
        provider: Arc::clone(&provider),
        identity: config.saturn_connect.clone(),
        role: ProviderRole::SaturnConnect,
        registry: registry.clone(),
        using_saturn_connect: Arc::clone(&using_saturn_connect),
    });
    let masquerade = Arc::new(InjectedWallet {
        provider: Arc::clone(&provider),
        identity: config.masquerade.clone(),
        role: ProviderRole::Masquerade,
        registry: registry.clone(),
        using_saturn_connect,
    });

    registry.register(saturn_connect.identity.clone(), saturn_connect.clone())?;
    // an extension already advertising the name keeps answering lookups
    if registry.get(&masquerade.identity.name)?.is_some() {
        tracing::debug!(name = %masquerade.identity.name, "wallet already injected, masquerade registered beneath it");
        registry.register_beneath(masquerade.identity.clone(), masquerade.clone())?;
    } else {
        registry.register(masquerade.identity.clone(), masquerade.clone())?;
    }

    Ok(InjectedWallets {
        provider,
        saturn_connect,
        masquerade,
    })
}
