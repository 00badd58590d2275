//! Every wallet the gateway can connect to, behind one list.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use saturn_connect_core::{
    BaseWallet, InjectedAccount, InjectedWeb3, PortError, SignPayload, SignRaw, Signer,
    SignerResult, WalletIdentity, WalletMetadata, WalletProvider, WalletRegistry,
};

/// Concatenates its providers' wallets in provider order. Wallets sharing a
/// name are all listed.
pub struct WalletAggregator {
    providers: Vec<Arc<dyn WalletProvider>>,
}

impl WalletAggregator {
    pub fn new(providers: Vec<Arc<dyn WalletProvider>>) -> Self {
        Self { providers }
    }
}

impl WalletProvider for WalletAggregator {
    fn get_wallets(&self) -> Vec<Arc<dyn BaseWallet>> {
        self.providers
            .iter()
            .flat_map(|p| p.get_wallets())
            .collect()
    }
}

/// Surfaces the browser extensions registered in the page.
pub struct InjectedWalletProvider {
    registry: WalletRegistry,
    origin: String,
}

impl InjectedWalletProvider {
    pub fn new(registry: WalletRegistry, origin: impl Into<String>) -> Self {
        Self {
            registry,
            origin: origin.into(),
        }
    }
}

impl WalletProvider for InjectedWalletProvider {
    fn get_wallets(&self) -> Vec<Arc<dyn BaseWallet>> {
        let entries = match self.registry.entries() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "injected wallets unavailable");
                return Vec::new();
            }
        };
        entries
            .into_iter()
            .map(|entry| {
                Arc::new(InjectedExtensionWallet {
                    identity: entry.identity,
                    registry: self.registry.clone(),
                    origin: self.origin.clone(),
                    enabled: AtomicBool::new(entry.enabled),
                }) as Arc<dyn BaseWallet>
            })
            .collect()
    }
}

/// One injected extension seen as a [`BaseWallet`].
pub struct InjectedExtensionWallet {
    identity: WalletIdentity,
    registry: WalletRegistry,
    origin: String,
    enabled: AtomicBool,
}

impl InjectedExtensionWallet {
    fn wallet(&self) -> Result<Arc<dyn InjectedWeb3>, PortError> {
        let entry = self
            .registry
            .get(&self.identity.name)?
            .filter(|e| e.identity == self.identity)
            .ok_or_else(|| PortError::NotFound(format!("{} is gone", self.identity.name)))?;
        Ok(entry.wallet)
    }
}

#[async_trait]
impl BaseWallet for InjectedExtensionWallet {
    fn metadata(&self) -> WalletMetadata {
        WalletMetadata {
            id: self.identity.name.clone(),
            title: self.identity.name.clone(),
            description: None,
            version: Some(self.identity.version.clone()),
        }
    }

    async fn connect(&self) -> Result<(), PortError> {
        self.registry
            .enable(&self.identity.name, &self.origin)
            .await?;
        self.enabled.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn auto_connect(&self) -> Result<(), PortError> {
        self.connect().await
    }

    async fn disconnect(&self) -> Result<(), PortError> {
        self.enabled.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn get_accounts(&self) -> Result<Vec<InjectedAccount>, PortError> {
        if !self.is_connected() {
            return Ok(Vec::new());
        }
        self.wallet()?.accounts_get().await
    }

    fn signer(&self) -> Option<Arc<dyn Signer>> {
        if !self.is_connected() {
            return None;
        }
        let wallet = self.wallet().ok()?;
        Some(Arc::new(InjectedSigner { wallet }))
    }
}

struct InjectedSigner {
    wallet: Arc<dyn InjectedWeb3>,
}

#[async_trait]
impl Signer for InjectedSigner {
    async fn sign_payload(&self, payload: &SignPayload) -> Result<SignerResult, PortError> {
        self.wallet.sign_payload(payload).await
    }

    async fn sign_raw(&self, raw: &SignRaw) -> Result<SignerResult, PortError> {
        self.wallet.sign_raw(raw).await
    }
}

/// Surfaces the single WalletConnect wallet.
pub struct WalletConnectProvider {
    wallet: Arc<dyn BaseWallet>,
}

impl WalletConnectProvider {
    pub fn new(wallet: Arc<dyn BaseWallet>) -> Self {
        Self { wallet }
    }
}

impl WalletProvider for WalletConnectProvider {
    fn get_wallets(&self) -> Vec<Arc<dyn BaseWallet>> {
        vec![Arc::clone(&self.wallet)]
    }
}
