use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::{
    InjectedAccount, InjectedMetadata, SignPayload, SignRaw, SignerResult, WalletIdentity,
};
use crate::ports::PortError;

pub type AccountsCallback = Box<dyn Fn(Vec<InjectedAccount>) + Send + Sync>;

/// Handle returned by `accounts_subscribe`.
pub struct Unsubscribe(Option<Box<dyn FnOnce() + Send>>);

impl Unsubscribe {
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    /// Accepted but does nothing; for providers without live account push.
    pub fn inert() -> Self {
        Self(None)
    }

    pub fn is_inert(&self) -> bool {
        self.0.is_none()
    }

    pub fn call(mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Unsubscribe").field(&self.is_inert()).finish()
    }
}

/// The capability set a dApp expects from an injected wallet.
#[async_trait]
pub trait InjectedWeb3: Send + Sync {
    async fn enable(&self, origin: &str) -> Result<(), PortError>;
    async fn accounts_get(&self) -> Result<Vec<InjectedAccount>, PortError>;
    fn accounts_subscribe(&self, callback: AccountsCallback) -> Unsubscribe;
    async fn sign_payload(&self, payload: &SignPayload) -> Result<SignerResult, PortError>;
    async fn sign_raw(&self, raw: &SignRaw) -> Result<SignerResult, PortError>;
    fn metadata_get(&self) -> Vec<InjectedMetadata>;
    fn metadata_provide(&self, metadata: InjectedMetadata) -> bool;
}

impl fmt::Debug for dyn InjectedWeb3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InjectedWeb3")
    }
}

#[derive(Clone)]
pub struct RegistryEntry {
    pub identity: WalletIdentity,
    pub enabled: bool,
    pub wallet: Arc<dyn InjectedWeb3>,
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("identity", &self.identity)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Several extensions may advertise under one name. Every entry is kept in
/// registration order and a lookup by name sees the newest.
#[derive(Debug, Clone, Default)]
pub struct WalletRegistry {
    inner: Arc<Mutex<BTreeMap<String, Vec<RegistryEntry>>>>,
}

impl WalletRegistry {
    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Vec<RegistryEntry>>>, PortError> {
        self.inner
            .lock()
            .map_err(|e| PortError::Transport(format!("wallet registry lock poisoned: {e}")))
    }

    pub fn register(
        &self,
        identity: WalletIdentity,
        wallet: Arc<dyn InjectedWeb3>,
    ) -> Result<(), PortError> {
        let mut g = self.lock()?;
        tracing::debug!(name = %identity.name, version = %identity.version, "registering injected wallet");
        g.entry(identity.name.clone()).or_default().push(RegistryEntry {
            identity,
            enabled: false,
            wallet,
        });
        Ok(())
    }

    /// Registers as the oldest entry, so lookups by name keep returning
    /// whatever was there before.
    pub fn register_beneath(
        &self,
        identity: WalletIdentity,
        wallet: Arc<dyn InjectedWeb3>,
    ) -> Result<(), PortError> {
        let mut g = self.lock()?;
        tracing::debug!(name = %identity.name, version = %identity.version, "registering injected wallet beneath existing entries");
        g.entry(identity.name.clone()).or_default().insert(
            0,
            RegistryEntry {
                identity,
                enabled: false,
                wallet,
            },
        );
        Ok(())
    }

    /// Removes only the entry registered under exactly `identity`.
    pub fn deregister(&self, identity: &WalletIdentity) -> Result<bool, PortError> {
        let mut g = self.lock()?;
        let Some(entries) = g.get_mut(&identity.name) else {
            return Ok(false);
        };
        let before = entries.len();
        entries.retain(|e| e.identity.version != identity.version);
        let removed = entries.len() != before;
        if entries.is_empty() {
            g.remove(&identity.name);
        }
        if removed {
            tracing::info!(name = %identity.name, version = %identity.version, "deregistered injected wallet");
        }
        Ok(removed)
    }

    pub fn get(&self, name: &str) -> Result<Option<RegistryEntry>, PortError> {
        let g = self.lock()?;
        Ok(g.get(name).and_then(|entries| entries.last().cloned()))
    }

    pub fn contains(&self, identity: &WalletIdentity) -> Result<bool, PortError> {
        let g = self.lock()?;
        Ok(g.get(&identity.name)
            .is_some_and(|entries| entries.iter().any(|e| e.identity == *identity)))
    }

    /// True if some other wallet under `identity.name` has been enabled.
    pub fn has_enabled_rival(&self, identity: &WalletIdentity) -> Result<bool, PortError> {
        let g = self.lock()?;
        Ok(g.get(&identity.name).is_some_and(|entries| {
            entries
                .iter()
                .any(|e| e.enabled && e.identity.version != identity.version)
        }))
    }

    /// Newest entry of every advertised name.
    pub fn entries(&self) -> Result<Vec<RegistryEntry>, PortError> {
        let g = self.lock()?;
        Ok(g.values().filter_map(|e| e.last().cloned()).collect())
    }

    /// `injectedWeb3[name].enable(origin)`.
    pub async fn enable(
        &self,
        name: &str,
        origin: &str,
    ) -> Result<Arc<dyn InjectedWeb3>, PortError> {
        let wallet = {
            let mut g = self.lock()?;
            let entry = g
                .get_mut(name)
                .and_then(|entries| entries.last_mut())
                .ok_or_else(|| PortError::NotFound(format!("injected wallet missing: {name}")))?;
            entry.enabled = true;
            Arc::clone(&entry.wallet)
        };
        wallet.enable(origin).await?;
        Ok(wallet)
    }
}
