use std::sync::Arc;

use saturn_connect_core::{MultisigRecord, OriginStore, PortError, RuntimePort, RuntimeRequest};

/// Toolbar popup for the active tab's hostname.
pub struct PopupController<S, R>
where
    S: OriginStore,
    R: RuntimePort,
{
    store: Arc<S>,
    runtime: R,
    hostname: String,
    enabled: bool,
}

impl<S, R> PopupController<S, R>
where
    S: OriginStore + 'static,
    R: RuntimePort,
{
    pub async fn open(store: Arc<S>, runtime: R, hostname: impl Into<String>) -> Result<Self, PortError> {
        let hostname = hostname.into();
        let enabled = store.get(&hostname).await?.unwrap_or(false);
        Ok(Self {
            store,
            runtime,
            hostname,
            enabled,
        })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Flips the flag locally and persists it without waiting. The background
    /// picks the change up from the storage subscription.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        let store = Arc::clone(&self.store);
        let hostname = self.hostname.clone();
        let enabled = self.enabled;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = store.set(&hostname, enabled).await {
                        tracing::warn!(%hostname, error = %e, "persisting origin flag failed");
                    }
                });
            }
            Err(e) => tracing::warn!(error = %e, "no runtime to persist origin flag"),
        }
        self.enabled
    }

    /// Every multisig the background knows of, regardless of origin.
    pub async fn active_multisigs(&self) -> Result<Vec<MultisigRecord>, PortError> {
        Ok(self
            .runtime
            .send_message(RuntimeRequest::PopupGetMultisigs)
            .await?
            .map(|r| r.into_multisigs())
            .unwrap_or_default())
    }
}
