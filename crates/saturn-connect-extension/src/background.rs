use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use saturn_connect_core::{
    decode_address, MultisigRecord, OriginStore, PortError, RuntimeRequest, RuntimeResponse,
    SignPayload, TabId, TabMessenger, TabNotification,
};

/// One key of a storage change notification. `enabled: None` means removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageChange {
    pub hostname: String,
    pub enabled: Option<bool>,
}

/// `runtime.MessageSender`, reduced to what routing needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageSender {
    pub tab_id: Option<TabId>,
}

impl MessageSender {
    pub fn tab(tab_id: TabId) -> Self {
        Self {
            tab_id: Some(tab_id),
        }
    }

    /// The popup and other extension pages have no tab.
    pub fn extension_page() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default)]
struct BackgroundState {
    multisigs: BTreeMap<TabId, MultisigRecord>,
    /// `None` until the persisted set has loaded; every origin is disabled
    /// until then.
    enabled_origins: Option<HashMap<String, bool>>,
    early_changes: Vec<StorageChange>,
}

/// Holds each gateway tab's multisig record and the enabled-origin mirror,
/// and routes sign requests to the tab whose multisig matches.
pub struct BackgroundCoordinator<S, T>
where
    S: OriginStore,
    T: TabMessenger,
{
    store: Arc<S>,
    tabs: T,
    state: Mutex<BackgroundState>,
}

impl<S, T> BackgroundCoordinator<S, T>
where
    S: OriginStore,
    T: TabMessenger,
{
    pub fn new(store: Arc<S>, tabs: T) -> Self {
        Self {
            store,
            tabs,
            state: Mutex::new(BackgroundState::default()),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, BackgroundState>, PortError> {
        self.state
            .lock()
            .map_err(|e| PortError::Transport(format!("background state lock poisoned: {e}")))
    }

    /// Loads the persisted enabled-origin set. Storage changes seen before
    /// this completes are replayed over the snapshot.
    pub async fn init(&self) -> Result<(), PortError> {
        let loaded = self.store.load_all().await?;
        let mut g = self.state()?;
        let mut enabled = loaded;
        for change in std::mem::take(&mut g.early_changes) {
            apply_change(&mut enabled, change);
        }
        tracing::info!(origins = enabled.len(), "enabled origins loaded");
        g.enabled_origins = Some(enabled);
        Ok(())
    }

    /// Loads the origin set again from storage. Every origin reads as
    /// disabled until the new snapshot is in, and changes arriving meanwhile
    /// are replayed over it.
    pub async fn reload(&self) -> Result<(), PortError> {
        {
            let mut g = self.state()?;
            g.enabled_origins = None;
            g.early_changes.clear();
        }
        self.init().await
    }

    pub fn is_ready(&self) -> bool {
        self.state()
            .map(|g| g.enabled_origins.is_some())
            .unwrap_or(false)
    }

    pub fn is_origin_enabled(&self, hostname: &str) -> bool {
        match self.state() {
            Ok(g) => g
                .enabled_origins
                .as_ref()
                .and_then(|m| m.get(hostname))
                .copied()
                .unwrap_or(false),
            Err(e) => {
                tracing::warn!(%hostname, error = %e, "origin check failed, treating as disabled");
                false
            }
        }
    }

    pub fn on_storage_changed(&self, changes: Vec<StorageChange>) {
        let mut guard = match self.state() {
            Ok(g) => g,
            Err(e) => {
                tracing::warn!(error = %e, "storage change dropped");
                return;
            }
        };
        let g = &mut *guard;
        match g.enabled_origins.as_mut() {
            Some(enabled) => {
                for change in changes {
                    tracing::debug!(hostname = %change.hostname, enabled = ?change.enabled, "origin flag changed");
                    apply_change(enabled, change);
                }
            }
            None => g.early_changes.extend(changes),
        }
    }

    pub fn on_tab_removed(&self, tab_id: TabId) {
        match self.state() {
            Ok(mut g) => {
                if g.multisigs.remove(&tab_id).is_some() {
                    tracing::info!(%tab_id, "tab closed, multisig record dropped");
                }
            }
            Err(e) => tracing::warn!(%tab_id, error = %e, "tab removal not applied"),
        }
    }

    pub fn multisigs(&self) -> Vec<MultisigRecord> {
        match self.state() {
            Ok(g) => g.multisigs.values().cloned().collect(),
            Err(e) => {
                tracing::warn!(error = %e, "multisig records unavailable");
                Vec::new()
            }
        }
    }

    /// Entry point for raw `runtime.onMessage` data. Unparsable messages are
    /// logged and answered with nothing.
    pub fn handle_raw(&self, raw: &Value, sender: MessageSender) -> Option<Value> {
        let request = match RuntimeRequest::from_wire(raw) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "ignoring runtime message");
                return None;
            }
        };
        let response = self.handle(request, sender)?;
        match serde_json::to_value(&response) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "runtime response encode failed");
                None
            }
        }
    }

    pub fn handle(
        &self,
        request: RuntimeRequest,
        sender: MessageSender,
    ) -> Option<RuntimeResponse> {
        match request {
            RuntimeRequest::MultisigData { multisig_data } => {
                let Some(tab_id) = sender.tab_id else {
                    tracing::warn!("multisig_data from a sender without a tab");
                    return None;
                };
                let record = MultisigRecord::new(tab_id, multisig_data);
                tracing::debug!(%tab_id, address = ?record.address(), "multisig record stored");
                match self.state() {
                    Ok(mut g) => {
                        g.multisigs.insert(tab_id, record);
                    }
                    Err(e) => tracing::warn!(%tab_id, error = %e, "multisig record not stored"),
                }
                None
            }
            RuntimeRequest::PopupGetMultisigs => Some(RuntimeResponse::Multisigs(self.multisigs())),
            RuntimeRequest::GetMultisigs { hostname } => {
                if self.is_origin_enabled(&hostname) {
                    Some(RuntimeResponse::Multisigs(self.multisigs()))
                } else {
                    tracing::debug!(%hostname, "get_multisigs from disabled origin");
                    Some(RuntimeResponse::Multisigs(Vec::new()))
                }
            }
            RuntimeRequest::SignPayload { hostname, payload } => {
                if self.is_origin_enabled(&hostname) {
                    self.route_sign_payload(payload);
                } else {
                    tracing::debug!(%hostname, "sign_payload from disabled origin dropped");
                }
                None
            }
        }
    }

    /// Forwards to the tab holding the multisig whose account matches
    /// `payload.address` under any network prefix.
    fn route_sign_payload(&self, payload: SignPayload) {
        let target = match decode_address(&payload.address) {
            Ok((account, _)) => account,
            Err(e) => {
                tracing::warn!(address = %payload.address, error = %e, "sign_payload address undecodable");
                return;
            }
        };

        let tab_id = {
            let g = match self.state() {
                Ok(g) => g,
                Err(e) => {
                    tracing::warn!(error = %e, "sign_payload not routed");
                    return;
                }
            };
            g.multisigs.values().find_map(|record| {
                let address = record.address()?;
                match decode_address(address) {
                    Ok((account, _)) if account == target => Some(record.tab_id),
                    Ok(_) => None,
                    Err(e) => {
                        tracing::warn!(tab_id = %record.tab_id, %address, error = %e, "stored multisig address undecodable");
                        None
                    }
                }
            })
        };

        let Some(tab_id) = tab_id else {
            tracing::warn!(address = %payload.address, "no gateway tab holds this multisig");
            return;
        };
        tracing::debug!(%tab_id, "routing sign_payload");
        if let Err(e) = self
            .tabs
            .send_to_tab(tab_id, TabNotification::SignPayload { payload })
        {
            tracing::warn!(%tab_id, error = %e, "sign_payload forward failed");
        }
    }
}

fn apply_change(enabled: &mut HashMap<String, bool>, change: StorageChange) {
    match change.enabled {
        Some(flag) => {
            enabled.insert(change.hostname, flag);
        }
        None => {
            enabled.remove(&change.hostname);
        }
    }
}
