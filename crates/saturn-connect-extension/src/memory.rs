use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};

use saturn_connect_core::{
    OriginStore, PortError, RuntimePort, RuntimeRequest, RuntimeResponse, TabId, TabMessenger,
    TabNotification, WindowPort,
};

use crate::background::{BackgroundCoordinator, MessageSender, StorageChange};

const BUS_CAPACITY: usize = 256;

/// One page's `window`. Every subscriber sees every posted message.
#[derive(Debug, Clone)]
pub struct WindowBus {
    tx: broadcast::Sender<Value>,
}

impl Default for WindowBus {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }
}

impl WindowBus {
    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.tx.subscribe()
    }
}

impl WindowPort for WindowBus {
    fn post_message(&self, message: Value) -> Result<(), PortError> {
        // postMessage with nobody listening is not an error
        let _ = self.tx.send(message);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MemoryOriginStore {
    inner: Arc<Mutex<HashMap<String, bool>>>,
    changes: broadcast::Sender<Vec<StorageChange>>,
}

impl Default for MemoryOriginStore {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(BUS_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            changes,
        }
    }
}

impl MemoryOriginStore {
    pub fn with_origins(origins: impl IntoIterator<Item = (String, bool)>) -> Self {
        let store = Self::default();
        if let Ok(mut g) = store.inner.lock() {
            g.extend(origins);
        }
        store
    }

    /// `storage.onChanged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<StorageChange>> {
        self.changes.subscribe()
    }

    pub async fn remove(&self, hostname: &str) -> Result<(), PortError> {
        let removed = {
            let mut g = self
                .inner
                .lock()
                .map_err(|e| PortError::Transport(format!("origin store lock poisoned: {e}")))?;
            g.remove(hostname).is_some()
        };
        if removed {
            let _ = self.changes.send(vec![StorageChange {
                hostname: hostname.to_owned(),
                enabled: None,
            }]);
        }
        Ok(())
    }
}

#[async_trait]
impl OriginStore for MemoryOriginStore {
    async fn load_all(&self) -> Result<HashMap<String, bool>, PortError> {
        let g = self
            .inner
            .lock()
            .map_err(|e| PortError::Transport(format!("origin store lock poisoned: {e}")))?;
        Ok(g.clone())
    }

    async fn get(&self, hostname: &str) -> Result<Option<bool>, PortError> {
        let g = self
            .inner
            .lock()
            .map_err(|e| PortError::Transport(format!("origin store lock poisoned: {e}")))?;
        Ok(g.get(hostname).copied())
    }

    async fn set(&self, hostname: &str, enabled: bool) -> Result<(), PortError> {
        {
            let mut g = self
                .inner
                .lock()
                .map_err(|e| PortError::Transport(format!("origin store lock poisoned: {e}")))?;
            g.insert(hostname.to_owned(), enabled);
        }
        let _ = self.changes.send(vec![StorageChange {
            hostname: hostname.to_owned(),
            enabled: Some(enabled),
        }]);
        Ok(())
    }
}

/// `tabs.sendMessage` over per-tab channels.
#[derive(Debug, Clone, Default)]
pub struct MemoryTabs {
    inner: Arc<Mutex<HashMap<TabId, mpsc::UnboundedSender<TabNotification>>>>,
}

impl MemoryTabs {
    pub fn open(&self, tab_id: TabId) -> Result<mpsc::UnboundedReceiver<TabNotification>, PortError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut g = self
            .inner
            .lock()
            .map_err(|e| PortError::Transport(format!("tabs lock poisoned: {e}")))?;
        g.insert(tab_id, tx);
        Ok(rx)
    }

    pub fn close(&self, tab_id: TabId) -> Result<(), PortError> {
        let mut g = self
            .inner
            .lock()
            .map_err(|e| PortError::Transport(format!("tabs lock poisoned: {e}")))?;
        g.remove(&tab_id);
        Ok(())
    }
}

impl TabMessenger for MemoryTabs {
    fn send_to_tab(&self, tab_id: TabId, notification: TabNotification) -> Result<(), PortError> {
        let g = self
            .inner
            .lock()
            .map_err(|e| PortError::Transport(format!("tabs lock poisoned: {e}")))?;
        let tx = g
            .get(&tab_id)
            .ok_or_else(|| PortError::NotFound(format!("no content script in tab {tab_id}")))?;
        tx.send(notification)
            .map_err(|_| PortError::Transport(format!("tab {tab_id} content script gone")))
    }
}

/// A connection to an in-process background coordinator, either a content
/// script's (with a tab and a port) or an extension page's. Requests and
/// responses go through their JSON wire form.
pub struct LocalRuntime<S, T>
where
    S: OriginStore,
    T: TabMessenger,
{
    background: Arc<BackgroundCoordinator<S, T>>,
    sender: MessageSender,
    port: Option<mpsc::Sender<(TabId, Value)>>,
}

impl<S, T> LocalRuntime<S, T>
where
    S: OriginStore,
    T: TabMessenger,
{
    pub fn for_tab(
        background: Arc<BackgroundCoordinator<S, T>>,
        tab_id: TabId,
        port: mpsc::Sender<(TabId, Value)>,
    ) -> Self {
        Self {
            background,
            sender: MessageSender::tab(tab_id),
            port: Some(port),
        }
    }

    pub fn for_extension_page(background: Arc<BackgroundCoordinator<S, T>>) -> Self {
        Self {
            background,
            sender: MessageSender::extension_page(),
            port: None,
        }
    }
}

#[async_trait]
impl<S, T> RuntimePort for LocalRuntime<S, T>
where
    S: OriginStore + 'static,
    T: TabMessenger + 'static,
{
    async fn send_message(
        &self,
        request: RuntimeRequest,
    ) -> Result<Option<RuntimeResponse>, PortError> {
        let raw = serde_json::to_value(&request)
            .map_err(|e| PortError::Validation(format!("runtime request encode failed: {e}")))?;
        let Some(response) = self.background.handle_raw(&raw, self.sender) else {
            return Ok(None);
        };
        RuntimeResponse::deserialize(&response)
            .map(Some)
            .map_err(|e| PortError::Validation(format!("runtime response decode failed: {e}")))
    }

    fn post_to_port(&self, data: Value) -> Result<(), PortError> {
        let (Some(tab_id), Some(port)) = (self.sender.tab_id, self.port.as_ref()) else {
            return Err(PortError::NotImplemented("runtime port outside a tab"));
        };
        port.try_send((tab_id, data)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                PortError::Transport(format!("background port full, tab {tab_id}"))
            }
            mpsc::error::TrySendError::Closed(_) => {
                PortError::Transport("background port closed".to_owned())
            }
        })
    }
}
