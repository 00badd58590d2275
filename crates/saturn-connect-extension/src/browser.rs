use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use saturn_connect_core::{PortError, TabId, WalletRegistry};

use crate::background::BackgroundCoordinator;
use crate::config::BridgeConfig;
use crate::content::{ContentBridge, InjectedBundle};
use crate::gateway::GatewayRelay;
use crate::inject::{inject_wallets, InjectedProvider, InjectedWallets};
use crate::listener::{spawn_storage_listener, spawn_tab_listener, spawn_window_listener};
use crate::memory::{LocalRuntime, MemoryOriginStore, MemoryTabs, WindowBus};
use crate::popup::PopupController;

pub type Background = BackgroundCoordinator<MemoryOriginStore, MemoryTabs>;
pub type Runtime = LocalRuntime<MemoryOriginStore, MemoryTabs>;
pub type Popup = PopupController<MemoryOriginStore, Runtime>;

type PortReceiver = mpsc::Receiver<(TabId, Value)>;

/// Port messages the background holds before content scripts see
/// `background port full`.
pub const PORT_CAPACITY: usize = 64;

pub struct InProcessBrowser {
    config: BridgeConfig,
    store: Arc<MemoryOriginStore>,
    tabs: MemoryTabs,
    background: Arc<Background>,
    port_tx: mpsc::Sender<(TabId, Value)>,
    port_rx: Mutex<Option<PortReceiver>>,
    storage_pump: JoinHandle<()>,
}

impl InProcessBrowser {
    /// Starts the background: subscribes to storage changes, then loads the
    /// persisted origin flags.
    pub async fn start(config: BridgeConfig, store: MemoryOriginStore) -> Result<Self, PortError> {
        let store = Arc::new(store);
        let tabs = MemoryTabs::default();
        let background = Arc::new(BackgroundCoordinator::new(Arc::clone(&store), tabs.clone()));
        let storage_pump = spawn_storage_listener(Arc::clone(&background), store.subscribe());
        background.init().await?;

        let (port_tx, port_rx) = mpsc::channel(PORT_CAPACITY);
        Ok(Self {
            config,
            store,
            tabs,
            background,
            port_tx,
            port_rx: Mutex::new(Some(port_rx)),
            storage_pump,
        })
    }

    pub fn background(&self) -> &Arc<Background> {
        &self.background
    }

    pub fn store(&self) -> &Arc<MemoryOriginStore> {
        &self.store
    }

    /// The background's end of every tab's long-lived port. Can be taken once.
    pub fn take_port_receiver(&self) -> Option<PortReceiver> {
        self.port_rx.lock().ok().and_then(|mut g| g.take())
    }

    /// Loads a page. `element_ids` are the ids present in its document, which
    /// decide between the gateway and the inject bundle.
    pub fn open_tab<'a>(
        &self,
        tab_id: TabId,
        hostname: &str,
        element_ids: impl IntoIterator<Item = &'a str>,
    ) -> Result<TabContext, PortError> {
        let window = WindowBus::default();
        let bundle = InjectedBundle::for_document(element_ids, &self.config.gateway_marker_id);
        let notifications = self.tabs.open(tab_id)?;

        let runtime = LocalRuntime::for_tab(Arc::clone(&self.background), tab_id, self.port_tx.clone());
        let content = Arc::new(ContentBridge::attach(
            tab_id,
            hostname,
            bundle,
            runtime,
            window.clone(),
        ));
        let mut tasks = vec![
            spawn_window_listener(Arc::clone(&content), window.subscribe()),
            spawn_tab_listener(Arc::clone(&content), notifications),
        ];

        let registry = WalletRegistry::default();
        let provider = Arc::new(InjectedProvider::new(window.clone(), self.config.clone()));
        tasks.push(spawn_window_listener(Arc::clone(&provider), window.subscribe()));
        let wallets = inject_wallets(provider, &registry)?;

        let relay = match bundle {
            InjectedBundle::Gateway => {
                let relay = Arc::new(GatewayRelay::new(window.clone()));
                tasks.push(spawn_window_listener(Arc::clone(&relay), window.subscribe()));
                Some(relay)
            }
            InjectedBundle::Inject => None,
        };

        Ok(TabContext {
            tab_id,
            hostname: hostname.to_owned(),
            window,
            content,
            registry,
            wallets,
            relay,
            tasks,
        })
    }

    pub fn close_tab(&self, tab: TabContext) -> Result<(), PortError> {
        self.tabs.close(tab.tab_id)?;
        self.background.on_tab_removed(tab.tab_id);
        Ok(())
    }

    /// Opens the toolbar popup for `hostname`.
    pub async fn popup(&self, hostname: &str) -> Result<Popup, PortError> {
        let runtime = LocalRuntime::for_extension_page(Arc::clone(&self.background));
        PopupController::open(Arc::clone(&self.store), runtime, hostname).await
    }
}

impl Drop for InProcessBrowser {
    fn drop(&mut self) {
        self.storage_pump.abort();
    }
}

/// Scripts running in one tab.
pub struct TabContext {
    pub tab_id: TabId,
    pub hostname: String,
    pub window: WindowBus,
    pub content: Arc<ContentBridge<Runtime, WindowBus>>,
    pub registry: WalletRegistry,
    pub wallets: InjectedWallets<WindowBus>,
    /// Present only on the gateway page.
    pub relay: Option<Arc<GatewayRelay<WindowBus>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for TabContext {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
