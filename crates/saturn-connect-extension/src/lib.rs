pub mod background;
pub mod browser;
pub mod config;
pub mod content;
pub mod gateway;
pub mod inject;
pub mod listener;
pub mod memory;
pub mod popup;

pub use background::{BackgroundCoordinator, MessageSender, StorageChange};
pub use browser::{Background, InProcessBrowser, Popup, Runtime, TabContext, PORT_CAPACITY};
pub use config::{
    BridgeConfig, GATEWAY_MARKER_ID, MASQUERADE_NAME, MASQUERADE_SENTINEL_VERSION,
    SATURN_CONNECT_NAME,
};
pub use content::{ContentBridge, InjectedBundle};
pub use gateway::GatewayRelay;
pub use inject::{inject_wallets, InjectedProvider, InjectedWallet, InjectedWallets, ProviderRole};
pub use listener::{spawn_storage_listener, spawn_tab_listener, spawn_window_listener};
pub use memory::{LocalRuntime, MemoryOriginStore, MemoryTabs, WindowBus};
pub use popup::PopupController;
