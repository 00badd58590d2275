use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use saturn_connect_core::{OriginStore, RuntimePort, TabMessenger, TabNotification, WindowListener, WindowPort};

use crate::background::{BackgroundCoordinator, StorageChange};
use crate::content::ContentBridge;

/// Delivers every window message to `listener`, one at a time, in arrival
/// order. Ends when the window is dropped.
pub fn spawn_window_listener<L>(listener: Arc<L>, mut rx: broadcast::Receiver<Value>) -> JoinHandle<()>
where
    L: WindowListener + ?Sized + 'static,
{
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(message) => listener.on_window_message(message).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "window listener lagged, messages lost");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

pub fn spawn_tab_listener<R, W>(
    bridge: Arc<ContentBridge<R, W>>,
    mut rx: mpsc::UnboundedReceiver<TabNotification>,
) -> JoinHandle<()>
where
    R: RuntimePort + 'static,
    W: WindowPort + 'static,
{
    tokio::spawn(async move {
        while let Some(notification) = rx.recv().await {
            bridge.on_tab_notification(notification);
        }
        tracing::debug!(tab_id = %bridge.tab_id(), "tab notification channel closed");
    })
}

pub fn spawn_storage_listener<S, T>(
    background: Arc<BackgroundCoordinator<S, T>>,
    mut rx: broadcast::Receiver<Vec<StorageChange>>,
) -> JoinHandle<()>
where
    S: OriginStore + 'static,
    T: TabMessenger + 'static,
{
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(changes) => background.on_storage_changed(changes),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // the mirror may now be stale; reload it from storage
                    tracing::warn!(skipped, "storage listener lagged, reloading origins");
                    if let Err(e) = background.reload().await {
                        tracing::warn!(error = %e, "origin reload failed");
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
