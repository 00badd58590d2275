use async_trait::async_trait;
use serde_json::Value;

use saturn_connect_core::{
    MessageOrigin, PortError, RuntimePort, RuntimeRequest, TabId, TabNotification,
    WindowEnvelope, WindowListener, WindowMessage, WindowPort,
};

/// Which page script the content script injects. Chosen once, before any
/// message flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedBundle {
    Gateway,
    Inject,
}

impl InjectedBundle {
    /// Looks for the gateway marker among the page's element ids.
    pub fn for_document<'a>(element_ids: impl IntoIterator<Item = &'a str>, marker_id: &str) -> Self {
        if element_ids.into_iter().any(|id| id == marker_id) {
            Self::Gateway
        } else {
            Self::Inject
        }
    }

    pub fn script(&self) -> &'static str {
        match self {
            Self::Gateway => "gateway.js",
            Self::Inject => "inject.js",
        }
    }
}

pub struct ContentBridge<R, W>
where
    R: RuntimePort,
    W: WindowPort,
{
    tab_id: TabId,
    hostname: String,
    bundle: InjectedBundle,
    runtime: R,
    window: W,
}

impl<R, W> ContentBridge<R, W>
where
    R: RuntimePort,
    W: WindowPort,
{
    pub fn attach(
        tab_id: TabId,
        hostname: impl Into<String>,
        bundle: InjectedBundle,
        runtime: R,
        window: W,
    ) -> Self {
        let hostname = hostname.into();
        tracing::info!(%tab_id, %hostname, script = bundle.script(), "content script attached");
        Self {
            tab_id,
            hostname,
            bundle,
            runtime,
            window,
        }
    }

    pub fn bundle(&self) -> InjectedBundle {
        self.bundle
    }

    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    fn post_to_page(&self, message: WindowMessage) {
        let result = WindowEnvelope::content(message)
            .to_value()
            .and_then(|value| self.window.post_message(value));
        if let Err(e) = result {
            tracing::warn!(tab_id = %self.tab_id, error = %e, "post to page failed");
        }
    }

    /// Anything the background pushes on the long-lived port goes to the page.
    pub fn on_port_message(&self, data: Value) {
        self.post_to_page(WindowMessage::FromContent { data });
    }

    /// Background asked this tab to surface a sign request to its gateway.
    pub fn on_tab_notification(&self, notification: TabNotification) {
        match notification {
            TabNotification::SignPayload { payload } => {
                tracing::debug!(tab_id = %self.tab_id, "sign_payload for this tab's gateway");
                self.post_to_page(WindowMessage::BackgroundSignPayload { payload });
            }
        }
    }

    /// Page-world step. Returns the message to hand to the extension world.
    fn page_world(&self, message: WindowMessage) -> Option<WindowMessage> {
        match message {
            WindowMessage::ProposeSignPayload { payload } => {
                Some(WindowMessage::ContentSignPayload { payload })
            }
            WindowMessage::MultisigData { .. } if self.bundle != InjectedBundle::Gateway => {
                tracing::warn!(tab_id = %self.tab_id, hostname = %self.hostname, "multisig_data from a non-gateway page dropped");
                None
            }
            m @ (WindowMessage::GetMultisigs { .. }
            | WindowMessage::MultisigData { .. }
            | WindowMessage::Extension { .. }) => Some(m),
            WindowMessage::ContentSignPayload { .. }
            | WindowMessage::BackgroundSignPayload { .. }
            | WindowMessage::InGatewaySignPayload { .. }
            | WindowMessage::Multisigs { .. }
            | WindowMessage::FromContent { .. } => None,
        }
    }

    /// Extension-world step.
    async fn extension_world(&self, message: WindowMessage) -> Result<(), PortError> {
        match message {
            WindowMessage::GetMultisigs { request_id } => {
                let response = self
                    .runtime
                    .send_message(RuntimeRequest::GetMultisigs {
                        hostname: self.hostname.clone(),
                    })
                    .await;
                // the page always gets an answer so its request settles
                let multisigs = match response {
                    Ok(Some(response)) => response.into_multisigs(),
                    Ok(None) => Vec::new(),
                    Err(e) => {
                        tracing::warn!(tab_id = %self.tab_id, %request_id, error = %e, "get_multisigs failed");
                        Vec::new()
                    }
                };
                self.post_to_page(WindowMessage::Multisigs {
                    request_id,
                    multisigs,
                });
            }
            WindowMessage::MultisigData { multisig_data } => {
                self.runtime
                    .send_message(RuntimeRequest::MultisigData { multisig_data })
                    .await?;
            }
            WindowMessage::ContentSignPayload { payload } => {
                self.runtime
                    .send_message(RuntimeRequest::SignPayload {
                        hostname: self.hostname.clone(),
                        payload,
                    })
                    .await?;
            }
            WindowMessage::Extension { data } => self.runtime.post_to_port(data)?,
            WindowMessage::ProposeSignPayload { .. }
            | WindowMessage::BackgroundSignPayload { .. }
            | WindowMessage::InGatewaySignPayload { .. }
            | WindowMessage::Multisigs { .. }
            | WindowMessage::FromContent { .. } => {}
        }
        Ok(())
    }
}

#[async_trait]
impl<R, W> WindowListener for ContentBridge<R, W>
where
    R: RuntimePort,
    W: WindowPort,
{
    async fn on_window_message(&self, message: Value) {
        let Some(envelope) = WindowEnvelope::accept(&message, MessageOrigin::Page) else {
            return;
        };
        let Some(message) = self.page_world(envelope.message) else {
            return;
        };
        if let Err(e) = self.extension_world(message).await {
            tracing::warn!(tab_id = %self.tab_id, error = %e, "relay to background failed");
        }
    }
}
