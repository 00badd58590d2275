use async_trait::async_trait;
use serde_json::Value;

use saturn_connect_core::{
    MessageOrigin, PortError, WindowEnvelope, WindowListener, WindowMessage, WindowPort,
};

/// Page-world script of the Saturn Gateway tab, `window.saturnConnect`.
pub struct GatewayRelay<W: WindowPort> {
    window: W,
}

impl<W: WindowPort> GatewayRelay<W> {
    pub fn new(window: W) -> Self {
        Self { window }
    }

    /// `window.saturnConnect.sendMultisigData`
    pub fn send_multisig_data(&self, multisig_data: Value) -> Result<(), PortError> {
        let envelope = WindowEnvelope::page(WindowMessage::MultisigData { multisig_data });
        self.window.post_message(envelope.to_value()?)
    }
}

#[async_trait]
impl<W: WindowPort> WindowListener for GatewayRelay<W> {
    /// Re-posts background sign requests in the shape the gateway app
    /// listens for.
    async fn on_window_message(&self, message: Value) {
        let Some(envelope) = WindowEnvelope::accept(&message, MessageOrigin::Content) else {
            return;
        };
        let WindowMessage::BackgroundSignPayload { payload } = envelope.message else {
            return;
        };
        let relayed = WindowEnvelope::page(WindowMessage::InGatewaySignPayload { payload })
            .to_value()
            .and_then(|value| self.window.post_message(value));
        if let Err(e) = relayed {
            tracing::warn!(error = %e, "gateway relay failed");
        }
    }
}
