//! Gateway web app's end of Saturn Connect: turns relayed sign requests into
//! proposals for the multisig.

use std::sync::Arc;

use alloy::primitives::{Bytes, B256};
use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;

use saturn_connect_core::{
    MessageOrigin, PortError, SignPayload, WindowEnvelope, WindowListener, WindowMessage,
};
use saturn_connect_extension::{spawn_window_listener, WindowBus};

use crate::chains::ChainTable;
use crate::proposal::Proposal;
use crate::state::AppState;

pub struct SaturnConnectBridge {
    state: Arc<AppState>,
    chains: Arc<ChainTable>,
}

impl SaturnConnectBridge {
    pub fn new(state: Arc<AppState>, chains: Arc<ChainTable>) -> Self {
        Self { state, chains }
    }

    /// The proposal a sign request turns into, or `None` if it has to be
    /// dropped.
    pub fn proposal_for(&self, payload: &SignPayload) -> Option<Proposal> {
        let Some((_, multisig_id)) = self.state.active_multisig() else {
            tracing::debug!("sign_payload ignored, no multisig selected");
            return None;
        };

        let call = match alloy::hex::decode(&payload.method) {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                tracing::warn!(multisig_id, error = %e, "sign_payload method is not hex");
                return None;
            }
        };
        let genesis_hash: B256 = match payload.genesis_hash.parse() {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(genesis_hash = %payload.genesis_hash, error = %e, "bad genesis hash");
                return None;
            }
        };

        if self.chains.is_primary(&genesis_hash) {
            return Some(Proposal::LocalCall { call });
        }
        match self.chains.foreign(&genesis_hash) {
            Some(chain) => Some(Proposal::XcmCall {
                chain: chain.chain.clone(),
                call,
            }),
            None => {
                tracing::warn!(%genesis_hash, "sign_payload for an unknown chain dropped");
                None
            }
        }
    }
}

#[async_trait]
impl WindowListener for SaturnConnectBridge {
    async fn on_window_message(&self, message: Value) {
        let Some(envelope) = WindowEnvelope::accept(&message, MessageOrigin::Page) else {
            return;
        };
        let WindowMessage::InGatewaySignPayload { payload } = envelope.message else {
            return;
        };
        if let Some(proposal) = self.proposal_for(&payload) {
            tracing::info!(kind = ?proposal.proposal_type(), "sign request proposed");
            self.state.propose(proposal);
        }
    }
}

/// Installs the bridge on the gateway window. Only the first call per
/// `AppState` installs anything.
pub fn setup_saturn_connect(
    state: &Arc<AppState>,
    chains: Arc<ChainTable>,
    window: &WindowBus,
) -> Result<JoinHandle<()>, PortError> {
    if !state.claim_bridge() {
        return Err(PortError::Policy(
            "saturn connect bridge already installed".to_owned(),
        ));
    }
    let bridge = Arc::new(SaturnConnectBridge::new(Arc::clone(state), chains));
    Ok(spawn_window_listener(bridge, window.subscribe()))
}
