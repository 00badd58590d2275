//! App-wide state the gateway UI reads and the bridge writes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::watch;

use saturn_connect_core::PortError;

use crate::proposal::Proposal;

/// Handle on the connected Saturn SDK instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaturnInstance {
    pub chain: String,
}

#[derive(Debug, Default)]
struct Session {
    saturn: Option<SaturnInstance>,
    multisig_id: Option<u32>,
}

pub struct AppState {
    session: Mutex<Session>,
    proposal: watch::Sender<Option<Proposal>>,
    bridge_installed: AtomicBool,
}

impl Default for AppState {
    fn default() -> Self {
        let (proposal, _) = watch::channel(None);
        Self {
            session: Mutex::new(Session::default()),
            proposal,
            bridge_installed: AtomicBool::new(false),
        }
    }
}

impl AppState {
    fn session(&self) -> Result<MutexGuard<'_, Session>, PortError> {
        self.session
            .lock()
            .map_err(|e| PortError::Transport(format!("app session lock poisoned: {e}")))
    }

    fn update(&self, f: impl FnOnce(&mut Session)) {
        match self.session() {
            Ok(mut g) => f(&mut g),
            Err(e) => tracing::warn!(error = %e, "app session not updated"),
        }
    }

    pub fn set_saturn(&self, saturn: Option<SaturnInstance>) {
        self.update(|s| s.saturn = saturn);
    }

    pub fn set_multisig_id(&self, id: Option<u32>) {
        self.update(|s| s.multisig_id = id);
    }

    /// The selected multisig, if a Saturn instance is also connected.
    pub fn active_multisig(&self) -> Option<(SaturnInstance, u32)> {
        let g = match self.session() {
            Ok(g) => g,
            Err(e) => {
                tracing::warn!(error = %e, "no active multisig");
                return None;
            }
        };
        Some((g.saturn.clone()?, g.multisig_id?))
    }

    /// Opens the propose modal with `proposal`.
    pub fn propose(&self, proposal: Proposal) {
        self.proposal.send_replace(Some(proposal));
    }

    /// Modal confirmed or cancelled.
    pub fn clear_proposal(&self) {
        self.proposal.send_replace(None);
    }

    pub fn current_proposal(&self) -> Option<Proposal> {
        self.proposal.borrow().clone()
    }

    pub fn subscribe_proposals(&self) -> watch::Receiver<Option<Proposal>> {
        self.proposal.subscribe()
    }

    /// True only for the first caller.
    pub(crate) fn claim_bridge(&self) -> bool {
        !self.bridge_installed.swap(true, Ordering::SeqCst)
    }
}
