//! WalletConnect v2 wallet for the gateway: pairing, session restore and a
//! signer that forwards sign requests to the paired wallet.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};

use saturn_connect_core::{
    connection_transition, BaseWallet, ClockPort, DisconnectReason, InjectedAccount,
    PairingModal, PendingSession, PortError, SignClient, SignClientFactory, SignPayload, SignRaw,
    Signer, SignerResult, TimestampMs, WalletMetadata, WcConnectParams, WcConnectionAction,
    WcConnectionStatus, WcMetadata, WcNamespace, WcRpcRequest, WcSession,
};

use crate::chains::caip2_from_genesis;

pub const SIGN_TRANSACTION: &str = "polkadot_signTransaction";
pub const SIGN_MESSAGE: &str = "polkadot_signMessage";
const NAMESPACE: &str = "polkadot";

#[derive(Debug, Clone)]
pub struct WalletConnectConfig {
    pub project_id: Option<String>,
    pub relay_url: String,
    pub metadata: WcMetadata,
    pub chain_ids: Vec<String>,
    /// Chain `sign_raw` requests are scoped to.
    pub primary_chain_id: String,
}

/// Signs over one approved session. Dead once the wallet disconnects or the
/// session expires.
pub struct WalletConnectSigner<Cl, C> {
    client: Arc<Cl>,
    session: WcSession,
    primary_chain_id: String,
    clock: Arc<C>,
    live: AtomicBool,
    next_id: AtomicU64,
}

impl<Cl, C> WalletConnectSigner<Cl, C>
where
    Cl: SignClient,
    C: ClockPort + Send + Sync,
{
    fn new(client: Arc<Cl>, session: WcSession, primary_chain_id: String, clock: Arc<C>) -> Self {
        Self {
            client,
            session,
            primary_chain_id,
            clock,
            live: AtomicBool::new(true),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn revoke(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn ensure_usable(&self) -> Result<(), PortError> {
        if !self.is_live() {
            return Err(PortError::SessionExpired(format!(
                "session {} disconnected",
                self.session.topic
            )));
        }
        let now = TimestampMs(self.clock.now_ms()?);
        if !self.session.is_usable(now) {
            self.revoke();
            return Err(PortError::SessionExpired(format!(
                "session {} expired at {}",
                self.session.topic, self.session.expiry
            )));
        }
        Ok(())
    }

    async fn request(&self, chain_id: &str, method: &str, params: Value) -> Result<SignerResult, PortError> {
        self.ensure_usable()?;
        let response = self
            .client
            .request(
                &self.session.topic,
                chain_id,
                WcRpcRequest {
                    method: method.to_owned(),
                    params,
                },
            )
            .await?;
        let signature = response
            .get("signature")
            .and_then(Value::as_str)
            .ok_or_else(|| PortError::Validation(format!("{method} response without signature")))?;
        // local counter, only there to fill the result's id
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SignerResult::signed(id, signature.to_owned()))
    }
}

#[async_trait]
impl<Cl, C> Signer for WalletConnectSigner<Cl, C>
where
    Cl: SignClient,
    C: ClockPort + Send + Sync,
{
    async fn sign_payload(&self, payload: &SignPayload) -> Result<SignerResult, PortError> {
        let chain_id = caip2_from_genesis(&payload.genesis_hash);
        let params = json!({
            "address": payload.address,
            "transactionPayload": payload,
        });
        self.request(&chain_id, SIGN_TRANSACTION, params).await
    }

    async fn sign_raw(&self, raw: &SignRaw) -> Result<SignerResult, PortError> {
        let params = json!({
            "address": raw.address,
            "message": raw.data,
        });
        self.request(&self.primary_chain_id, SIGN_MESSAGE, params).await
    }
}

struct WcState<Cl, C> {
    status: WcConnectionStatus,
    client: Option<Arc<Cl>>,
    session: Option<WcSession>,
    signer: Option<Arc<WalletConnectSigner<Cl, C>>>,
}

impl<Cl, C> Default for WcState<Cl, C> {
    fn default() -> Self {
        Self {
            status: WcConnectionStatus::Disconnected,
            client: None,
            session: None,
            signer: None,
        }
    }
}

impl<Cl, C> WcState<Cl, C> {
    fn transition(&mut self, action: WcConnectionAction) -> Result<(), PortError> {
        let (next, reason) = connection_transition(self.status, action)?;
        tracing::debug!(from = ?self.status, to = ?next, reason, "walletconnect state");
        self.status = next;
        Ok(())
    }
}

pub struct WalletConnectWallet<F, M, C>
where
    F: SignClientFactory,
    M: PairingModal,
    C: ClockPort + Send + Sync + 'static,
{
    factory: F,
    modal: M,
    clock: Arc<C>,
    config: WalletConnectConfig,
    state: Mutex<WcState<F::Client, C>>,
}

impl<F, M, C> WalletConnectWallet<F, M, C>
where
    F: SignClientFactory,
    M: PairingModal,
    C: ClockPort + Send + Sync + 'static,
{
    pub fn new(factory: F, modal: M, clock: C, config: WalletConnectConfig) -> Self {
        Self {
            factory,
            modal,
            clock: Arc::new(clock),
            config,
            state: Mutex::new(WcState::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, WcState<F::Client, C>>, PortError> {
        self.state
            .lock()
            .map_err(|e| PortError::Transport(format!("wc lock poisoned: {e}")))
    }

    pub fn status(&self) -> WcConnectionStatus {
        self.lock().map(|g| g.status).unwrap_or(WcConnectionStatus::Disconnected)
    }

    pub fn session(&self) -> Option<WcSession> {
        self.lock().ok().and_then(|g| g.session.clone())
    }

    fn connect_params(&self) -> WcConnectParams {
        let namespace = WcNamespace {
            chains: self.config.chain_ids.clone(),
            accounts: Vec::new(),
            methods: vec![SIGN_TRANSACTION.to_owned(), SIGN_MESSAGE.to_owned()],
            events: vec!["chainChanged".to_owned(), "accountsChanged".to_owned()],
        };
        WcConnectParams {
            required_namespaces: BTreeMap::from([(NAMESPACE.to_owned(), namespace)]),
        }
    }

    /// Drops client, session and signer. Failures are only logged.
    fn reset(&self) {
        let mut g = match self.lock() {
            Ok(g) => g,
            Err(e) => {
                tracing::warn!(error = %e, "walletconnect reset skipped");
                return;
            }
        };
        if let Some(signer) = g.signer.take() {
            signer.revoke();
        }
        g.client = None;
        g.session = None;
        if let Err(e) = g.transition(WcConnectionAction::Disconnect) {
            tracing::warn!(error = %e, "walletconnect reset");
        }
    }

    fn install(
        &self,
        client: Arc<F::Client>,
        session: WcSession,
        action: WcConnectionAction,
    ) -> Result<(), PortError> {
        let mut g = self.lock()?;
        if action == WcConnectionAction::Approve && g.status != WcConnectionStatus::Pairing {
            return Err(PortError::Cancelled(
                "pairing abandoned before approval".to_owned(),
            ));
        }
        g.transition(action)?;
        let signer = Arc::new(WalletConnectSigner::new(
            Arc::clone(&client),
            session.clone(),
            self.config.primary_chain_id.clone(),
            Arc::clone(&self.clock),
        ));
        tracing::info!(topic = %session.topic, accounts = session.accounts().len(), "walletconnect connected");
        g.client = Some(client);
        g.session = Some(session);
        g.signer = Some(signer);
        Ok(())
    }

    async fn pair(&self) -> Result<(Arc<F::Client>, WcSession), PortError> {
        tracing::debug!(
            relay = %self.config.relay_url,
            project_id = ?self.config.project_id,
            "initializing walletconnect client"
        );
        let client = self.factory.init(&self.config.metadata).await?;
        let PendingSession { uri, approval } = client.connect(self.connect_params()).await?;

        let approved = match uri {
            Some(uri) => {
                let dismissed = self.modal.open(&uri);
                tokio::select! {
                    biased;
                    approved = approval => {
                        self.modal.close();
                        approved
                    }
                    _ = dismissed => {
                        return Err(PortError::Cancelled(
                            "pairing modal closed before approval".to_owned(),
                        ));
                    }
                }
            }
            None => approval.await,
        };
        let session = approved
            .map_err(|_| PortError::Transport("session approval dropped".to_owned()))??;
        Ok((client, session))
    }
}

#[async_trait]
impl<F, M, C> BaseWallet for WalletConnectWallet<F, M, C>
where
    F: SignClientFactory,
    M: PairingModal,
    C: ClockPort + Send + Sync + 'static,
{
    fn metadata(&self) -> WalletMetadata {
        WalletMetadata {
            id: "wallet-connect".to_owned(),
            title: "WalletConnect".to_owned(),
            description: Some("Scan a QR code with a WalletConnect wallet".to_owned()),
            version: Some("2".to_owned()),
        }
    }

    async fn connect(&self) -> Result<(), PortError> {
        self.reset();
        self.lock()?.transition(WcConnectionAction::Pair)?;

        match self.pair().await {
            Ok((client, session)) => {
                let topic = session.topic.clone();
                match self.install(Arc::clone(&client), session, WcConnectionAction::Approve) {
                    Err(PortError::Cancelled(reason)) => {
                        // approved after a disconnect; the peer must not keep it
                        tracing::info!(%topic, "discarding late walletconnect approval");
                        if let Err(e) = client
                            .disconnect(&topic, DisconnectReason::user_disconnected())
                            .await
                        {
                            tracing::warn!(%topic, error = %e, "late session disconnect failed");
                        }
                        Err(PortError::Cancelled(reason))
                    }
                    other => other,
                }
            }
            Err(e) => {
                tracing::info!(error = %e, "walletconnect pairing failed");
                let mut g = self.lock()?;
                if g.status == WcConnectionStatus::Pairing {
                    g.transition(WcConnectionAction::Cancel)?;
                }
                Err(e)
            }
        }
    }

    async fn auto_connect(&self) -> Result<(), PortError> {
        if self.is_connected() {
            return Ok(());
        }
        let client = self.factory.init(&self.config.metadata).await?;
        let Some(session) = client.sessions().pop() else {
            tracing::debug!("no persisted walletconnect session");
            return Ok(());
        };

        let now = TimestampMs(self.clock.now_ms()?);
        if session.is_usable(now) {
            self.reset();
            return self.install(client, session, WcConnectionAction::Restore);
        }

        tracing::info!(
            topic = %session.topic,
            expiry = session.expiry,
            acknowledged = session.acknowledged,
            "stale walletconnect session, disconnecting"
        );
        let result = client
            .disconnect(&session.topic, DisconnectReason::user_disconnected())
            .await;
        self.reset();
        if let Err(e) = result {
            tracing::warn!(topic = %session.topic, error = %e, "stale session disconnect failed");
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), PortError> {
        let target = {
            let g = self.lock()?;
            g.client
                .clone()
                .zip(g.session.as_ref().map(|s| s.topic.clone()))
        };
        let result = match target {
            Some((client, topic)) => {
                client
                    .disconnect(&topic, DisconnectReason::user_disconnected())
                    .await
            }
            None => Ok(()),
        };
        self.reset();
        tracing::info!("walletconnect disconnected");
        result
    }

    fn is_connected(&self) -> bool {
        self.lock()
            .map(|g| g.client.is_some() && g.signer.is_some() && g.session.is_some())
            .unwrap_or(false)
    }

    async fn get_accounts(&self) -> Result<Vec<InjectedAccount>, PortError> {
        let g = self.lock()?;
        Ok(g.session
            .as_ref()
            .map(WcSession::accounts)
            .unwrap_or_default()
            .into_iter()
            .map(|address| InjectedAccount {
                address,
                name: None,
                genesis_hash: None,
                kind: None,
            })
            .collect())
    }

    fn signer(&self) -> Option<Arc<dyn Signer>> {
        let g = self.lock().ok()?;
        let signer = g.signer.clone()?;
        Some(signer)
    }
}
