#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use saturn_connect_core::{
    ClockPort, DisconnectReason, PairingModal, PendingSession, PortError, SignClient,
    SignClientFactory, SignPayload, WcConnectParams, WcMetadata, WcNamespace, WcRpcRequest,
    WcSession,
};
use saturn_gateway::{ChainTable, GatewayConfig, WalletConnectWallet};

pub const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
pub const BOB: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";
pub const TINKERNET_GENESIS: &str =
    "0xd42e9606a995dfe433dc7955dc2a70f495f350f373daa200098ae84437816ad2";
pub const BASILISK_GENESIS: &str =
    "0xa85cfb9b9fd4d622a5b28289a02347af987d8f73fa3108450e2b4a11c1ce5755";
pub const PRIMARY_CHAIN: &str = "polkadot:d42e9606a995dfe433dc7955dc2a70f4";

/// 2023-11-14T22:13:20Z
pub const NOW_MS: u64 = 1_700_000_000_000;
pub const NOW_SECS: u64 = NOW_MS / 1000;

#[derive(Debug, Clone)]
pub struct TestClock {
    now: Arc<AtomicU64>,
}

impl Default for TestClock {
    fn default() -> Self {
        Self {
            now: Arc::new(AtomicU64::new(NOW_MS)),
        }
    }
}

impl TestClock {
    pub fn advance_secs(&self, secs: u64) {
        self.now.fetch_add(secs * 1000, Ordering::SeqCst);
    }
}

impl ClockPort for TestClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        Ok(self.now.load(Ordering::SeqCst))
    }
}

#[derive(Default)]
pub struct FakeSignClient {
    pub pairing_uri: Mutex<Option<String>>,
    pub persisted: Mutex<Vec<WcSession>>,
    pub connect_params: Mutex<Vec<WcConnectParams>>,
    approvals: Mutex<Vec<oneshot::Sender<Result<WcSession, PortError>>>>,
    pub disconnects: Mutex<Vec<(String, DisconnectReason)>>,
    pub requests: Mutex<Vec<(String, String, WcRpcRequest)>>,
    pub fail_requests: AtomicBool,
    pub fail_disconnect: AtomicBool,
}

impl FakeSignClient {
    pub fn pending_approvals(&self) -> usize {
        self.approvals.lock().expect("approvals lock").len()
    }

    /// Settles the oldest outstanding proposal.
    pub fn settle(&self, outcome: Result<WcSession, PortError>) {
        let tx = self.approvals.lock().expect("approvals lock").remove(0);
        let _ = tx.send(outcome);
    }

    pub fn disconnects(&self) -> Vec<(String, DisconnectReason)> {
        self.disconnects.lock().expect("disconnects lock").clone()
    }

    pub fn requests(&self) -> Vec<(String, String, WcRpcRequest)> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl SignClient for FakeSignClient {
    async fn connect(&self, params: WcConnectParams) -> Result<PendingSession, PortError> {
        self.connect_params
            .lock()
            .expect("params lock")
            .push(params);
        let (tx, approval) = oneshot::channel();
        self.approvals.lock().expect("approvals lock").push(tx);
        Ok(PendingSession {
            uri: self.pairing_uri.lock().expect("uri lock").clone(),
            approval,
        })
    }

    fn sessions(&self) -> Vec<WcSession> {
        self.persisted.lock().expect("persisted lock").clone()
    }

    async fn disconnect(&self, topic: &str, reason: DisconnectReason) -> Result<(), PortError> {
        self.disconnects
            .lock()
            .expect("disconnects lock")
            .push((topic.to_owned(), reason));
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(PortError::Transport("relay unreachable".to_owned()));
        }
        Ok(())
    }

    async fn request(
        &self,
        topic: &str,
        chain_id: &str,
        request: WcRpcRequest,
    ) -> Result<Value, PortError> {
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(PortError::Transport("user rejected the request".to_owned()));
        }
        self.requests.lock().expect("requests lock").push((
            topic.to_owned(),
            chain_id.to_owned(),
            request,
        ));
        Ok(json!({ "id": 4242, "signature": "0xfeed" }))
    }
}

pub struct FakeFactory {
    pub client: Arc<FakeSignClient>,
}

#[async_trait]
impl SignClientFactory for FakeFactory {
    type Client = FakeSignClient;

    async fn init(&self, _metadata: &WcMetadata) -> Result<Arc<Self::Client>, PortError> {
        Ok(Arc::clone(&self.client))
    }
}

#[derive(Default)]
struct ModalState {
    opened: Mutex<Vec<String>>,
    closed: AtomicUsize,
    dismiss: Mutex<Option<oneshot::Sender<()>>>,
}

#[derive(Clone, Default)]
pub struct FakeModal {
    inner: Arc<ModalState>,
}

impl FakeModal {
    pub fn opened(&self) -> Vec<String> {
        self.inner.opened.lock().expect("modal lock").clone()
    }

    pub fn closed(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// The user clicks the modal away.
    pub fn dismiss(&self) {
        if let Some(tx) = self.inner.dismiss.lock().expect("modal lock").take() {
            let _ = tx.send(());
        }
    }
}

impl PairingModal for FakeModal {
    fn open(&self, uri: &str) -> oneshot::Receiver<()> {
        self.inner
            .opened
            .lock()
            .expect("modal lock")
            .push(uri.to_owned());
        let (tx, rx) = oneshot::channel();
        *self.inner.dismiss.lock().expect("modal lock") = Some(tx);
        rx
    }

    fn close(&self) {
        self.inner.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub type TestWallet = WalletConnectWallet<FakeFactory, FakeModal, TestClock>;

pub struct Harness {
    pub wallet: Arc<TestWallet>,
    pub client: Arc<FakeSignClient>,
    pub modal: FakeModal,
    pub clock: TestClock,
}

pub fn harness() -> Harness {
    let client = Arc::new(FakeSignClient::default());
    let modal = FakeModal::default();
    let clock = TestClock::default();
    let wallet = Arc::new(WalletConnectWallet::new(
        FakeFactory {
            client: Arc::clone(&client),
        },
        modal.clone(),
        clock.clone(),
        GatewayConfig::default().wallet_connect(),
    ));
    Harness {
        wallet,
        client,
        modal,
        clock,
    }
}

pub fn session(topic: &str, expiry: u64, acknowledged: bool) -> WcSession {
    WcSession {
        topic: topic.to_owned(),
        namespaces: BTreeMap::from([(
            "polkadot".to_owned(),
            WcNamespace {
                chains: vec![PRIMARY_CHAIN.to_owned()],
                accounts: vec![
                    format!("{PRIMARY_CHAIN}:{ALICE}"),
                    format!("{PRIMARY_CHAIN}:{BOB}"),
                    format!("polkadot:91b171bb158e2d3848fa23a9f1c25182:{ALICE}"),
                ],
                methods: vec![
                    "polkadot_signTransaction".to_owned(),
                    "polkadot_signMessage".to_owned(),
                ],
                events: Vec::new(),
            },
        )]),
        expiry,
        acknowledged,
    }
}

pub fn live_session(topic: &str) -> WcSession {
    session(topic, NOW_SECS + 3_600, true)
}

pub fn sign_payload(address: &str, genesis_hash: &str) -> SignPayload {
    serde_json::from_value(json!({
        "address": address,
        "genesisHash": genesis_hash,
        "method": "0x4a0300",
        "nonce": "0x00000000",
    }))
    .expect("sign payload fixture")
}

/// Polls `cond` until it holds or a second has passed.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

pub fn chains() -> Arc<ChainTable> {
    Arc::new(ChainTable::default())
}
