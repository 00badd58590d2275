#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::broadcast;

use saturn_connect_core::{
    decode_address, SignPayload, TabId, WindowEnvelope, WindowMessage,
};
use saturn_connect_extension::{
    BackgroundCoordinator, BridgeConfig, InProcessBrowser, MemoryOriginStore, MemoryTabs,
    TabContext, GATEWAY_MARKER_ID,
};

/// Alice, generic substrate prefix.
pub const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
/// Alice, Polkadot prefix.
pub const ALICE_POLKADOT: &str = "15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5";
pub const BOB: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";
pub const TINKERNET_GENESIS: &str =
    "0xd42e9606a995dfe433dc7955dc2a70f495f350f373daa200098ae84437816ad2";

pub const DAPP_HOST: &str = "dapp.example.org";
pub const GATEWAY_HOST: &str = "app.saturn.example";

pub fn test_config() -> BridgeConfig {
    BridgeConfig {
        request_timeout_ms: 2_000,
        ..BridgeConfig::default()
    }
}

/// `address` re-encoded under another network prefix.
pub fn reencode(address: &str, prefix: u16) -> String {
    let (account, _) = decode_address(address).expect("decodable address");
    account.to_ss58(prefix)
}

pub fn origins(entries: &[(&str, bool)]) -> MemoryOriginStore {
    MemoryOriginStore::with_origins(entries.iter().map(|(h, e)| ((*h).to_owned(), *e)))
}

pub type TestBackground = BackgroundCoordinator<MemoryOriginStore, MemoryTabs>;

pub async fn loaded_background(entries: &[(&str, bool)]) -> (TestBackground, MemoryTabs) {
    let tabs = MemoryTabs::default();
    let background = BackgroundCoordinator::new(Arc::new(origins(entries)), tabs.clone());
    background.init().await.expect("load origins");
    (background, tabs)
}

pub async fn browser_with(entries: &[(&str, bool)]) -> InProcessBrowser {
    InProcessBrowser::start(test_config(), origins(entries))
        .await
        .expect("start browser")
}

pub fn open_gateway(browser: &InProcessBrowser, tab: i64) -> TabContext {
    browser
        .open_tab(TabId(tab), GATEWAY_HOST, ["app", GATEWAY_MARKER_ID])
        .expect("open gateway tab")
}

pub fn open_dapp(browser: &InProcessBrowser, tab: i64, hostname: &str) -> TabContext {
    browser
        .open_tab(TabId(tab), hostname, ["root"])
        .expect("open dapp tab")
}

pub fn multisig(address: &str, name: &str) -> Value {
    json!({ "address": address, "name": name, "genesisHash": TINKERNET_GENESIS })
}

pub fn sign_payload(address: &str, genesis_hash: &str) -> SignPayload {
    serde_json::from_value(json!({
        "address": address,
        "genesisHash": genesis_hash,
        "method": "0x4a0300",
        "nonce": "0x00000000",
        "specVersion": "0x00000010",
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

/// Next window message that parses and satisfies `pred`.
pub async fn next_window_message(
    rx: &mut broadcast::Receiver<Value>,
    mut pred: impl FnMut(&WindowEnvelope) -> bool,
) -> WindowEnvelope {
    let wait = async {
        loop {
            let raw = rx.recv().await.expect("window bus open");
            if let Ok(envelope) = WindowEnvelope::parse(&raw) {
                if pred(&envelope) {
                    return envelope;
                }
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(1), wait)
        .await
        .expect("window message in time")
}

/// Drains what has already been posted to the window.
pub fn drain_window(rx: &mut broadcast::Receiver<Value>) -> Vec<WindowEnvelope> {
    let mut out = Vec::new();
    while let Ok(raw) = rx.try_recv() {
        if let Ok(envelope) = WindowEnvelope::parse(&raw) {
            out.push(envelope);
        }
    }
    out
}

pub fn is_sign_hop(envelope: &WindowEnvelope) -> bool {
    matches!(
        envelope.message,
        WindowMessage::ProposeSignPayload { .. }
            | WindowMessage::ContentSignPayload { .. }
            | WindowMessage::BackgroundSignPayload { .. }
            | WindowMessage::InGatewaySignPayload { .. }
    )
}
