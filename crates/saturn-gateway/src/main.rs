//! Saturn Gateway harness: a gateway tab and a dApp tab wired through an
//! in-process Saturn Connect. Sign payloads are read from stdin, one JSON
//! object per line, submitted through the dApp's injected wallet, and the
//! proposal each one opens in the gateway is printed to stdout.

use std::sync::Arc;
use std::time::Duration;

use eyre::{eyre, WrapErr};
use serde_json::json;
use tokio::sync::watch;

use saturn_connect_core::{SignPayload, TabId, WalletProvider};
use saturn_connect_extension::{
    BridgeConfig, InProcessBrowser, MemoryOriginStore, GATEWAY_MARKER_ID, SATURN_CONNECT_NAME,
};
use saturn_gateway::{
    setup_saturn_connect, AppState, GatewayConfig, InjectedWalletProvider, Proposal,
    SaturnInstance, WalletAggregator,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Initialize logging; stdout carries the proposals
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Saturn Gateway harness");

    let config = GatewayConfig::from_env();
    let multisig_id = config
        .multisig_id
        .ok_or_else(|| eyre!("SATURN_GATEWAY_MULTISIG_ID is not set"))?;
    let multisig_address = config
        .multisig_address
        .clone()
        .ok_or_else(|| eyre!("SATURN_GATEWAY_MULTISIG_ADDRESS is not set"))?;
    let chains = Arc::new(config.chain_table()?);
    let timeout = Duration::from_millis(config.proposal_timeout_ms);

    let browser = InProcessBrowser::start(
        BridgeConfig::from_env(),
        MemoryOriginStore::with_origins([(config.dapp_host.clone(), true)]),
    )
    .await?;
    let gateway = browser.open_tab(TabId(1), &config.gateway_host, [GATEWAY_MARKER_ID])?;
    let dapp = browser.open_tab(TabId(2), &config.dapp_host, ["root"])?;

    let state = Arc::new(AppState::default());
    state.set_saturn(Some(SaturnInstance {
        chain: chains.primary.chain.clone(),
    }));
    state.set_multisig_id(Some(multisig_id));
    let _bridge = setup_saturn_connect(&state, Arc::clone(&chains), &gateway.window)?;

    gateway
        .relay
        .as_ref()
        .ok_or_else(|| eyre!("gateway page did not load the gateway bundle"))?
        .send_multisig_data(json!({
            "address": multisig_address,
            "id": multisig_id,
            "name": format!("Multisig {multisig_id}"),
        }))?;
    wait_for_multisig(&browser, timeout).await?;

    let aggregator = WalletAggregator::new(vec![Arc::new(InjectedWalletProvider::new(
        dapp.registry.clone(),
        config.dapp_host.clone(),
    ))]);
    let wallets = aggregator.get_wallets();
    let wallet = wallets
        .iter()
        .find(|w| w.metadata().id == SATURN_CONNECT_NAME)
        .cloned()
        .ok_or_else(|| eyre!("Saturn Connect is not injected in the dApp page"))?;
    wallet.connect().await?;
    let accounts = wallet.get_accounts().await?;
    tracing::info!(
        wallets = wallets.len(),
        accounts = accounts.len(),
        "dApp connected through Saturn Connect"
    );
    let signer = wallet
        .signer()
        .ok_or_else(|| eyre!("Saturn Connect has no signer"))?;

    let mut proposals = state.subscribe_proposals();
    let input = std::io::read_to_string(std::io::stdin()).wrap_err("reading sign payloads")?;
    for (index, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let payload: SignPayload = match serde_json::from_str(line) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "skipping malformed sign payload");
                continue;
            }
        };

        let result = signer.sign_payload(&payload).await?;
        tracing::debug!(id = result.id, error = ?result.error, "dApp got the proposed result");

        match next_proposal(&mut proposals, timeout).await {
            Some(proposal) => {
                println!("{}", serde_json::to_string(&proposal)?);
                state.clear_proposal();
            }
            None => tracing::warn!(line = index + 1, "no proposal, sign request was dropped"),
        }
    }

    Ok(())
}

async fn wait_for_multisig(browser: &InProcessBrowser, timeout: Duration) -> eyre::Result<()> {
    let background = Arc::clone(browser.background());
    tokio::time::timeout(timeout, async move {
        while background.multisigs().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .map_err(|_| eyre!("background never received the gateway's multisig"))
}

async fn next_proposal(
    rx: &mut watch::Receiver<Option<Proposal>>,
    timeout: Duration,
) -> Option<Proposal> {
    let wait = async {
        loop {
            rx.changed().await.ok()?;
            if let Some(proposal) = rx.borrow_and_update().clone() {
                return Some(proposal);
            }
        }
    };
    tokio::time::timeout(timeout, wait).await.ok().flatten()
}
