use std::path::PathBuf;

use saturn_connect_core::{PortError, WcMetadata};

use crate::chains::ChainTable;
use crate::wc::WalletConnectConfig;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub wc_project_id: Option<String>,
    pub wc_relay_url: String,
    pub app_metadata: WcMetadata,
    /// Chain id every WalletConnect session is requested for; `signRaw` goes
    /// to it.
    pub wc_chain_id: String,
    /// JSON chain table replacing the built-in one.
    pub chain_table_path: Option<PathBuf>,
    pub gateway_host: String,
    pub dapp_host: String,
    pub multisig_id: Option<u32>,
    pub multisig_address: Option<String>,
    pub proposal_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            wc_project_id: None,
            wc_relay_url: "wss://relay.walletconnect.com".to_owned(),
            app_metadata: WcMetadata {
                name: "Saturn Gateway".to_owned(),
                description: "Multisig management across Polkadot chains".to_owned(),
                url: "https://saturn.invarch.network".to_owned(),
                icons: vec!["https://saturn.invarch.network/logo.png".to_owned()],
            },
            wc_chain_id: ChainTable::default().primary.caip2(),
            chain_table_path: None,
            gateway_host: "saturn.invarch.network".to_owned(),
            dapp_host: "localhost".to_owned(),
            multisig_id: None,
            multisig_address: None,
            proposal_timeout_ms: 2_000,
        }
    }
}

impl GatewayConfig {
    /// Defaults overridden by `SATURN_GATEWAY_*` variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.wc_project_id = env_string("SATURN_GATEWAY_WC_PROJECT_ID");
        if let Some(url) = env_string("SATURN_GATEWAY_WC_RELAY_URL") {
            cfg.wc_relay_url = url;
        }
        if let Some(id) = env_string("SATURN_GATEWAY_WC_CHAIN_ID") {
            cfg.wc_chain_id = id;
        }
        if let Some(path) = env_string("SATURN_GATEWAY_CHAIN_TABLE") {
            cfg.chain_table_path = Some(PathBuf::from(path));
        }
        if let Some(host) = env_string("SATURN_GATEWAY_HOST") {
            cfg.gateway_host = host;
        }
        if let Some(host) = env_string("SATURN_GATEWAY_DAPP_HOST") {
            cfg.dapp_host = host;
        }
        cfg.multisig_id = env_string("SATURN_GATEWAY_MULTISIG_ID").and_then(|v| v.parse().ok());
        cfg.multisig_address = env_string("SATURN_GATEWAY_MULTISIG_ADDRESS");
        if let Some(ms) = env_string("SATURN_GATEWAY_PROPOSAL_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            cfg.proposal_timeout_ms = ms;
        }
        cfg
    }

    pub fn chain_table(&self) -> Result<ChainTable, PortError> {
        match &self.chain_table_path {
            Some(path) => ChainTable::load(path),
            None => Ok(ChainTable::default()),
        }
    }

    pub fn wallet_connect(&self) -> WalletConnectConfig {
        WalletConnectConfig {
            project_id: self.wc_project_id.clone(),
            relay_url: self.wc_relay_url.clone(),
            metadata: self.app_metadata.clone(),
            chain_ids: vec![self.wc_chain_id.clone()],
            primary_chain_id: self.wc_chain_id.clone(),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
