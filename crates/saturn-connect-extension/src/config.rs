use std::time::Duration;

use saturn_connect_core::WalletIdentity;

pub const SATURN_CONNECT_NAME: &str = "Saturn Connect";
pub const MASQUERADE_NAME: &str = "polkadot-js";
/// Version the masquerade registers under; never a real polkadot-js release.
pub const MASQUERADE_SENTINEL_VERSION: &str = "0.0.0-saturn-connect";
pub const GATEWAY_MARKER_ID: &str = "isSaturnGateway";

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub request_timeout_ms: u64,
    pub saturn_connect: WalletIdentity,
    pub masquerade: WalletIdentity,
    pub gateway_marker_id: String,
    pub proposed_error_code: i64,
    pub proposed_message: String,
    /// Neutral result of a masquerade that has stepped aside.
    pub unhandled_error_code: i64,
    pub unhandled_message: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            saturn_connect: WalletIdentity::new(SATURN_CONNECT_NAME, env!("CARGO_PKG_VERSION")),
            masquerade: WalletIdentity::new(MASQUERADE_NAME, MASQUERADE_SENTINEL_VERSION),
            gateway_marker_id: GATEWAY_MARKER_ID.to_owned(),
            proposed_error_code: 4_100,
            proposed_message: "Transaction proposed to the multisig. Approve it in Saturn Gateway."
                .to_owned(),
            unhandled_error_code: 4_200,
            unhandled_message: "Request is not handled by Saturn Connect.".to_owned(),
        }
    }
}

impl BridgeConfig {
    /// Defaults overridden by `SATURN_CONNECT_*` variables. Unparsable values
    /// are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(ms) = env_parse::<u64>("SATURN_CONNECT_REQUEST_TIMEOUT_MS") {
            cfg.request_timeout_ms = ms;
        }
        if let Ok(name) = std::env::var("SATURN_CONNECT_MASQUERADE_NAME") {
            if !name.trim().is_empty() {
                cfg.masquerade.name = name.trim().to_owned();
            }
        }
        if let Ok(marker) = std::env::var("SATURN_CONNECT_GATEWAY_MARKER") {
            if !marker.trim().is_empty() {
                cfg.gateway_marker_id = marker.trim().to_owned();
            }
        }
        if let Some(code) = env_parse::<i64>("SATURN_CONNECT_PROPOSED_CODE") {
            cfg.proposed_error_code = code;
        }
        cfg
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
