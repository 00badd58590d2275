//! Chains the gateway can build proposals for, keyed by genesis hash.

use std::path::Path;

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

use saturn_connect_core::PortError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    /// Label carried by `XcmCall` proposals.
    pub chain: String,
    pub display_name: String,
    pub genesis_hash: B256,
}

impl ChainInfo {
    fn new(chain: &str, display_name: &str, genesis_hash: B256) -> Self {
        Self {
            chain: chain.to_owned(),
            display_name: display_name.to_owned(),
            genesis_hash,
        }
    }

    /// CAIP-2 id in the `polkadot` namespace: the first 16 bytes of the
    /// genesis hash, hex.
    pub fn caip2(&self) -> String {
        format!("polkadot:{}", alloy::hex::encode(&self.genesis_hash[..16]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTable {
    /// The chain the multisig lives on. Calls for it are local.
    pub primary: ChainInfo,
    #[serde(default)]
    pub others: Vec<ChainInfo>,
}

impl Default for ChainTable {
    fn default() -> Self {
        use alloy::primitives::b256;

        Self {
            primary: ChainInfo::new(
                "tinkernet",
                "InvArch Tinkernet",
                b256!("d42e9606a995dfe433dc7955dc2a70f495f350f373daa200098ae84437816ad2"),
            ),
            others: vec![
                ChainInfo::new(
                    "polkadot",
                    "Polkadot",
                    b256!("91b171bb158e2d3848fa23a9f1c25182fb8e20313b2c1eb49219da7a70ce90c3"),
                ),
                ChainInfo::new(
                    "kusama",
                    "Kusama",
                    b256!("b0a8d493285c2df73290dfb7e61f870f17b41801197a149ca93654499ea3dafe"),
                ),
                ChainInfo::new(
                    "basilisk",
                    "Basilisk",
                    b256!("a85cfb9b9fd4d622a5b28289a02347af987d8f73fa3108450e2b4a11c1ce5755"),
                ),
                ChainInfo::new(
                    "bifrost",
                    "Bifrost",
                    b256!("9f28c6a68e0fc9646eff64935684f6eeeece527e37bbe1f213d22caa1d9d6bed"),
                ),
                ChainInfo::new(
                    "picasso",
                    "Picasso",
                    b256!("6811a339673c9daa897944dcdac99c6e2939cc88245ed21951a0a3c9a2be75bc"),
                ),
                ChainInfo::new(
                    "assetHub",
                    "Asset Hub Kusama",
                    b256!("48239ef607d7928874027a43a67689209727dfb3d3dc5e5b03a39bdc2eda771a"),
                ),
            ],
        }
    }
}

impl ChainTable {
    pub fn from_json(raw: &str) -> Result<Self, PortError> {
        let table: Self = serde_json::from_str(raw)
            .map_err(|e| PortError::Validation(format!("chain table: {e}")))?;
        if table.others.iter().any(|c| c.genesis_hash == table.primary.genesis_hash) {
            return Err(PortError::Validation(
                "chain table lists the primary chain twice".to_owned(),
            ));
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, PortError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PortError::NotFound(format!("chain table {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn is_primary(&self, genesis_hash: &B256) -> bool {
        self.primary.genesis_hash == *genesis_hash
    }

    /// A non-primary chain with this genesis hash.
    pub fn foreign(&self, genesis_hash: &B256) -> Option<&ChainInfo> {
        self.others.iter().find(|c| c.genesis_hash == *genesis_hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainInfo> {
        std::iter::once(&self.primary).chain(self.others.iter())
    }
}

/// `polkadot:<first 32 hex chars>` for a `0x` genesis hash string.
pub fn caip2_from_genesis(genesis_hash: &str) -> String {
    let hex = genesis_hash.strip_prefix("0x").unwrap_or(genesis_hash);
    let end = hex.len().min(32);
    format!("polkadot:{}", hex.get(..end).unwrap_or(hex))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caip2_matches_the_string_form() {
        let table = ChainTable::default();
        let from_string =
            caip2_from_genesis("0xd42e9606a995dfe433dc7955dc2a70f495f350f373daa200098ae84437816ad2");
        assert_eq!(from_string, "polkadot:d42e9606a995dfe433dc7955dc2a70f4");
        assert_eq!(table.primary.caip2(), from_string);
    }

    #[test]
    fn table_round_trips_through_json() {
        let table = ChainTable::default();
        let raw = serde_json::to_string(&table).expect("encode");
        assert_eq!(ChainTable::from_json(&raw).expect("decode"), table);
        assert_eq!(table.iter().count(), 7);
    }
}
