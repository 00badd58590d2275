use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimestampMs(pub u64);

/// Browser tab id as assigned by the extension runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlates a page-world request with its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Multisig identity reported by one gateway tab. Everything except the tab id
/// is opaque to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultisigRecord {
    #[serde(rename = "tabId")]
    pub tab_id: TabId,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl MultisigRecord {
    pub fn new(tab_id: TabId, multisig_data: Value) -> Self {
        let mut data = match multisig_data {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_owned(), other);
                map
            }
        };
        // the sender's tab id always wins over anything the page claims
        data.remove("tabId");
        Self { tab_id, data }
    }

    pub fn address(&self) -> Option<&str> {
        self.data.get("address").and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.data.get("name").and_then(Value::as_str)
    }
}

/// Polkadot `SignerPayloadJSON`. Only the fields the bridge routes on are typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignPayload {
    pub address: String,
    pub genesis_hash: String,
    #[serde(default)]
    pub method: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Polkadot `SignerPayloadRaw`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRaw {
    pub address: String,
    pub data: String,
    #[serde(rename = "type", default = "SignRaw::default_kind")]
    pub kind: String,
}

impl SignRaw {
    fn default_kind() -> String {
        "bytes".to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerError {
    pub code: i64,
    pub message: String,
}

/// `{id, signature}` on success, `{id, error}` for the multisig sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerResult {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SignerError>,
}

impl SignerResult {
    pub fn signed(id: u64, signature: String) -> Self {
        Self {
            id,
            signature: Some(signature),
            error: None,
        }
    }

    pub fn proposed(id: u64, code: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            signature: None,
            error: Some(SignerError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectedAccount {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_hash: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl InjectedAccount {
    /// Records without an address cannot be presented as accounts.
    pub fn from_record(record: &MultisigRecord) -> Option<Self> {
        Some(Self {
            address: record.address()?.to_owned(),
            name: record.name().map(str::to_owned),
            genesis_hash: record
                .data
                .get("genesisHash")
                .and_then(Value::as_str)
                .map(str::to_owned),
            kind: None,
        })
    }
}

/// Chain metadata a dApp hands to `metadata.provide`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectedMetadata {
    pub genesis_hash: String,
    #[serde(default)]
    pub spec_version: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `{name, version}` pair a wallet is advertised under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletIdentity {
    pub name: String,
    pub version: String,
}

impl WalletIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Display metadata for wallets surfaced by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletMetadata {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// WalletConnect settled namespace.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WcNamespace {
    #[serde(default)]
    pub chains: Vec<String>,
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WcSession {
    pub topic: String,
    pub namespaces: BTreeMap<String, WcNamespace>,
    /// Unix seconds.
    pub expiry: u64,
    pub acknowledged: bool,
}

impl WcSession {
    pub fn is_usable(&self, now: TimestampMs) -> bool {
        self.acknowledged && now.0 / 1000 < self.expiry
    }

    /// Account addresses from `namespace:chain:address` CAIP-10 ids.
    pub fn accounts(&self) -> Vec<String> {
        let mut out = Vec::new();
        for ns in self.namespaces.values() {
            for account in &ns.accounts {
                if let Some(address) = account.rsplit(':').next() {
                    if !out.iter().any(|a| a == address) {
                        out.push(address.to_owned());
                    }
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WcMetadata {
    pub name: String,
    pub description: String,
    pub url: String,
    pub icons: Vec<String>,
}

/// Namespaces requested when proposing a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WcConnectParams {
    pub required_namespaces: BTreeMap<String, WcNamespace>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WcRpcRequest {
    pub method: String,
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectReason {
    pub code: i64,
    pub message: String,
}

impl DisconnectReason {
    /// WalletConnect `USER_DISCONNECTED` sdk error.
    pub fn user_disconnected() -> Self {
        Self {
            code: 6000,
            message: "User disconnected.".to_owned(),
        }
    }
}
