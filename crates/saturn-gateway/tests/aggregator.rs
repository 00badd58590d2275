mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use saturn_connect_core::{
    AccountsCallback, BaseWallet, InjectedAccount, InjectedMetadata, InjectedWeb3, PortError,
    SignPayload, SignRaw, SignerResult, Unsubscribe, WalletIdentity, WalletProvider,
    WalletRegistry,
};
use saturn_gateway::{InjectedWalletProvider, WalletAggregator, WalletConnectProvider};

use common::{harness, sign_payload, ALICE, TINKERNET_GENESIS};

const ORIGIN: &str = "saturn.invarch.network";

#[derive(Default)]
struct StubExtension {
    enabled_for: std::sync::Mutex<Vec<String>>,
    signed: AtomicUsize,
}

#[async_trait]
impl InjectedWeb3 for StubExtension {
    async fn enable(&self, origin: &str) -> Result<(), PortError> {
        self.enabled_for
            .lock()
            .expect("stub lock")
            .push(origin.to_owned());
        Ok(())
    }

    async fn accounts_get(&self) -> Result<Vec<InjectedAccount>, PortError> {
        Ok(vec![InjectedAccount {
            address: ALICE.to_owned(),
            name: Some("alice".to_owned()),
            genesis_hash: None,
            kind: Some("sr25519".to_owned()),
        }])
    }

    fn accounts_subscribe(&self, _callback: AccountsCallback) -> Unsubscribe {
        Unsubscribe::inert()
    }

    async fn sign_payload(&self, _payload: &SignPayload) -> Result<SignerResult, PortError> {
        let id = self.signed.fetch_add(1, Ordering::SeqCst) as u64;
        Ok(SignerResult::signed(id, "0xabba".to_owned()))
    }

    async fn sign_raw(&self, _raw: &SignRaw) -> Result<SignerResult, PortError> {
        Err(PortError::NotImplemented("stub sign_raw"))
    }

    fn metadata_get(&self) -> Vec<InjectedMetadata> {
        Vec::new()
    }

    fn metadata_provide(&self, _metadata: InjectedMetadata) -> bool {
        false
    }
}

fn registry_with(names: &[(&str, &str)]) -> (WalletRegistry, Vec<Arc<StubExtension>>) {
    let registry = WalletRegistry::default();
    let mut stubs = Vec::new();
    for (name, version) in names {
        let stub = Arc::new(StubExtension::default());
        registry
            .register(WalletIdentity::new(*name, *version), stub.clone())
            .expect("register");
        stubs.push(stub);
    }
    (registry, stubs)
}

fn ids(wallets: &[Arc<dyn BaseWallet>]) -> Vec<String> {
    wallets.iter().map(|w| w.metadata().id).collect()
}

#[tokio::test]
async fn wallets_follow_provider_order() {
    let (registry, _stubs) = registry_with(&[("talisman", "1.4.0"), ("polkadot-js", "0.46.1")]);
    let h = harness();
    let aggregator = WalletAggregator::new(vec![
        Arc::new(WalletConnectProvider::new(h.wallet.clone())),
        Arc::new(InjectedWalletProvider::new(registry, ORIGIN)),
    ]);

    let wallets = aggregator.get_wallets();
    assert_eq!(ids(&wallets), vec!["wallet-connect", "polkadot-js", "talisman"]);
}

#[tokio::test]
async fn same_named_wallets_are_all_listed() {
    let (first, _a) = registry_with(&[("polkadot-js", "0.46.1")]);
    let (second, _b) = registry_with(&[("polkadot-js", "0.44.1")]);
    let aggregator = WalletAggregator::new(vec![
        Arc::new(InjectedWalletProvider::new(first, ORIGIN)),
        Arc::new(InjectedWalletProvider::new(second, ORIGIN)),
    ]);

    let wallets = aggregator.get_wallets();
    assert_eq!(ids(&wallets), vec!["polkadot-js", "polkadot-js"]);
    let versions: Vec<_> = wallets
        .iter()
        .map(|w| w.metadata().version.expect("version"))
        .collect();
    assert_eq!(versions, vec!["0.46.1", "0.44.1"]);
}

#[tokio::test]
async fn injected_wallet_connects_by_enabling() {
    let (registry, stubs) = registry_with(&[("polkadot-js", "0.46.1")]);
    let provider = InjectedWalletProvider::new(registry.clone(), ORIGIN);
    let wallet = provider.get_wallets().pop().expect("one wallet");

    assert!(!wallet.is_connected());
    assert!(wallet.signer().is_none());
    assert!(wallet.get_accounts().await.expect("accounts").is_empty());

    wallet.connect().await.expect("connect");
    assert!(wallet.is_connected());
    assert_eq!(
        *stubs[0].enabled_for.lock().expect("stub lock"),
        vec![ORIGIN.to_owned()]
    );
    assert!(registry.get("polkadot-js").expect("get").expect("entry").enabled);

    let accounts = wallet.get_accounts().await.expect("accounts");
    assert_eq!(accounts[0].address, ALICE);

    let signer = wallet.signer().expect("signer");
    let result = signer
        .sign_payload(&sign_payload(ALICE, TINKERNET_GENESIS))
        .await
        .expect("signed");
    assert_eq!(result.signature.as_deref(), Some("0xabba"));
    assert_eq!(stubs[0].signed.load(Ordering::SeqCst), 1);

    wallet.disconnect().await.expect("disconnect");
    assert!(!wallet.is_connected());
}

#[tokio::test]
async fn replaced_extension_is_gone() {
    let (registry, _stubs) = registry_with(&[("polkadot-js", "0.46.1")]);
    let provider = InjectedWalletProvider::new(registry.clone(), ORIGIN);
    let wallet = provider.get_wallets().pop().expect("one wallet");
    wallet.connect().await.expect("connect");

    registry
        .register(
            WalletIdentity::new("polkadot-js", "0.47.0"),
            Arc::new(StubExtension::default()),
        )
        .expect("register newer");

    // the listed wallet still names the old identity
    let err = wallet.get_accounts().await.expect_err("old identity");
    assert!(matches!(err, PortError::NotFound(_)));
    assert!(wallet.signer().is_none());
}
