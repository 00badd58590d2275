mod common;

use std::sync::atomic::Ordering;

use saturn_connect_core::{BaseWallet, PortError, WcConnectionStatus};
use saturn_gateway::{SIGN_MESSAGE, SIGN_TRANSACTION};

use common::{
    eventually, harness, live_session, session, sign_payload, ALICE, BOB, NOW_SECS, PRIMARY_CHAIN,
    TINKERNET_GENESIS,
};

#[tokio::test]
async fn connect_pairs_through_the_qr_modal() {
    let h = harness();
    *h.client.pairing_uri.lock().expect("uri lock") = Some("wc:7f6e@2?relay-protocol=irn".to_owned());

    let approve = async {
        eventually(|| !h.modal.opened().is_empty()).await;
        assert_eq!(h.wallet.status(), WcConnectionStatus::Pairing);
        h.client.settle(Ok(live_session("topic-a")));
    };
    let (connected, ()) = tokio::join!(h.wallet.connect(), approve);
    connected.expect("connect");

    assert!(h.wallet.is_connected());
    assert_eq!(h.wallet.status(), WcConnectionStatus::Connected);
    assert_eq!(h.modal.opened(), vec!["wc:7f6e@2?relay-protocol=irn".to_owned()]);
    assert_eq!(h.modal.closed(), 1);

    let accounts = h.wallet.get_accounts().await.expect("accounts");
    let addresses: Vec<_> = accounts.iter().map(|a| a.address.as_str()).collect();
    assert_eq!(addresses, vec![ALICE, BOB]);

    let params = h.client.connect_params.lock().expect("params lock").clone();
    assert_eq!(params.len(), 1);
    let polkadot = &params[0].required_namespaces["polkadot"];
    assert_eq!(polkadot.chains, vec![PRIMARY_CHAIN.to_owned()]);
    assert_eq!(
        polkadot.methods,
        vec![SIGN_TRANSACTION.to_owned(), SIGN_MESSAGE.to_owned()]
    );
}

#[tokio::test]
async fn existing_pairing_skips_the_modal() {
    let h = harness();

    let approve = async {
        eventually(|| h.client.pending_approvals() == 1).await;
        h.client.settle(Ok(live_session("topic-b")));
    };
    let (connected, ()) = tokio::join!(h.wallet.connect(), approve);
    connected.expect("connect");

    assert!(h.wallet.is_connected());
    assert!(h.modal.opened().is_empty());
    assert_eq!(h.wallet.session().map(|s| s.topic), Some("topic-b".to_owned()));
}

#[tokio::test]
async fn closing_the_modal_rejects_connect() {
    let h = harness();
    *h.client.pairing_uri.lock().expect("uri lock") = Some("wc:abcd@2".to_owned());

    let dismiss = async {
        eventually(|| !h.modal.opened().is_empty()).await;
        h.modal.dismiss();
    };
    let (connected, ()) = tokio::join!(h.wallet.connect(), dismiss);

    let err = connected.expect_err("dismissed modal");
    assert!(matches!(err, PortError::Cancelled(_)));
    assert!(!h.wallet.is_connected());
    assert_eq!(h.wallet.status(), WcConnectionStatus::Disconnected);
    assert!(h.wallet.signer().is_none());
}

#[tokio::test]
async fn rejected_proposal_leaves_the_wallet_disconnected() {
    let h = harness();

    let reject = async {
        eventually(|| h.client.pending_approvals() == 1).await;
        h.client
            .settle(Err(PortError::Transport("proposal expired".to_owned())));
    };
    let (connected, ()) = tokio::join!(h.wallet.connect(), reject);

    assert!(matches!(connected, Err(PortError::Transport(_))));
    assert_eq!(h.wallet.status(), WcConnectionStatus::Disconnected);

    // a later attempt starts from a clean slate
    let approve = async {
        eventually(|| h.client.pending_approvals() == 1).await;
        h.client.settle(Ok(live_session("topic-c")));
    };
    let (connected, ()) = tokio::join!(h.wallet.connect(), approve);
    connected.expect("second connect");
    assert!(h.wallet.is_connected());
}

#[tokio::test]
async fn approval_after_disconnect_is_torn_down() {
    let h = harness();

    let abandon = async {
        eventually(|| h.client.pending_approvals() == 1).await;
        h.wallet.disconnect().await.expect("disconnect while pairing");
        assert_eq!(h.wallet.status(), WcConnectionStatus::Disconnected);
        h.client.settle(Ok(live_session("topic-late")));
    };
    let (connected, ()) = tokio::join!(h.wallet.connect(), abandon);

    let err = connected.expect_err("pairing abandoned");
    assert!(matches!(err, PortError::Cancelled(_)));
    assert!(!h.wallet.is_connected());
    assert!(h.wallet.signer().is_none());
    assert_eq!(h.wallet.status(), WcConnectionStatus::Disconnected);

    let disconnects = h.client.disconnects();
    assert_eq!(disconnects.len(), 1);
    assert_eq!(disconnects[0].0, "topic-late");
    assert_eq!(disconnects[0].1.code, 6000);
}

#[tokio::test]
async fn auto_connect_restores_the_latest_session() {
    let h = harness();
    h.client
        .persisted
        .lock()
        .expect("persisted lock")
        .extend([live_session("older"), live_session("newest")]);

    h.wallet.auto_connect().await.expect("auto connect");

    assert!(h.wallet.is_connected());
    assert_eq!(h.wallet.status(), WcConnectionStatus::Connected);
    assert_eq!(h.wallet.session().map(|s| s.topic), Some("newest".to_owned()));
    assert!(h.client.disconnects().is_empty());
    assert_eq!(h.client.pending_approvals(), 0);
}

#[tokio::test]
async fn auto_connect_disconnects_an_expired_session() {
    let h = harness();
    h.client
        .persisted
        .lock()
        .expect("persisted lock")
        .push(session("stale", NOW_SECS - 1, true));

    h.wallet.auto_connect().await.expect("auto connect");

    assert!(!h.wallet.is_connected());
    let disconnects = h.client.disconnects();
    assert_eq!(disconnects.len(), 1);
    assert_eq!(disconnects[0].0, "stale");
    assert_eq!(disconnects[0].1.code, 6000);
    assert_eq!(disconnects[0].1.message, "User disconnected.");
}

#[tokio::test]
async fn auto_connect_disconnects_an_unacknowledged_session() {
    let h = harness();
    h.client
        .persisted
        .lock()
        .expect("persisted lock")
        .push(session("pending", NOW_SECS + 600, false));

    h.wallet.auto_connect().await.expect("auto connect");

    assert!(!h.wallet.is_connected());
    assert_eq!(h.client.disconnects().len(), 1);
}

#[tokio::test]
async fn auto_connect_without_a_session_is_a_no_op() {
    let h = harness();

    h.wallet.auto_connect().await.expect("auto connect");

    assert!(!h.wallet.is_connected());
    assert!(h.client.disconnects().is_empty());
    assert!(h.modal.opened().is_empty());
}

#[tokio::test]
async fn disconnect_resets_even_when_the_relay_fails() {
    let h = harness();
    h.client
        .persisted
        .lock()
        .expect("persisted lock")
        .push(live_session("topic-d"));
    h.wallet.auto_connect().await.expect("auto connect");
    let signer = h.wallet.signer().expect("signer");

    h.client.fail_disconnect.store(true, Ordering::SeqCst);
    let err = h.wallet.disconnect().await.expect_err("relay failure surfaces");
    assert!(matches!(err, PortError::Transport(_)));

    assert!(!h.wallet.is_connected());
    assert!(h.wallet.session().is_none());
    assert_eq!(h.wallet.status(), WcConnectionStatus::Disconnected);
    assert!(h.wallet.get_accounts().await.expect("accounts").is_empty());

    let stale = signer
        .sign_payload(&sign_payload(ALICE, TINKERNET_GENESIS))
        .await
        .expect_err("revoked signer");
    assert!(matches!(stale, PortError::SessionExpired(_)));
    assert!(h.client.requests().is_empty());
}

#[tokio::test]
async fn disconnect_without_a_session_succeeds() {
    let h = harness();

    h.wallet.disconnect().await.expect("disconnect");

    assert!(h.client.disconnects().is_empty());
    assert_eq!(h.wallet.status(), WcConnectionStatus::Disconnected);
}
