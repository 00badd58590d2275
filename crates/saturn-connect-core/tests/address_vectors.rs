use saturn_connect_core::{decode_address, same_account, AccountId, AddressError};

const ALICE_GENERIC: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
const ALICE_POLKADOT: &str = "15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5";
const ALICE_PUBKEY: &str = "0xd43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d";
const BOB_GENERIC: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";

#[test]
fn alice_decodes_to_the_same_key_under_every_prefix() {
    let (generic, generic_prefix) = decode_address(ALICE_GENERIC).expect("generic");
    let (polkadot, polkadot_prefix) = decode_address(ALICE_POLKADOT).expect("polkadot");
    assert_eq!(generic_prefix, 42);
    assert_eq!(polkadot_prefix, 0);
    assert_eq!(generic, polkadot);
    assert_eq!(generic.to_string(), ALICE_PUBKEY);
}

#[test]
fn encoding_reproduces_known_addresses() {
    let alice: AccountId = ALICE_PUBKEY.parse().expect("hex public key");
    assert_eq!(alice.to_ss58(42), ALICE_GENERIC);
    assert_eq!(alice.to_ss58(0), ALICE_POLKADOT);
}

#[test]
fn same_account_ignores_formatting() {
    assert!(same_account(ALICE_GENERIC, ALICE_POLKADOT).expect("compare"));
    assert!(same_account(ALICE_GENERIC, ALICE_PUBKEY).expect("compare"));
    assert!(!same_account(ALICE_GENERIC, BOB_GENERIC).expect("compare"));
}

#[test]
fn malformed_addresses_are_rejected() {
    assert!(matches!(
        decode_address("0OIl"),
        Err(AddressError::Base58(_))
    ));
    assert!(matches!(decode_address("0xzz"), Err(AddressError::Hex(_))));
    assert!(matches!(
        decode_address("0xd43593c7"),
        Err(AddressError::Length(4))
    ));
    assert!(matches!(decode_address(""), Err(AddressError::Length(0))));
    assert!(matches!(
        decode_address("5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQZ"),
        Err(AddressError::Checksum)
    ));
}
