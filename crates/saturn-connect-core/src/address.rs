use std::fmt;
use std::str::FromStr;

use base58::{FromBase58, ToBase58};
use blake2::{Blake2b512, Digest};
use thiserror::Error;

const SS58_PREFIX: &[u8] = b"SS58PRE";
const CHECKSUM_LEN: usize = 2;
const ACCOUNT_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid base58: {0}")]
    Base58(String),
    #[error("invalid hex public key: {0}")]
    Hex(String),
    #[error("unexpected decoded length {0}")]
    Length(usize),
    #[error("reserved network prefix {0}")]
    ReservedPrefix(u8),
    #[error("checksum mismatch")]
    Checksum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub [u8; ACCOUNT_LEN]);

impl AccountId {
    pub fn to_ss58(&self, prefix: u16) -> String {
        let mut data = Vec::with_capacity(2 + ACCOUNT_LEN + CHECKSUM_LEN);
        let prefix = prefix & 0b0011_1111_1111_1111;
        if prefix < 64 {
            data.push(prefix as u8);
        } else {
            data.push((((prefix & 0b0000_0000_1111_1100) as u8) >> 2) | 0b0100_0000);
            data.push(((prefix >> 8) as u8) | (((prefix & 0b0000_0000_0000_0011) as u8) << 6));
        }
        data.extend_from_slice(&self.0);
        let checksum = ss58_hash(&data);
        data.extend_from_slice(&checksum[..CHECKSUM_LEN]);
        data.to_base58()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", alloy::hex::encode(self.0))
    }
}

impl FromStr for AccountId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_address(s).map(|(account, _)| account)
    }
}

/// Decodes an SS58 string, or a `0x` hex public key (reported as prefix 42),
/// into the account and its network prefix.
pub fn decode_address(raw: &str) -> Result<(AccountId, u16), AddressError> {
    let raw = raw.trim();
    if let Some(hex) = raw.strip_prefix("0x") {
        let bytes = alloy::hex::decode(hex).map_err(|e| AddressError::Hex(e.to_string()))?;
        let account: [u8; ACCOUNT_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::Length(bytes.len()))?;
        return Ok((AccountId(account), 42));
    }

    let data = raw
        .from_base58()
        .map_err(|e| AddressError::Base58(format!("{e:?}")))?;
    if data.is_empty() {
        return Err(AddressError::Length(0));
    }

    let (prefix_len, prefix) = match data[0] {
        0..=63 => (1, u16::from(data[0])),
        64..=127 => {
            if data.len() < 2 {
                return Err(AddressError::Length(data.len()));
            }
            let lower = (data[0] << 2) | (data[1] >> 6);
            let upper = data[1] & 0b0011_1111;
            (2, u16::from(lower) | (u16::from(upper) << 8))
        }
        other => return Err(AddressError::ReservedPrefix(other)),
    };

    if data.len() != prefix_len + ACCOUNT_LEN + CHECKSUM_LEN {
        return Err(AddressError::Length(data.len()));
    }

    let body_len = prefix_len + ACCOUNT_LEN;
    let hash = ss58_hash(&data[..body_len]);
    if hash[..CHECKSUM_LEN] != data[body_len..] {
        return Err(AddressError::Checksum);
    }

    let mut account = [0u8; ACCOUNT_LEN];
    account.copy_from_slice(&data[prefix_len..body_len]);
    Ok((AccountId(account), prefix))
}

/// True when both strings decode to the same public key.
pub fn same_account(a: &str, b: &str) -> Result<bool, AddressError> {
    Ok(decode_address(a)?.0 == decode_address(b)?.0)
}

fn ss58_hash(data: &[u8]) -> Vec<u8> {
    let mut hasher = Blake2b512::new();
    hasher.update(SS58_PREFIX);
    hasher.update(data);
    hasher.finalize().to_vec()
}
