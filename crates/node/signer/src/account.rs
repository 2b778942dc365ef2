//! Account seeds and SS58 addresses.

use crate::SignerError;
use alloy_primitives::hex;
use blake2::{Blake2b512, Digest};
use ed25519_dalek::{SigningKey, VerifyingKey};
use std::fmt;

/// Default SS58 prefix of generic Substrate chains.
pub const DEFAULT_SS58_PREFIX: u16 = 42;

const SS58_CHECKSUM_PREAMBLE: &[u8] = b"SS58PRE";
const SS58_CHECKSUM_LEN: usize = 2;

/// A 32-byte ed25519 secret seed.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AccountSeed([u8; 32]);

impl AccountSeed {
    /// Wraps raw seed bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parses a `0x`-prefixed hex seed.
    pub fn from_hex(s: &str) -> Result<Self, SignerError> {
        let digits = s.strip_prefix("0x").ok_or(SignerError::InvalidSeed("missing 0x prefix"))?;
        hex::decode_to_array(digits).map(Self).map_err(|err| match err {
            hex::FromHexError::InvalidHexCharacter { .. } => SignerError::InvalidSeed("not hex"),
            _ => SignerError::InvalidSeed("expected 32 bytes"),
        })
    }

    /// The raw seed bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derives the signing key.
    pub fn signing_key(&self) -> SigningKey {
        SigningKey::from_bytes(&self.0)
    }

    /// Derives the public key.
    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key().verifying_key()
    }
}

impl fmt::Debug for AccountSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccountSeed(<redacted>)")
    }
}

/// Encodes a 32-byte account id as an SS58 address.
pub fn ss58_encode(account: &[u8; 32], prefix: u16) -> String {
    let mut data = Vec::with_capacity(2 + account.len() + SS58_CHECKSUM_LEN);
    match prefix {
        0..=63 => data.push(prefix as u8),
        _ => {
            let ident = prefix & 0b0011_1111_1111_1111;
            data.push((((ident & 0b0000_0000_1111_1100) as u8) >> 2) | 0b0100_0000);
            data.push(((ident >> 8) as u8) | (((ident & 0b0000_0000_0000_0011) as u8) << 6));
        }
    }
    data.extend_from_slice(account);
    let checksum = ss58_checksum(&data);
    data.extend_from_slice(&checksum[..SS58_CHECKSUM_LEN]);
    bs58::encode(data).into_string()
}

/// Decodes an SS58 address into its prefix and 32-byte account id.
pub fn ss58_decode(address: &str) -> Result<(u16, [u8; 32]), SignerError> {
    let data =
        bs58::decode(address).into_vec().map_err(|_| SignerError::InvalidAddress("not base58"))?;
    let (prefix, prefix_len) = match data.first() {
        Some(&first @ 0..=63) => (first as u16, 1),
        Some(&first @ 64..=127) => {
            let second = *data.get(1).ok_or(SignerError::InvalidAddress("truncated"))?;
            let lower = ((first << 2) | (second >> 6)) as u16;
            let upper = (second & 0b0011_1111) as u16;
            (lower | (upper << 8), 2)
        }
        _ => return Err(SignerError::InvalidAddress("unsupported prefix")),
    };

    if data.len() != prefix_len + 32 + SS58_CHECKSUM_LEN {
        return Err(SignerError::InvalidAddress("unexpected length"));
    }
    let (body, checksum) = data.split_at(prefix_len + 32);
    if ss58_checksum(body)[..SS58_CHECKSUM_LEN] != *checksum {
        return Err(SignerError::InvalidAddress("bad checksum"));
    }

    let mut account = [0u8; 32];
    account.copy_from_slice(&body[prefix_len..]);
    Ok((prefix, account))
}

fn ss58_checksum(data: &[u8]) -> [u8; 64] {
    let mut hasher = Blake2b512::new();
    hasher.update(SS58_CHECKSUM_PREAMBLE);
    hasher.update(data);
    hasher.finalize().into()
}
