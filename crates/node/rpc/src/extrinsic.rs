//! Construction of the signed extrinsics the relay submits to the target chain.
//!
//! Extrinsics use the version 4 format with an ed25519 signer:
//!
//! ```text
//! compact(len) || 0x84 || MultiAddress::Id(signer) || MultiSignature::Ed25519(sig) || extra || call
//! ```
//!
//! where `extra` is an immortal era, the compact nonce and a zero compact tip. The signed payload
//! is `call || extra || spec_version || transaction_version || genesis_hash || genesis_hash`.

use crate::RuntimeVersion;
use alloy_primitives::{B256, Bytes, bytes};
use blake2::{Blake2b, Digest, digest::consts::U16};
use parity_scale_codec::{Compact, Encode};
use serde::{Deserialize, Serialize};

/// Signed extrinsic, format version 4.
const SIGNED_EXTRINSIC_V4: u8 = 0b1000_0100;
/// `MultiAddress::Id`.
const MULTI_ADDRESS_ID: u8 = 0;
/// `MultiSignature::Ed25519`.
const MULTI_SIGNATURE_ED25519: u8 = 0;
/// `Era::Immortal`.
const IMMORTAL_ERA: u8 = 0;
/// `Phase::ApplyExtrinsic`.
const PHASE_APPLY_EXTRINSIC: u8 = 0;

/// Pallet and call indices of the target runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PalletIndices {
    /// The `System` pallet.
    pub system: u8,
    /// The `System::ExtrinsicFailed` event.
    pub system_extrinsic_failed_event: u8,
    /// The `Balances` pallet.
    pub balances: u8,
    /// `Balances::transfer`.
    pub balances_transfer: u8,
    /// The `Utility` pallet.
    pub utility: u8,
    /// `Utility::batch_all`.
    pub utility_batch_all: u8,
    /// The `Feeds` pallet.
    pub feeds: u8,
    /// `Feeds::create`.
    pub feeds_create: u8,
    /// `Feeds::put`.
    pub feeds_put: u8,
}

impl Default for PalletIndices {
    fn default() -> Self {
        Self {
            system: 0,
            system_extrinsic_failed_event: 1,
            balances: 4,
            balances_transfer: 0,
            utility: 11,
            utility_batch_all: 2,
            feeds: 12,
            feeds_create: 0,
            feeds_put: 2,
        }
    }
}

impl PalletIndices {
    /// `Feeds::put(feed_id, block, metadata)`.
    pub fn feeds_put(&self, feed_id: u64, block: &[u8], metadata: &[u8]) -> Call {
        Call::new(self.feeds, self.feeds_put).arg(feed_id).arg(block).arg(metadata)
    }

    /// `Feeds::create()`.
    pub fn feeds_create(&self) -> Call {
        Call::new(self.feeds, self.feeds_create)
    }

    /// `Utility::batch_all(calls)`.
    pub fn batch_all(&self, calls: &[Call]) -> Call {
        let mut call = Call::new(self.utility, self.utility_batch_all).arg(Compact(calls.len() as u32));
        for inner in calls {
            call.0.extend_from_slice(&inner.0);
        }
        call
    }

    /// `Balances::transfer(MultiAddress::Id(dest), amount)`.
    pub fn transfer(&self, dest: &[u8; 32], amount: u128) -> Call {
        Call::new(self.balances, self.balances_transfer)
            .arg(MULTI_ADDRESS_ID)
            .arg(dest)
            .arg(Compact(amount))
    }

    /// Whether the SCALE encoded `System.Events` contain `ExtrinsicFailed` for the extrinsic at
    /// `extrinsic_index`.
    ///
    /// This scans for the byte pattern of an `ApplyExtrinsic(index)` phase followed by the
    /// `System::ExtrinsicFailed` event index instead of decoding the events with runtime
    /// metadata, so an unrelated event payload containing the same seven bytes is a false
    /// positive.
    pub fn extrinsic_failed(&self, events: &[u8], extrinsic_index: u32) -> bool {
        let mut pattern = [0u8; 7];
        pattern[0] = PHASE_APPLY_EXTRINSIC;
        pattern[1..5].copy_from_slice(&extrinsic_index.to_le_bytes());
        pattern[5] = self.system;
        pattern[6] = self.system_extrinsic_failed_event;
        events.windows(pattern.len()).any(|window| window == pattern)
    }
}

/// An encoded runtime call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call(Vec<u8>);

impl Call {
    fn new(pallet: u8, call: u8) -> Self {
        Self(vec![pallet, call])
    }

    fn arg(mut self, arg: impl Encode) -> Self {
        arg.encode_to(&mut self.0);
        self
    }

    /// The encoded call.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Chain parameters committed to by every signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainContext {
    /// The target chain's genesis hash.
    pub genesis_hash: B256,
    /// The target chain's runtime version.
    pub runtime: RuntimeVersion,
}

/// The bytes to sign for `call` sent with `nonce`.
pub fn signing_payload(call: &Call, nonce: u64, context: &ChainContext) -> Vec<u8> {
    let mut payload = Vec::with_capacity(call.0.len() + 16 + 2 * B256::len_bytes());
    payload.extend_from_slice(&call.0);
    encode_extra(nonce, &mut payload);
    context.runtime.spec_version.encode_to(&mut payload);
    context.runtime.transaction_version.encode_to(&mut payload);
    // Genesis hash, once for the genesis check and once as the immortal era's birth block.
    payload.extend_from_slice(context.genesis_hash.as_slice());
    payload.extend_from_slice(context.genesis_hash.as_slice());
    payload
}

/// Assembles a signed extrinsic, length prefixed as it appears in a block body.
pub fn signed_extrinsic(call: &Call, nonce: u64, signer: &[u8; 32], signature: &[u8; 64]) -> Bytes {
    let mut body = Vec::with_capacity(call.0.len() + 112);
    body.push(SIGNED_EXTRINSIC_V4);
    body.push(MULTI_ADDRESS_ID);
    body.extend_from_slice(signer);
    body.push(MULTI_SIGNATURE_ED25519);
    body.extend_from_slice(signature);
    encode_extra(nonce, &mut body);
    body.extend_from_slice(&call.0);
    body.encode().into()
}

fn encode_extra(nonce: u64, out: &mut Vec<u8>) {
    out.push(IMMORTAL_ERA);
    Compact(nonce).encode_to(out);
    Compact(0u128).encode_to(out);
}

/// Raw storage keys read by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageKeys {
    /// `System.Events`.
    pub system_events: Bytes,
    /// Prefix of the `Feeds.Feeds` map, keyed by `Blake2_128Concat(feed_id)`.
    pub feeds: Bytes,
    /// `Feeds.NextFeedId`.
    pub next_feed_id: Bytes,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            system_events: bytes!(
                "26aa394eea5630e07c48ae0c9558cef780d41e5e16056765bc8461851072c9d7"
            ),
            feeds: bytes!("407d94c38db8ad2e4aa005c8942ac2c5407d94c38db8ad2e4aa005c8942ac2c5"),
            next_feed_id: bytes!(
                "407d94c38db8ad2e4aa005c8942ac2c581e8e181f100361680df5736f4881b7e"
            ),
        }
    }
}

impl StorageKeys {
    /// The key of the `Feeds.Feeds` entry for `feed_id`.
    pub fn feed(&self, feed_id: u64) -> Bytes {
        let id = feed_id.to_le_bytes();
        let mut key = Vec::with_capacity(self.feeds.len() + 16 + id.len());
        key.extend_from_slice(&self.feeds);
        key.extend_from_slice(&Blake2b::<U16>::digest(id));
        key.extend_from_slice(&id);
        key.into()
    }
}
