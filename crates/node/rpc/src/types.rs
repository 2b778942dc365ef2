//! Response types of the target chain RPC.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// The parts of `state_getRuntimeVersion` that go into a signing payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVersion {
    /// The runtime spec version.
    pub spec_version: u32,
    /// The transaction format version.
    pub transaction_version: u32,
}

/// The status of a watched extrinsic, as reported by `author_submitAndWatchExtrinsic`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionStatus {
    /// Waiting in the pool for an earlier nonce.
    Future,
    /// Ready to be included.
    Ready,
    /// Broadcast to the given peers.
    Broadcast(Vec<String>),
    /// Included in the given block.
    InBlock(B256),
    /// The including block was retracted.
    Retracted(B256),
    /// Not finalized within the pool's timeout.
    FinalityTimeout(B256),
    /// Included in the given finalized block.
    Finalized(B256),
    /// Replaced by another transaction with the given hash.
    Usurped(B256),
    /// Dropped from the pool.
    Dropped,
    /// Rejected as invalid.
    Invalid,
}

impl TransactionStatus {
    /// The block the extrinsic was included in, if this status reports inclusion.
    pub const fn inclusion_block(&self) -> Option<B256> {
        match self {
            Self::InBlock(hash) | Self::Finalized(hash) => Some(*hash),
            _ => None,
        }
    }

    /// Whether the pool gave up on the extrinsic.
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Usurped(_) | Self::Dropped | Self::Invalid)
    }
}
