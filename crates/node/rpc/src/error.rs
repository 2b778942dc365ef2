use alloy_primitives::B256;
use archivist_protocol::BlockNumber;
use std::time::Duration;
use thiserror::Error;

/// Errors talking to a source or target chain node.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The JSON-RPC request failed.
    #[error("rpc request failed: {0}")]
    Client(#[from] jsonrpsee::core::ClientError),

    /// The node does not know a block with this number.
    #[error("no block hash for block #{0}")]
    UnknownBlockNumber(BlockNumber),

    /// The node does not know a block with this hash.
    #[error("block {0} not found")]
    UnknownBlock(B256),

    /// The node returned no finality proof for a block that needs one.
    #[error("no finality proof for block #{0}")]
    MissingFinalityProof(BlockNumber),

    /// The finality proof is shorter than the block hash it starts with.
    #[error("finality proof for block #{0} is truncated")]
    TruncatedFinalityProof(BlockNumber),

    /// A subscription notification could not be decoded.
    #[error("invalid subscription notification: {0}")]
    InvalidNotification(String),

    /// An extrinsic status subscription ended before a final status was reported.
    #[error("extrinsic status subscription closed")]
    SubscriptionClosed,

    /// A submitted extrinsic was neither included nor rejected in time.
    #[error("extrinsic not included within {0:?}")]
    InclusionTimeout(Duration),
}
