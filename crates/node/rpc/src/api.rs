//! Substrate JSON-RPC methods used by the relay.
//!
//! The default namespace separator is `_`, so `#[rpc(namespace = "chain")]` with
//! `#[method(name = "getBlock")]` calls `chain_getBlock`.

use crate::{RuntimeVersion, TransactionStatus};
use alloy_primitives::{B256, Bytes};
use archivist_protocol::{Header, SignedBlock};
use jsonrpsee::{
    core::{RpcResult, SubscriptionResult},
    proc_macros::rpc,
};

/// `system_*` methods.
#[rpc(client, namespace = "system")]
pub trait SystemApi {
    /// The chain name.
    #[method(name = "chain")]
    async fn chain(&self) -> RpcResult<String>;

    /// The next usable nonce of an account, including transactions in the pool.
    #[method(name = "accountNextIndex")]
    async fn account_next_index(&self, account: String) -> RpcResult<u64>;
}

/// `chain_*` methods.
#[rpc(client, namespace = "chain")]
pub trait ChainApi {
    /// The hash of the block at `number`, or of the best block when `None`.
    #[method(name = "getBlockHash")]
    async fn block_hash(&self, number: Option<u64>) -> RpcResult<Option<B256>>;

    /// The block with the given hash, or the best block when `None`.
    #[method(name = "getBlock")]
    async fn block(&self, hash: Option<B256>) -> RpcResult<Option<SignedBlock>>;

    /// The hash of the last finalized block.
    #[method(name = "getFinalizedHead")]
    async fn finalized_head(&self) -> RpcResult<B256>;

    /// The header with the given hash, or the best header when `None`.
    #[method(name = "getHeader")]
    async fn header(&self, hash: Option<B256>) -> RpcResult<Option<Header>>;
}

/// `chain_*` subscriptions, which need a WebSocket transport.
#[rpc(client, namespace = "chain")]
pub trait ChainHeadsApi {
    /// Subscribe to finalized headers.
    #[subscription(
        name = "subscribeFinalizedHeads" => "finalizedHead",
        unsubscribe = "unsubscribeFinalizedHeads",
        item = Header
    )]
    async fn subscribe_finalized_heads(&self) -> SubscriptionResult;
}

/// `grandpa_*` methods.
#[rpc(client, namespace = "grandpa")]
pub trait GrandpaApi {
    /// The SCALE encoded finality proof for the block at `number`.
    #[method(name = "proveFinality")]
    async fn prove_finality(&self, number: u64) -> RpcResult<Option<Bytes>>;
}

/// `state_*` methods.
#[rpc(client, namespace = "state")]
pub trait StateApi {
    /// The runtime version at the given block, or at the best block when `None`.
    #[method(name = "getRuntimeVersion")]
    async fn runtime_version(&self, at: Option<B256>) -> RpcResult<RuntimeVersion>;

    /// The raw storage value under `key` at the given block.
    #[method(name = "getStorage")]
    async fn storage(&self, key: Bytes, at: Option<B256>) -> RpcResult<Option<Bytes>>;
}

/// `author_*` methods.
#[rpc(client, namespace = "author")]
pub trait AuthorApi {
    /// Submit an extrinsic and follow its status.
    #[subscription(
        name = "submitAndWatchExtrinsic" => "extrinsicUpdate",
        unsubscribe = "unwatchExtrinsic",
        item = TransactionStatus
    )]
    async fn submit_and_watch_extrinsic(&self, extrinsic: Bytes) -> SubscriptionResult;
}
