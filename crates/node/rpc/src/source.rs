//! Client for the chains whose blocks are relayed.

use crate::{ChainApiClient, ChainHeadsApiClient, GrandpaApiClient, RpcError, SystemApiClient};
use alloy_primitives::{B256, Bytes};
use archivist_protocol::{BlockNumber, Header, SignedBlock};
use async_trait::async_trait;
use futures::{StreamExt, stream::BoxStream};
use jsonrpsee::{
    core::client::Subscription,
    http_client::{HttpClient, HttpClientBuilder},
    ws_client::{WsClient, WsClientBuilder},
};
use std::{fmt::Debug, time::Duration};
use url::Url;

/// Default request timeout of the relay's RPC clients.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Maximum size of a request or response. Blocks close to the payload ceiling are hex encoded,
/// doubling their size on the wire.
pub const MAX_MESSAGE_SIZE: u32 = 64 * 1024 * 1024;

/// Read access to a source chain.
#[async_trait]
pub trait SourceChain: Debug + Send + Sync {
    /// The chain name reported by `system_chain`.
    async fn chain_name(&self) -> Result<String, RpcError>;

    /// The hash of the canonical block at `number`.
    async fn block_hash(&self, number: BlockNumber) -> Result<B256, RpcError>;

    /// The block with the given hash, with its justifications.
    async fn block(&self, hash: B256) -> Result<SignedBlock, RpcError>;

    /// The raw GRANDPA finality proof for the block at `number`, if the node can produce one.
    async fn prove_finality(&self, number: BlockNumber) -> Result<Option<Bytes>, RpcError>;

    /// The hash of the last finalized block.
    async fn finalized_head(&self) -> Result<B256, RpcError>;

    /// The header with the given hash.
    async fn header(&self, hash: B256) -> Result<Header, RpcError>;

    /// The number of the last finalized block.
    async fn finalized_number(&self) -> Result<BlockNumber, RpcError> {
        let hash = self.finalized_head().await?;
        Ok(self.header(hash).await?.number)
    }
}

/// HTTP [`SourceChain`] client.
#[derive(Debug, Clone)]
pub struct SourceClient {
    client: HttpClient,
}

impl SourceClient {
    /// Builds a client for the node at `url`.
    pub fn new(url: &Url, timeout: Duration) -> Result<Self, RpcError> {
        let client = HttpClientBuilder::default()
            .request_timeout(timeout)
            .max_request_size(MAX_MESSAGE_SIZE)
            .max_response_size(MAX_MESSAGE_SIZE)
            .build(url.as_str())?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceChain for SourceClient {
    async fn chain_name(&self) -> Result<String, RpcError> {
        Ok(SystemApiClient::chain(&self.client).await?)
    }

    async fn block_hash(&self, number: BlockNumber) -> Result<B256, RpcError> {
        ChainApiClient::block_hash(&self.client, Some(number))
            .await?
            .ok_or(RpcError::UnknownBlockNumber(number))
    }

    async fn block(&self, hash: B256) -> Result<SignedBlock, RpcError> {
        ChainApiClient::block(&self.client, Some(hash)).await?.ok_or(RpcError::UnknownBlock(hash))
    }

    async fn prove_finality(&self, number: BlockNumber) -> Result<Option<Bytes>, RpcError> {
        Ok(GrandpaApiClient::prove_finality(&self.client, number).await?)
    }

    async fn finalized_head(&self) -> Result<B256, RpcError> {
        Ok(ChainApiClient::finalized_head(&self.client).await?)
    }

    async fn header(&self, hash: B256) -> Result<Header, RpcError> {
        ChainApiClient::header(&self.client, Some(hash)).await?.ok_or(RpcError::UnknownBlock(hash))
    }
}

/// A live `chain_subscribeFinalizedHeads` subscription.
#[derive(Debug)]
pub struct FinalizedHeads {
    subscription: Subscription<Header>,
    // The subscription ends when its client is dropped.
    _client: WsClient,
}

impl FinalizedHeads {
    /// Connects to `url` and subscribes to finalized heads.
    pub async fn subscribe(url: &Url, timeout: Duration) -> Result<Self, RpcError> {
        let client = WsClientBuilder::default()
            .request_timeout(timeout)
            .connection_timeout(timeout)
            .build(url.as_str())
            .await?;
        let subscription = ChainHeadsApiClient::subscribe_finalized_heads(&client).await?;
        Ok(Self { subscription, _client: client })
    }

    /// The next finalized header, or `None` once the subscription has ended.
    pub async fn next(&mut self) -> Option<Result<Header, RpcError>> {
        let header = self.subscription.next().await?;
        Some(header.map_err(|err| RpcError::InvalidNotification(err.to_string())))
    }

    /// Turns the subscription into a stream of headers.
    pub fn into_stream(self) -> BoxStream<'static, Result<Header, RpcError>> {
        futures::stream::unfold(self, |mut heads| async move {
            let header = heads.next().await?;
            Some((header, heads))
        })
        .boxed()
    }
}

/// Extracts the justification from a `grandpa_proveFinality` response, which starts with the
/// 32-byte hash of the proven block.
pub fn justification_from_proof(number: BlockNumber, proof: &[u8]) -> Result<Bytes, RpcError> {
    proof
        .get(B256::len_bytes()..)
        .map(Bytes::copy_from_slice)
        .ok_or(RpcError::TruncatedFinalityProof(number))
}
