//! Live block fetching from a source chain.

use crate::RetryPolicy;
use alloy_primitives::Bytes;
use archivist_protocol::{ArchivedBlock, BlockMetadata, BlockNumber, encode_block};
use archivist_rpc::{RpcError, SourceChain, justification_from_proof};
use futures::{StreamExt, stream::BoxStream};
use std::ops::RangeInclusive;
use tracing::{debug, info};

/// Chains that finalize their own blocks with GRANDPA. Their blocks only carry a justification
/// at authority set changes, so one is requested for every other block.
pub const RELAY_CHAINS: [&str; 5] = ["Polkadot", "Kusama", "Rococo", "Westend", "Paseo"];

/// Whether the chain named `chain` is a relay chain.
pub fn is_relay_chain(chain: &str) -> bool {
    RELAY_CHAINS.contains(&chain)
}

/// Fetches and encodes finalized blocks of one source chain.
#[derive(Debug)]
pub struct BlockFetcher<C> {
    client: C,
    chain: String,
    relay_chain: bool,
    retry: RetryPolicy,
}

impl<C: SourceChain> BlockFetcher<C> {
    /// Queries the chain name, retrying until the node answers.
    pub async fn connect(client: C, retry: RetryPolicy) -> Result<Self, RpcError> {
        let chain = retry.retry("system_chain", || client.chain_name()).await?;
        let relay_chain = is_relay_chain(&chain);
        info!(target: "fetcher", %chain, relay_chain, "Connected to source chain");
        Ok(Self { client, chain, relay_chain, retry })
    }

    /// The chain name.
    pub fn chain(&self) -> &str {
        &self.chain
    }

    /// Whether blocks get a GRANDPA justification requested when they lack one.
    pub const fn is_relay_chain(&self) -> bool {
        self.relay_chain
    }

    /// The underlying client.
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Fetches and encodes the canonical block at `number`.
    pub async fn fetch(&self, number: BlockNumber) -> Result<ArchivedBlock, RpcError> {
        let hash = self.client.block_hash(number).await?;
        let signed = self.client.block(hash).await?;

        let justification = match signed.grandpa_justification() {
            Some(justification) => Some(justification.clone()),
            None if self.relay_chain && number > 0 => Some(self.finality_proof(number).await?),
            None => None,
        };

        let bytes = encode_block(&signed.block, justification.as_deref());
        debug!(target: "fetcher", chain = %self.chain, block_number = number, size = bytes.len(), "Fetched block");
        Ok(ArchivedBlock::new(bytes.into(), BlockMetadata { number, hash }))
    }

    async fn finality_proof(&self, number: BlockNumber) -> Result<Bytes, RpcError> {
        let proof = self
            .client
            .prove_finality(number)
            .await?
            .ok_or(RpcError::MissingFinalityProof(number))?;
        justification_from_proof(number, &proof)
    }

    /// The last finalized block number, retried until the node answers.
    pub async fn finalized_number(&self) -> Result<BlockNumber, RpcError> {
        self.retry.retry("finalized head query", || self.client.finalized_number()).await
    }

    /// Lazily fetches the blocks in `range` in order, retrying each one until it succeeds.
    pub fn stream(
        &self,
        range: RangeInclusive<BlockNumber>,
    ) -> BoxStream<'_, Result<ArchivedBlock, RpcError>> {
        futures::stream::iter(range)
            .then(move |number| self.retry.retry("block fetch", move || self.fetch(number)))
            .boxed()
    }
}
