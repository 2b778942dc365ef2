//! Signing and submission of `feeds` extrinsics on the target chain.

use crate::{SubmitError, TargetConfig};
use alloy_primitives::{B256, Bytes};
use archivist_protocol::BatchItem;
use archivist_rpc::{
    Call, PalletIndices, StorageKeys, TargetChain,
    extrinsic::{signed_extrinsic, signing_payload},
};
use archivist_signer::{SigningPool, ss58_decode};
use archivist_storage::PersistentState;
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use tracing::{debug, info, warn};

/// Stores blocks on the target chain on behalf of one signing account.
#[async_trait]
pub trait BlockSubmitter: Debug + Send + Sync {
    /// The account's next nonce as seen by the target chain.
    async fn account_nonce(&self) -> Result<u64, SubmitError>;

    /// Stores a single block in `feed_id` with `nonce`. Returns the including block's hash.
    async fn send_block_tx(
        &self,
        feed_id: u64,
        chain: &str,
        item: &BatchItem,
        nonce: u64,
    ) -> Result<B256, SubmitError>;

    /// Stores several blocks atomically in `feed_id` with `nonce`. Returns the including block's
    /// hash.
    async fn send_blocks_batch_tx(
        &self,
        feed_id: u64,
        chain: &str,
        items: &[BatchItem],
        nonce: u64,
    ) -> Result<B256, SubmitError>;
}

/// A [`BlockSubmitter`] signing with a [`SigningPool`] and submitting through a [`TargetChain`].
#[derive(Debug)]
pub struct TargetSubmitter<T> {
    target: Arc<T>,
    signer: SigningPool,
    address: String,
    indices: PalletIndices,
    keys: StorageKeys,
    state: Arc<PersistentState>,
}

impl<T: TargetChain> TargetSubmitter<T> {
    /// Creates a submitter for the account behind `signer`.
    pub fn new(
        target: Arc<T>,
        signer: SigningPool,
        config: &TargetConfig,
        state: Arc<PersistentState>,
    ) -> Self {
        let address = signer.address(config.ss58_prefix);
        Self {
            target,
            signer,
            address,
            indices: config.pallet_indices,
            keys: config.storage_keys.clone(),
            state,
        }
    }

    /// The signing account's SS58 address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the account's feed, creating it on first use.
    ///
    /// A cached feed is only trusted if it exists on chain. A new feed gets the identifier held in
    /// `Feeds.NextFeedId` just before its creation.
    pub async fn get_feed_id(&self) -> Result<u64, SubmitError> {
        if let Some(feed_id) = self.state.get_feed_id(&self.address).await? {
            if self.target.storage(self.keys.feed(feed_id), None).await?.is_some() {
                debug!(target: "submitter", address = %self.address, feed_id, "Using cached feed");
                return Ok(feed_id);
            }
            warn!(target: "submitter", address = %self.address, feed_id, "Cached feed not found on chain");
        }

        let feed_id = self.next_feed_id().await?;
        let nonce = self.target.account_nonce(&self.address).await?;
        let block_hash = self.submit(&self.indices.feeds_create(), nonce).await?;
        self.state.save_feed_id(&self.address, feed_id).await?;
        info!(target: "submitter", address = %self.address, feed_id, %block_hash, "Created feed");
        Ok(feed_id)
    }

    /// Transfers `amount` to the SS58 address `to`.
    pub async fn send_balance_tx(&self, to: &str, amount: u128) -> Result<B256, SubmitError> {
        let (_, dest) = ss58_decode(to)?;
        let nonce = self.target.account_nonce(&self.address).await?;
        let block_hash = self.submit(&self.indices.transfer(&dest, amount), nonce).await?;
        info!(target: "submitter", from = %self.address, to, amount, %block_hash, "Transfer included");
        Ok(block_hash)
    }

    async fn next_feed_id(&self) -> Result<u64, SubmitError> {
        let Some(raw) = self.target.storage(self.keys.next_feed_id.clone(), None).await? else {
            return Ok(0);
        };
        <[u8; 8]>::try_from(raw.as_ref())
            .map(u64::from_le_bytes)
            .map_err(|_| SubmitError::InvalidStorage("Feeds.NextFeedId"))
    }

    /// Signs and submits `call`, waits for its inclusion and checks that it was dispatched
    /// successfully. Returns the including block's hash.
    async fn submit(&self, call: &Call, nonce: u64) -> Result<B256, SubmitError> {
        let context = self.target.chain_context().await?;
        let payload = signing_payload(call, nonce, &context);
        let signature = self.signer.sign(&payload).await?;
        let extrinsic =
            signed_extrinsic(call, nonce, self.signer.public_key().as_bytes(), &signature.to_bytes());

        let status = self.target.submit_and_watch(extrinsic.clone()).await?;
        let Some(block_hash) = status.inclusion_block() else {
            return Err(SubmitError::Rejected(status));
        };
        self.check_dispatch(block_hash, &extrinsic).await?;
        Ok(block_hash)
    }

    async fn check_dispatch(&self, block_hash: B256, extrinsic: &Bytes) -> Result<(), SubmitError> {
        let block = self.target.block(block_hash).await?;
        let Some(index) = block.block.extrinsics.iter().position(|included| included == extrinsic)
        else {
            warn!(target: "submitter", %block_hash, "Extrinsic not found in its including block");
            return Ok(());
        };

        let index = index as u32;
        let events = self
            .target
            .storage(self.keys.system_events.clone(), Some(block_hash))
            .await?
            .unwrap_or_default();
        if self.indices.extrinsic_failed(&events, index) {
            return Err(SubmitError::ExtrinsicFailed { block_hash, index });
        }
        Ok(())
    }
}

#[async_trait]
impl<T: TargetChain> BlockSubmitter for TargetSubmitter<T> {
    async fn account_nonce(&self) -> Result<u64, SubmitError> {
        Ok(self.target.account_nonce(&self.address).await?)
    }

    async fn send_block_tx(
        &self,
        feed_id: u64,
        chain: &str,
        item: &BatchItem,
        nonce: u64,
    ) -> Result<B256, SubmitError> {
        let call = self.indices.feeds_put(feed_id, &item.block, &item.metadata);
        let block_hash = self.submit(&call, nonce).await?;
        debug!(target: "submitter", chain, block_number = item.number, nonce, %block_hash, "Block stored");
        Ok(block_hash)
    }

    async fn send_blocks_batch_tx(
        &self,
        feed_id: u64,
        chain: &str,
        items: &[BatchItem],
        nonce: u64,
    ) -> Result<B256, SubmitError> {
        let calls = items
            .iter()
            .map(|item| self.indices.feeds_put(feed_id, &item.block, &item.metadata))
            .collect::<Vec<_>>();
        let block_hash = self.submit(&self.indices.batch_all(&calls), nonce).await?;
        debug!(
            target: "submitter",
            chain,
            first = items.first().map(|item| item.number),
            last = items.last().map(|item| item.number),
            nonce,
            %block_hash,
            "Batch stored"
        );
        Ok(block_hash)
    }
}
