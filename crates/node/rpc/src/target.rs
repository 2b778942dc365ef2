//! Client for the chain the relayed blocks are stored on.

use crate::{
    AuthorApiClient, ChainApiClient, ChainContext, MAX_MESSAGE_SIZE, RpcError, StateApiClient,
    SystemApiClient, TransactionStatus,
};
use alloy_primitives::{B256, Bytes};
use archivist_protocol::SignedBlock;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use std::{
    fmt::{Debug, Display},
    pin::pin,
    sync::Arc,
    time::Duration,
};
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, trace, warn};
use url::Url;

/// Default time an extrinsic may stay in the pool without being included.
pub const DEFAULT_INCLUSION_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Read and submit access to the target chain.
#[async_trait]
pub trait TargetChain: Debug + Send + Sync {
    /// The next usable nonce of the SS58 `address`.
    async fn account_nonce(&self, address: &str) -> Result<u64, RpcError>;

    /// The genesis hash and current runtime version.
    async fn chain_context(&self) -> Result<ChainContext, RpcError>;

    /// The block with the given hash.
    async fn block(&self, hash: B256) -> Result<SignedBlock, RpcError>;

    /// The raw storage value under `key` at block `at`, or at the best block.
    async fn storage(&self, key: Bytes, at: Option<B256>) -> Result<Option<Bytes>, RpcError>;

    /// Submits `extrinsic` and follows its status until it is included in a block or rejected
    /// by the pool. Returns that status, or [`RpcError::InclusionTimeout`] if neither happens in
    /// time.
    async fn submit_and_watch(&self, extrinsic: Bytes) -> Result<TransactionStatus, RpcError>;
}

/// WebSocket [`TargetChain`] client. Reconnects on the next request after the connection drops.
#[derive(Debug)]
pub struct TargetClient {
    url: Url,
    timeout: Duration,
    inclusion_timeout: Duration,
    client: RwLock<Arc<WsClient>>,
    genesis_hash: OnceCell<B256>,
}

impl TargetClient {
    /// Connects to the node at `url`.
    pub async fn connect(url: Url, timeout: Duration) -> Result<Self, RpcError> {
        let client = Self::build(&url, timeout).await?;
        info!(target: "submitter", %url, "Connected to target chain");
        Ok(Self {
            url,
            timeout,
            inclusion_timeout: DEFAULT_INCLUSION_TIMEOUT,
            client: RwLock::new(Arc::new(client)),
            genesis_hash: OnceCell::new(),
        })
    }

    /// Sets how long a submitted extrinsic is followed before giving up on it.
    pub const fn with_inclusion_timeout(mut self, inclusion_timeout: Duration) -> Self {
        self.inclusion_timeout = inclusion_timeout;
        self
    }

    async fn build(url: &Url, timeout: Duration) -> Result<WsClient, RpcError> {
        Ok(WsClientBuilder::default()
            .request_timeout(timeout)
            .connection_timeout(timeout)
            .max_request_size(MAX_MESSAGE_SIZE)
            .max_response_size(MAX_MESSAGE_SIZE)
            .build(url.as_str())
            .await?)
    }

    async fn connection(&self) -> Result<Arc<WsClient>, RpcError> {
        let client = Arc::clone(&*self.client.read().await);
        if client.is_connected() {
            return Ok(client);
        }

        let mut guard = self.client.write().await;
        if !guard.is_connected() {
            debug!(target: "submitter", url = %self.url, "Reconnecting to target chain");
            *guard = Arc::new(Self::build(&self.url, self.timeout).await?);
        }
        Ok(Arc::clone(&*guard))
    }
}

#[async_trait]
impl TargetChain for TargetClient {
    async fn account_nonce(&self, address: &str) -> Result<u64, RpcError> {
        let client = self.connection().await?;
        Ok(SystemApiClient::account_next_index(&*client, address.to_owned()).await?)
    }

    async fn chain_context(&self) -> Result<ChainContext, RpcError> {
        let client = self.connection().await?;
        let genesis_hash = *self
            .genesis_hash
            .get_or_try_init(|| async {
                ChainApiClient::block_hash(&*client, Some(0))
                    .await?
                    .ok_or(RpcError::UnknownBlockNumber(0))
            })
            .await?;
        let runtime = StateApiClient::runtime_version(&*client, None).await?;
        Ok(ChainContext { genesis_hash, runtime })
    }

    async fn block(&self, hash: B256) -> Result<SignedBlock, RpcError> {
        let client = self.connection().await?;
        ChainApiClient::block(&*client, Some(hash)).await?.ok_or(RpcError::UnknownBlock(hash))
    }

    async fn storage(&self, key: Bytes, at: Option<B256>) -> Result<Option<Bytes>, RpcError> {
        let client = self.connection().await?;
        Ok(StateApiClient::storage(&*client, key, at).await?)
    }

    async fn submit_and_watch(&self, extrinsic: Bytes) -> Result<TransactionStatus, RpcError> {
        let client = self.connection().await?;
        let statuses = AuthorApiClient::submit_and_watch_extrinsic(&*client, extrinsic).await?;
        watch_until_final(statuses, self.inclusion_timeout).await
    }
}

/// Follows extrinsic `statuses` until one reports inclusion or rejection.
///
/// An extrinsic parked in the pool as `future` or `ready` never ends the subscription by itself,
/// so the wait is bounded by `timeout`.
pub async fn watch_until_final<S, E>(
    statuses: S,
    timeout: Duration,
) -> Result<TransactionStatus, RpcError>
where
    S: Stream<Item = Result<TransactionStatus, E>>,
    E: Display,
{
    let mut statuses = pin!(statuses);
    let mut last = None;
    let watch = async {
        while let Some(status) = statuses.next().await {
            let status = status.map_err(|err| RpcError::InvalidNotification(err.to_string()))?;
            trace!(target: "submitter", ?status, "Extrinsic status");
            if status.inclusion_block().is_some() || status.is_rejection() {
                return Ok(status);
            }
            last = Some(status);
        }
        Err(RpcError::SubscriptionClosed)
    };

    let watched = tokio::time::timeout(timeout, watch).await;
    match watched {
        Ok(result) => result,
        Err(_) => {
            warn!(target: "submitter", ?last, ?timeout, "Extrinsic not included in time");
            Err(RpcError::InclusionTimeout(timeout))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test(start_paused = true)]
    async fn test_inclusion_ends_the_watch() {
        let statuses = stream::iter([
            Ok::<_, &str>(TransactionStatus::Ready),
            Ok(TransactionStatus::Broadcast(vec![])),
            Ok(TransactionStatus::InBlock(B256::repeat_byte(0x11))),
        ]);
        let status = watch_until_final(statuses, Duration::from_secs(1)).await.unwrap();
        assert_eq!(status, TransactionStatus::InBlock(B256::repeat_byte(0x11)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_future_extrinsic_times_out() {
        let statuses = stream::iter([Ok::<_, &str>(TransactionStatus::Future)]).chain(stream::pending());
        let err = watch_until_final(statuses, Duration::from_secs(30)).await.unwrap_err();
        assert!(matches!(err, RpcError::InclusionTimeout(timeout) if timeout == Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_closed_subscription_is_an_error() {
        let statuses = stream::iter([Ok::<_, &str>(TransactionStatus::Ready)]);
        let err = watch_until_final(statuses, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, RpcError::SubscriptionClosed));

        let statuses = stream::iter([Err::<TransactionStatus, _>("bad json")]);
        let err = watch_until_final(statuses, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, RpcError::InvalidNotification(_)));
    }
}
