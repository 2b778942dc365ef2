//! Wires the configured chains into running relay loops.

use crate::{
    BlockFetcher, ChainHeadTracker, Metrics, RelayConfig, Relayer, RelayerConfig, RetryPolicy,
    ServiceError, SyncStatus, TargetSubmitter, download_archive,
};
use alloy_primitives::B256;
use archivist_protocol::{BlockNumber, Header};
use archivist_rpc::{
    DEFAULT_REQUEST_TIMEOUT, FinalizedHeads, RpcError, SourceClient, TargetClient,
};
use archivist_signer::{AccountSeed, SigningPool};
use archivist_storage::{ArchiveStore, PersistentState};
use futures::{Stream, StreamExt};
use std::{
    future::Future,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

type Submitter = TargetSubmitter<TargetClient>;

/// The relay service: one relay loop per configured chain and the primary chain's finalized
/// head subscription feeding them.
#[derive(Debug)]
pub struct RelayService {
    config: RelayConfig,
    state: Arc<PersistentState>,
    relayer: RelayerConfig,
    signer_workers: usize,
    request_timeout: Duration,
}

impl RelayService {
    /// Creates a service keeping its checkpoints and feed cache in `state_dir`.
    pub fn new(config: RelayConfig, state_dir: impl Into<PathBuf>, relayer: RelayerConfig) -> Self {
        let signer_workers = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self {
            config,
            state: Arc::new(PersistentState::new(state_dir)),
            relayer,
            signer_workers,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets the number of signing workers per account.
    pub const fn with_signer_workers(mut self, signer_workers: usize) -> Self {
        self.signer_workers = signer_workers;
        self
    }

    /// Sets the RPC request timeout.
    pub const fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    const fn retry(&self) -> RetryPolicy {
        self.relayer.retry
    }

    async fn target(&self) -> Result<Arc<TargetClient>, ServiceError> {
        let url = &self.config.target_chain_url;
        let target = self
            .retry()
            .retry("target chain connection", || TargetClient::connect(url.clone(), self.request_timeout))
            .await?;
        info!(target: "relay", %url, "Connected to target chain");
        Ok(Arc::new(target))
    }

    async fn submitter(
        &self,
        target: &Arc<TargetClient>,
        seed: AccountSeed,
    ) -> Result<Arc<Submitter>, ServiceError> {
        let signer = SigningPool::new(seed, self.signer_workers).await?;
        Ok(Arc::new(TargetSubmitter::new(
            Arc::clone(target),
            signer,
            &self.config.target,
            Arc::clone(&self.state),
        )))
    }

    async fn source(&self, url: &Url) -> Result<BlockFetcher<SourceClient>, ServiceError> {
        let client = SourceClient::new(url, self.request_timeout)?;
        Ok(BlockFetcher::connect(client, self.retry()).await?)
    }

    async fn relayer(
        &self,
        chain: &str,
        submitter: Arc<Submitter>,
    ) -> Result<Relayer<Submitter>, ServiceError> {
        let feed_id = self.retry().retry("feed lookup", || submitter.get_feed_id()).await?;
        info!(target: "relay", chain, address = submitter.address(), feed_id, "Relaying into feed");
        Ok(Relayer::new(chain, feed_id, submitter, Arc::clone(&self.state), self.relayer))
    }

    /// Relays every configured chain until one of the loops fails.
    pub async fn run(self) -> Result<(), ServiceError> {
        self.relayer.batch_limits.validate()?;
        Metrics::init();
        let target = self.target().await?;

        let primary = self.source(&self.config.primary_chain.http_url).await?;
        let submitter = self.submitter(&target, self.config.primary_seed()?).await?;
        let primary_relayer = self.relayer(primary.chain(), submitter).await?;
        let primary_tracker = ChainHeadTracker::primary();

        let mut tasks: JoinSet<Result<(), ServiceError>> = JoinSet::new();
        let mut parachain_trackers = Vec::with_capacity(self.config.parachains.len());
        for parachain in &self.config.parachains {
            let fetcher = self.source(&parachain.http_url).await?;
            let submitter = self.submitter(&target, parachain.seed()?).await?;
            let relayer = self.relayer(fetcher.chain(), submitter).await?;
            let tracker = ChainHeadTracker::parachain();
            parachain_trackers.push(tracker.clone());
            info!(target: "relay", chain = fetcher.chain(), para_id = parachain.para_id, "Starting parachain");
            tasks.spawn(async move {
                relayer.relay_parachain(&fetcher, &tracker).await.map_err(ServiceError::from)
            });
        }

        let (url, timeout) = (self.config.primary_chain.ws_url.clone(), self.request_timeout);
        let subscribe = move || {
            let url = url.clone();
            async move { Ok::<_, RpcError>(FinalizedHeads::subscribe(&url, timeout).await?.into_stream()) }
        };
        tasks.spawn(follow_finalized_heads(
            subscribe,
            self.retry(),
            primary_tracker.clone(),
            parachain_trackers,
        ));
        tasks.spawn(async move {
            primary_relayer.relay_primary(&primary, &primary_tracker).await.map_err(ServiceError::from)
        });

        while let Some(task) = tasks.join_next().await {
            task??;
        }
        Ok(())
    }

    /// Replays the primary chain's downloaded archive.
    pub async fn run_archive(self) -> Result<SyncStatus, ServiceError> {
        self.relayer.batch_limits.validate()?;
        Metrics::init();
        let path = self.archive_path()?.to_owned();
        let archive = Arc::new(ArchiveStore::open_read_only(&path)?);

        let target = self.target().await?;
        let primary = self.source(&self.config.primary_chain.http_url).await?;
        let submitter = self.submitter(&target, self.config.primary_seed()?).await?;
        let relayer = self.relayer(primary.chain(), submitter).await?;
        Ok(relayer.relay_from_archive(&archive).await?)
    }

    /// Downloads the primary chain's finalized blocks into `path`, or into the configured
    /// archive path.
    pub async fn download(
        self,
        path: Option<&Path>,
        until: Option<BlockNumber>,
    ) -> Result<SyncStatus, ServiceError> {
        let path = match path {
            Some(path) => path.to_owned(),
            None => self.archive_path()?.to_owned(),
        };
        let archive = Arc::new(ArchiveStore::open(&path)?);
        let primary = self.source(&self.config.primary_chain.http_url).await?;
        Ok(download_archive(&primary, &archive, until).await?)
    }

    /// Transfers `amount` from the primary chain's account to `to`.
    pub async fn fund(self, to: &str, amount: u128) -> Result<B256, ServiceError> {
        let target = self.target().await?;
        let submitter = self.submitter(&target, self.config.primary_seed()?).await?;
        info!(target: "relay", from = submitter.address(), to, amount, "Funding account");
        Ok(submitter.send_balance_tx(to, amount).await?)
    }

    fn archive_path(&self) -> Result<&Path, ServiceError> {
        self.config.primary_chain.downloaded_archive_path.as_deref().ok_or(ServiceError::NoArchivePath)
    }
}

/// Feeds the primary chain's finalized heads into `primary` and wakes the parachain loops,
/// resubscribing whenever the subscription ends.
///
/// A subscription that ends before delivering a head counts as a failed attempt and is
/// retried with backoff. One that delivered heads is renewed at once.
async fn follow_finalized_heads<F, Fut, S>(
    mut subscribe: F,
    retry: RetryPolicy,
    primary: ChainHeadTracker,
    parachains: Vec<ChainHeadTracker>,
) -> Result<(), ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S, RpcError>>,
    S: Stream<Item = Result<Header, RpcError>> + Unpin,
{
    let (primary, parachains) = (&primary, parachains.as_slice());
    loop {
        let received = retry
            .retry("finalized head subscription", || {
                let subscribing = subscribe();
                async move { follow_subscription(subscribing.await?, primary, parachains).await }
            })
            .await?;
        warn!(target: "head", received, "Finalized head subscription ended, resubscribing");
    }
}

/// Follows one subscription until it ends. Returns the number of heads it delivered, or
/// [`RpcError::SubscriptionClosed`] if it delivered none.
async fn follow_subscription<S>(
    mut heads: S,
    primary: &ChainHeadTracker,
    parachains: &[ChainHeadTracker],
) -> Result<u64, RpcError>
where
    S: Stream<Item = Result<Header, RpcError>> + Unpin,
{
    info!(target: "head", "Subscribed to finalized heads");
    let mut received = 0u64;
    while let Some(header) = heads.next().await {
        match header {
            Ok(header) => {
                debug!(target: "head", block_number = header.number, "Finalized head");
                primary.update(header.number);
                Metrics::set_finalized_head(header.number);
                parachains.iter().for_each(ChainHeadTracker::notify);
                received += 1;
            }
            Err(err) => {
                warn!(target: "head", %err, "Invalid finalized head notification");
                break;
            }
        }
    }

    if received == 0 {
        return Err(RpcError::SubscriptionClosed);
    }
    Ok(received)
}
