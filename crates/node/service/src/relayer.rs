//! The relay loops of one source chain.

use crate::{
    BatchLimits, BatchStream, BlockFetcher, BlockSubmitter, ChainHeadTracker, Metrics, RelayError,
    RetryPolicy, SubmitError,
};
use alloy_primitives::B256;
use archivist_protocol::{Batch, BlockNumber};
use archivist_rpc::SourceChain;
use archivist_storage::{ArchiveStore, PersistentState};
use futures::StreamExt;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{task::JoinHandle, time::Instant};
use tracing::{debug, info, warn};

/// Default interval between two archive replay throughput reports.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(60);

/// Default interval at which a caught-up parachain loop re-queries the finalized head.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(12);

/// Tuning of a [`Relayer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayerConfig {
    /// Batch closing limits.
    pub batch_limits: BatchLimits,
    /// Backoff of failed network calls.
    pub retry: RetryPolicy,
    /// Interval between archive replay throughput reports.
    pub report_interval: Duration,
    /// Interval at which a caught-up parachain loop re-queries the finalized head.
    pub poll_interval: Duration,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            batch_limits: BatchLimits::default(),
            retry: RetryPolicy::default(),
            report_interval: DEFAULT_REPORT_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Outcome of one catch-up pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Every block up to and including this one has been confirmed.
    BacklogDrained(BlockNumber),
    /// There was nothing to relay.
    UpToDate,
}

/// Relays the blocks of one source chain into one feed, signing with one account.
///
/// The relayer owns the account's nonce for as long as a loop runs: at most one of its
/// transactions is unconfirmed at any time, and blocks are submitted in increasing order.
#[derive(Debug)]
pub struct Relayer<S> {
    sink: BatchSink<S>,
    config: RelayerConfig,
}

impl<S: BlockSubmitter + 'static> Relayer<S> {
    /// Creates a relayer for `chain` storing into `feed_id`.
    pub fn new(
        chain: impl Into<String>,
        feed_id: u64,
        submitter: Arc<S>,
        state: Arc<PersistentState>,
        config: RelayerConfig,
    ) -> Self {
        let sink = BatchSink {
            chain: chain.into(),
            feed_id,
            submitter,
            state,
            retry: config.retry,
        };
        Self { sink, config }
    }

    /// The source chain name.
    pub fn chain(&self) -> &str {
        &self.sink.chain
    }

    /// The first block not yet confirmed.
    pub async fn next_block(&self) -> Result<BlockNumber, RelayError> {
        let last = self.sink.state.get_last_processed(&self.sink.chain).await?;
        Ok(last.map_or(0, |last| last + 1))
    }

    async fn account_nonce(&self) -> Result<u64, SubmitError> {
        self.config.retry.retry("account nonce query", || self.sink.submitter.account_nonce()).await
    }

    /// Replays a downloaded archive from the last checkpoint to its end.
    ///
    /// Submissions are strictly serialized. Throughput is reported every `report_interval`.
    pub async fn relay_from_archive(
        &self,
        archive: &Arc<ArchiveStore>,
    ) -> Result<SyncStatus, RelayError> {
        let mut nonce = self.account_nonce().await?;
        let last_processed = self.sink.state.get_last_processed(&self.sink.chain).await?;
        info!(target: "relay", chain = %self.sink.chain, ?last_processed, nonce, "Replaying archive");

        let source = Arc::clone(archive).read_stream(last_processed).await?;
        let mut batches = BatchStream::new(source, self.config.batch_limits);

        let started = Instant::now();
        let mut last_report = started;
        let mut relayed = 0u64;
        let mut status = SyncStatus::UpToDate;

        while let Some(batch) = batches.next().await {
            let batch = batch?;
            relayed += batch.len() as u64;
            status = SyncStatus::BacklogDrained(batch.last_block_number());
            nonce = self.sink.relay(batch, nonce).await?;

            if last_report.elapsed() >= self.config.report_interval {
                last_report = Instant::now();
                let blocks_per_second = relayed as f64 / started.elapsed().as_secs_f64();
                Metrics::set_throughput(&self.sink.chain, blocks_per_second);
                info!(
                    target: "relay",
                    chain = %self.sink.chain,
                    relayed,
                    blocks_per_second = %format_args!("{blocks_per_second:.2}"),
                    "Archive replay progress"
                );
            }
        }

        info!(target: "relay", chain = %self.sink.chain, relayed, ?status, "Archive replay finished");
        Ok(status)
    }

    /// Relays a primary chain forever, gated by the finalized heads fed into `tracker`.
    pub async fn relay_primary<C: SourceChain>(
        &self,
        fetcher: &BlockFetcher<C>,
        tracker: &ChainHeadTracker,
    ) -> Result<(), RelayError> {
        let mut nonce = self.account_nonce().await?;
        let mut next = self.next_block().await?;
        info!(target: "relay", chain = %self.sink.chain, next, nonce, "Starting primary chain relay");

        loop {
            let finalized = tracker.wait_until_past(next).await?;
            if let SyncStatus::BacklogDrained(last) =
                self.catch_up(fetcher, next, finalized, &mut nonce).await?
            {
                next = last + 1;
            }
        }
    }

    /// Relays a parachain forever.
    ///
    /// The finalized number is re-queried on every pass. Once caught up the loop sleeps until
    /// `tracker` is notified or `poll_interval` elapses.
    pub async fn relay_parachain<C: SourceChain>(
        &self,
        fetcher: &BlockFetcher<C>,
        tracker: &ChainHeadTracker,
    ) -> Result<(), RelayError> {
        let mut nonce = self.account_nonce().await?;
        let mut next = self.next_block().await?;
        info!(target: "relay", chain = %self.sink.chain, next, nonce, "Starting parachain relay");

        loop {
            let finalized = fetcher.finalized_number().await?;
            match self.catch_up(fetcher, next, finalized, &mut nonce).await? {
                SyncStatus::BacklogDrained(last) => next = last + 1,
                SyncStatus::UpToDate => {
                    tokio::select! {
                        woken = tracker.wait() => woken?,
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                    }
                }
            }
        }
    }

    /// Relays `[next, finalized]`, assembling the next batch while the previous one is being
    /// submitted.
    async fn catch_up<C: SourceChain>(
        &self,
        fetcher: &BlockFetcher<C>,
        next: BlockNumber,
        finalized: BlockNumber,
        nonce: &mut u64,
    ) -> Result<SyncStatus, RelayError> {
        if next > finalized {
            return Ok(SyncStatus::UpToDate);
        }
        debug!(target: "relay", chain = %self.sink.chain, next, finalized, "Catching up");

        let mut batches = BatchStream::new(fetcher.stream(next..=finalized), self.config.batch_limits);
        let mut in_flight: Option<(BlockNumber, JoinHandle<Result<u64, RelayError>>)> = None;
        let mut confirmed = None;

        let assembled = loop {
            let batch = match batches.next().await {
                None => break Ok(()),
                Some(Err(err)) => break Err(RelayError::from(err)),
                Some(Ok(batch)) => batch,
            };
            if let Some((last, handle)) = in_flight.take() {
                *nonce = handle.await??;
                confirmed = Some(last);
            }
            let sink = self.sink.clone();
            let batch_nonce = *nonce;
            let last = batch.last_block_number();
            in_flight = Some((last, tokio::spawn(async move { sink.relay(batch, batch_nonce).await })));
        };

        if let Some((last, handle)) = in_flight.take() {
            *nonce = handle.await??;
            confirmed = Some(last);
        }
        assembled?;
        Ok(confirmed.map_or(SyncStatus::UpToDate, SyncStatus::BacklogDrained))
    }
}

/// Submits batches and records their confirmation.
#[derive(Debug)]
struct BatchSink<S> {
    chain: String,
    feed_id: u64,
    submitter: Arc<S>,
    state: Arc<PersistentState>,
    retry: RetryPolicy,
}

impl<S> Clone for BatchSink<S> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            feed_id: self.feed_id,
            submitter: Arc::clone(&self.submitter),
            state: Arc::clone(&self.state),
            retry: self.retry,
        }
    }
}

impl<S: BlockSubmitter> BatchSink<S> {
    /// Submits `batch` until it is included, moving the nonce on after every failed attempt,
    /// then saves the checkpoint. Returns the nonce of the next transaction.
    async fn relay(&self, batch: Batch, nonce: u64) -> Result<u64, RelayError> {
        let current = AtomicU64::new(nonce);
        let block_hash = self
            .retry
            .retry_notify(
                "batch submission",
                || async {
                    let nonce = current.load(Ordering::SeqCst);
                    let submitted = self.submit(&batch, nonce).await;
                    if submitted.is_err() {
                        current.store(self.nonce_after_failure(nonce).await, Ordering::SeqCst);
                    }
                    submitted
                },
                |_| Metrics::inc_submission_failures(&self.chain),
            )
            .await?;
        let used = current.load(Ordering::SeqCst);

        let last = batch.last_block_number();
        self.state.save_last_processed(&self.chain, last).await?;
        Metrics::inc_batches(&self.chain);
        Metrics::inc_blocks(&self.chain, batch.len(), last);
        info!(
            target: "relay",
            chain = %self.chain,
            first = batch.first_block_number(),
            last,
            blocks = batch.len(),
            size = batch.size(),
            nonce = used,
            %block_hash,
            "Batch included"
        );
        Ok(used + 1)
    }

    /// The nonce to retry with after a submission at `nonce` failed.
    ///
    /// The failed extrinsic may still sit in the pool, so `nonce + 1` is used unless the
    /// account's next index shows the extrinsic never got there.
    async fn nonce_after_failure(&self, nonce: u64) -> u64 {
        let bumped = nonce + 1;
        match self.submitter.account_nonce().await {
            Ok(next) if next < bumped => {
                debug!(target: "relay", chain = %self.chain, nonce, next, "Failed extrinsic left its nonce unused");
                next
            }
            Ok(_) => bumped,
            Err(err) => {
                warn!(target: "relay", chain = %self.chain, %err, nonce = bumped, "Could not query the account nonce");
                bumped
            }
        }
    }

    async fn submit(&self, batch: &Batch, nonce: u64) -> Result<B256, SubmitError> {
        match batch.items() {
            [item] => self.submitter.send_block_tx(self.feed_id, &self.chain, item, nonce).await,
            items => {
                self.submitter.send_blocks_batch_tx(self.feed_id, &self.chain, items, nonce).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BatchError, fetcher::tests::FakeSource};
    use archivist_protocol::{BatchItem, encode_block};
    use archivist_rpc::RpcError;
    use archivist_storage::StorageError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// A submission seen by [`FakeSubmitter`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Submission {
        feed_id: u64,
        numbers: Vec<BlockNumber>,
        nonce: u64,
    }

    /// Accepts submissions whose nonce matches the account's, except the ones queued to fail.
    ///
    /// `failures` reach the pool and consume their nonce, `unsent` fail before that.
    #[derive(Debug)]
    struct FakeSubmitter {
        nonce: AtomicU64,
        failures: AtomicU64,
        unsent: AtomicU64,
        submissions: Mutex<Vec<Submission>>,
    }

    impl FakeSubmitter {
        fn new(nonce: u64) -> Arc<Self> {
            Arc::new(Self {
                nonce: AtomicU64::new(nonce),
                failures: AtomicU64::new(0),
                unsent: AtomicU64::new(0),
                submissions: Mutex::new(Vec::new()),
            })
        }

        fn submissions(&self) -> Vec<Submission> {
            self.submissions.lock().unwrap().clone()
        }

        fn accept(&self, feed_id: u64, items: &[BatchItem], nonce: u64) -> Result<B256, SubmitError> {
            if self.unsent.load(Ordering::SeqCst) > 0 {
                self.unsent.fetch_sub(1, Ordering::SeqCst);
                return Err(SubmitError::Rpc(RpcError::SubscriptionClosed));
            }
            if nonce > self.nonce.load(Ordering::SeqCst) {
                // Parked in the pool's future queue until it times out.
                return Err(SubmitError::Rpc(RpcError::InclusionTimeout(Duration::from_secs(300))));
            }
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                // The failed attempt still consumed its nonce.
                self.nonce.fetch_max(nonce + 1, Ordering::SeqCst);
                return Err(SubmitError::Rpc(RpcError::SubscriptionClosed));
            }
            assert_eq!(nonce, self.nonce.load(Ordering::SeqCst), "nonce out of sequence");
            self.nonce.store(nonce + 1, Ordering::SeqCst);
            let numbers = items.iter().map(|item| item.number).collect();
            self.submissions.lock().unwrap().push(Submission { feed_id, numbers, nonce });
            Ok(B256::with_last_byte(nonce as u8))
        }
    }

    #[async_trait]
    impl BlockSubmitter for FakeSubmitter {
        async fn account_nonce(&self) -> Result<u64, SubmitError> {
            Ok(self.nonce.load(Ordering::SeqCst))
        }

        async fn send_block_tx(
            &self,
            feed_id: u64,
            _chain: &str,
            item: &BatchItem,
            nonce: u64,
        ) -> Result<B256, SubmitError> {
            self.accept(feed_id, std::slice::from_ref(item), nonce)
        }

        async fn send_blocks_batch_tx(
            &self,
            feed_id: u64,
            _chain: &str,
            items: &[BatchItem],
            nonce: u64,
        ) -> Result<B256, SubmitError> {
            assert!(items.len() > 1, "a single block goes through send_block_tx");
            self.accept(feed_id, items, nonce)
        }
    }

    /// Holds the first submission until `gate` is notified.
    #[derive(Debug)]
    struct GatedSubmitter {
        inner: Arc<FakeSubmitter>,
        gate: tokio::sync::Notify,
        /// Confirmed submissions seen by each call when it started.
        starts: Mutex<Vec<usize>>,
    }

    impl GatedSubmitter {
        async fn accept(&self, feed_id: u64, items: &[BatchItem], nonce: u64) -> Result<B256, SubmitError> {
            let first = {
                let mut starts = self.starts.lock().unwrap();
                starts.push(self.inner.submissions().len());
                starts.len() == 1
            };
            if first {
                self.gate.notified().await;
            }
            self.inner.accept(feed_id, items, nonce)
        }
    }

    #[async_trait]
    impl BlockSubmitter for GatedSubmitter {
        async fn account_nonce(&self) -> Result<u64, SubmitError> {
            self.inner.account_nonce().await
        }

        async fn send_block_tx(
            &self,
            feed_id: u64,
            _chain: &str,
            item: &BatchItem,
            nonce: u64,
        ) -> Result<B256, SubmitError> {
            self.accept(feed_id, std::slice::from_ref(item), nonce).await
        }

        async fn send_blocks_batch_tx(
            &self,
            feed_id: u64,
            _chain: &str,
            items: &[BatchItem],
            nonce: u64,
        ) -> Result<B256, SubmitError> {
            self.accept(feed_id, items, nonce).await
        }
    }

    fn relayer<S: BlockSubmitter + 'static>(
        dir: &TempDir,
        submitter: &Arc<S>,
        count_limit: usize,
    ) -> (Relayer<S>, Arc<PersistentState>) {
        let state = Arc::new(PersistentState::new(dir.path().join("state")));
        let config = RelayerConfig {
            batch_limits: BatchLimits { count_limit, ..Default::default() },
            poll_interval: Duration::from_millis(50),
            ..Default::default()
        };
        let relayer = Relayer::new("Moonbeam", 3, Arc::clone(submitter), Arc::clone(&state), config);
        (relayer, state)
    }

    fn archive(dir: &TempDir, last: BlockNumber) -> Arc<ArchiveStore> {
        let store = ArchiveStore::open(&dir.path().join("archive")).unwrap();
        for number in 0..=last {
            let encoded = encode_block(&crate::fetcher::tests::block(number), None);
            store.put_block(number, B256::ZERO, &encoded).unwrap();
        }
        store.set_last_downloaded(last).unwrap();
        Arc::new(store)
    }

    fn all_numbers(submissions: &[Submission]) -> Vec<BlockNumber> {
        submissions.iter().flat_map(|submission| submission.numbers.clone()).collect()
    }

    #[tokio::test]
    async fn test_archive_replay_resumes_after_checkpoint() {
        let dir = TempDir::new().unwrap();
        let store = archive(&dir, 24);
        let submitter = FakeSubmitter::new(5);
        let (relayer, state) = relayer(&dir, &submitter, 10);
        state.save_last_processed("Moonbeam", 6).await.unwrap();

        let status = relayer.relay_from_archive(&store).await.unwrap();
        assert_eq!(status, SyncStatus::BacklogDrained(24));
        assert_eq!(state.get_last_processed("Moonbeam").await.unwrap(), Some(24));

        let submissions = submitter.submissions();
        assert_eq!(all_numbers(&submissions), (7..=24).collect::<Vec<_>>());
        assert_eq!(submissions.iter().map(|s| s.nonce).collect::<Vec<_>>(), vec![5, 6]);
        assert!(submissions.iter().all(|s| s.feed_id == 3));

        // A second run has nothing left to do.
        assert_eq!(relayer.relay_from_archive(&store).await.unwrap(), SyncStatus::UpToDate);
        assert_eq!(submitter.submissions().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_submission_bumps_nonce() {
        let dir = TempDir::new().unwrap();
        let store = archive(&dir, 4);
        let submitter = FakeSubmitter::new(0);
        submitter.failures.store(2, Ordering::SeqCst);
        let (relayer, state) = relayer(&dir, &submitter, 2);

        relayer.relay_from_archive(&store).await.unwrap();

        let nonces: Vec<_> = submitter.submissions().iter().map(|s| s.nonce).collect();
        assert_eq!(nonces, vec![2, 3, 4]);
        assert_eq!(all_numbers(&submitter.submissions()), vec![0, 1, 2, 3, 4]);
        assert_eq!(state.get_last_processed("Moonbeam").await.unwrap(), Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsent_submission_reuses_nonce() {
        let dir = TempDir::new().unwrap();
        let store = archive(&dir, 3);
        let submitter = FakeSubmitter::new(0);
        submitter.unsent.store(1, Ordering::SeqCst);
        let (relayer, state) = relayer(&dir, &submitter, 2);

        relayer.relay_from_archive(&store).await.unwrap();

        let nonces: Vec<_> = submitter.submissions().iter().map(|s| s.nonce).collect();
        assert_eq!(nonces, vec![0, 1]);
        assert_eq!(all_numbers(&submitter.submissions()), vec![0, 1, 2, 3]);
        assert_eq!(state.get_last_processed("Moonbeam").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_next_batch_is_assembled_while_previous_is_in_flight() {
        let dir = TempDir::new().unwrap();
        let submitter = Arc::new(GatedSubmitter {
            inner: FakeSubmitter::new(0),
            gate: tokio::sync::Notify::new(),
            starts: Mutex::new(Vec::new()),
        });
        let (relayer, state) = relayer(&dir, &submitter, 2);
        let fetcher = Arc::new(
            BlockFetcher::connect(FakeSource::new("Moonbeam", 5), RetryPolicy::default())
                .await
                .unwrap(),
        );

        let catch_up = {
            let fetcher = Arc::clone(&fetcher);
            tokio::spawn(async move {
                let mut nonce = 0;
                let status = relayer.catch_up(fetcher.as_ref(), 0, 5, &mut nonce).await;
                status.map(|status| (status, nonce))
            })
        };

        // The second batch is fetched while the first one is held, and nothing else is sent.
        tokio::time::timeout(Duration::from_secs(10), async {
            while fetcher.client().calls.load(Ordering::SeqCst) < 4 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("second batch not assembled");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fetcher.client().calls.load(Ordering::SeqCst), 4);
        assert_eq!(*submitter.starts.lock().unwrap(), vec![0]);
        assert_eq!(state.get_last_processed("Moonbeam").await.unwrap(), None);

        submitter.gate.notify_one();
        let (status, nonce) = catch_up.await.unwrap().unwrap();
        assert_eq!(status, SyncStatus::BacklogDrained(5));
        assert_eq!(nonce, 3);
        // Every submission started after the previous one was confirmed.
        assert_eq!(*submitter.starts.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(all_numbers(&submitter.inner.submissions()), (0..=5).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_corrupt_archive_block_is_fatal() {
        let dir = TempDir::new().unwrap();
        let store = archive(&dir, 5);
        store.put_block(4, B256::ZERO, &[0xff]).unwrap();
        let submitter = FakeSubmitter::new(0);
        let (relayer, state) = relayer(&dir, &submitter, 2);
        state.save_last_processed("Moonbeam", 1).await.unwrap();

        let err = relayer.relay_from_archive(&store).await.unwrap_err();
        assert!(matches!(
            err,
            RelayError::ArchiveBatch(BatchError::Source(StorageError::Codec { number: 4, .. }))
        ));
        // The full batch before the broken block went through, nothing after it.
        assert_eq!(all_numbers(&submitter.submissions()), vec![2, 3]);
        assert_eq!(state.get_last_processed("Moonbeam").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_primary_relay_is_gated_by_head() {
        let dir = TempDir::new().unwrap();
        let submitter = FakeSubmitter::new(0);
        let (relayer, state) = relayer(&dir, &submitter, 4);
        let fetcher =
            BlockFetcher::connect(FakeSource::new("Moonbeam", 100), RetryPolicy::default())
                .await
                .unwrap();
        let tracker = ChainHeadTracker::primary();

        let relay = {
            let tracker = tracker.clone();
            tokio::spawn(async move { relayer.relay_primary(&fetcher, &tracker).await })
        };

        // Nothing is submitted before the first finalized head.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(submitter.submissions().is_empty());

        tracker.update(5);
        wait_for_checkpoint(&state, 5).await;
        assert_eq!(all_numbers(&submitter.submissions()), vec![0, 1, 2, 3, 4, 5]);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(submitter.submissions().len(), 2);

        tracker.update(9);
        wait_for_checkpoint(&state, 9).await;
        assert_eq!(all_numbers(&submitter.submissions()), (0..=9).collect::<Vec<_>>());
        let nonces: Vec<_> = submitter.submissions().iter().map(|s| s.nonce).collect();
        assert_eq!(nonces, (0..nonces.len() as u64).collect::<Vec<_>>());

        relay.abort();
    }

    #[tokio::test]
    async fn test_parachain_relay_polls_finalized_head() {
        let dir = TempDir::new().unwrap();
        let submitter = FakeSubmitter::new(0);
        let (relayer, state) = relayer(&dir, &submitter, 10);
        state.save_last_processed("Moonbeam", 2).await.unwrap();

        let source = FakeSource::new("Moonbeam", 6);
        let finalized = Arc::clone(&source.finalized);
        let fetcher = BlockFetcher::connect(source, RetryPolicy::default()).await.unwrap();
        let tracker = ChainHeadTracker::parachain();

        let relay = {
            let tracker = tracker.clone();
            tokio::spawn(async move { relayer.relay_parachain(&fetcher, &tracker).await })
        };

        wait_for_checkpoint(&state, 6).await;
        assert_eq!(all_numbers(&submitter.submissions()), vec![3, 4, 5, 6]);

        finalized.store(8, Ordering::SeqCst);
        tracker.notify();
        wait_for_checkpoint(&state, 8).await;
        assert_eq!(all_numbers(&submitter.submissions()), (3..=8).collect::<Vec<_>>());

        relay.abort();
    }

    async fn wait_for_checkpoint(state: &PersistentState, number: BlockNumber) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while state.get_last_processed("Moonbeam").await.unwrap() != Some(number) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("checkpoint not reached");
    }
}
