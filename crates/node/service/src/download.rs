//! Downloads finalized blocks into a local [`ArchiveStore`] for a later replay.

use crate::{BlockFetcher, RelayError, SyncStatus};
use archivist_protocol::BlockNumber;
use archivist_rpc::SourceChain;
use archivist_storage::{ArchiveStore, StorageError};
use futures::StreamExt;
use std::sync::Arc;
use tracing::info;

/// Blocks written between two advances of the archive's high-water mark.
pub const CHECKPOINT_EVERY: u64 = 1_000;

/// Downloads every block after the archive's high-water mark up to `until`, or up to the
/// chain's finalized head when `until` is `None`.
pub async fn download_archive<C: SourceChain>(
    fetcher: &BlockFetcher<C>,
    archive: &Arc<ArchiveStore>,
    until: Option<BlockNumber>,
) -> Result<SyncStatus, RelayError> {
    let next = blocking(archive, |archive| archive.last_downloaded()).await?.map_or(0, |last| last + 1);
    let finalized = fetcher.finalized_number().await?;
    let end = until.map_or(finalized, |until| until.min(finalized));
    if next > end {
        info!(target: "archive", chain = fetcher.chain(), next, end, "Archive is up to date");
        return Ok(SyncStatus::UpToDate);
    }
    info!(target: "archive", chain = fetcher.chain(), next, end, "Downloading blocks");

    let mut blocks = fetcher.stream(next..=end);
    let mut written = 0u64;
    while let Some(block) = blocks.next().await {
        let block = block?;
        let number = block.number();
        let hash = block.metadata.hash;
        blocking(archive, move |archive| archive.put_block(number, hash, &block.bytes)).await?;
        written += 1;

        if written % CHECKPOINT_EVERY == 0 {
            blocking(archive, move |archive| archive.set_last_downloaded(number)).await?;
            info!(target: "archive", chain = fetcher.chain(), block_number = number, written, "Download progress");
        }
    }

    blocking(archive, move |archive| archive.set_last_downloaded(end)).await?;
    info!(target: "archive", chain = fetcher.chain(), last = end, written, "Download finished");
    Ok(SyncStatus::BacklogDrained(end))
}

/// Runs a database call on the blocking thread pool.
async fn blocking<T, F>(archive: &Arc<ArchiveStore>, call: F) -> Result<T, StorageError>
where
    T: Send + 'static,
    F: FnOnce(&ArchiveStore) -> Result<T, StorageError> + Send + 'static,
{
    let archive = Arc::clone(archive);
    tokio::task::spawn_blocking(move || call(&archive)).await?
}
