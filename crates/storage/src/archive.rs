//! RocksDB-backed archive of encoded blocks.

use crate::StorageError;
use alloy_primitives::{B256, Bytes};
use archivist_protocol::{ArchivedBlock, BlockMetadata, BlockNumber, header_hash};
use futures::{StreamExt, stream::BoxStream};
use rocksdb::{DB, Options};
use std::{path::Path, sync::Arc};
use tracing::{debug, info};

/// An async stream of archived blocks. See [`ArchiveStore::read_stream`].
pub type ArchiveStream = BoxStream<'static, Result<ArchivedBlock, StorageError>>;

/// The key holding the highest contiguously downloaded block number.
pub const LAST_DOWNLOADED_KEY: &[u8] = b"last_downloaded_block";

/// An ordered archive of encoded blocks.
///
/// Blocks are keyed by their number as 8 little-endian bytes. Values are laid out as
/// `[hash length][hash][encoded block]`. The [`LAST_DOWNLOADED_KEY`] marker holds the highest
/// block number below which the archive has no gaps.
#[derive(Debug)]
pub struct ArchiveStore {
    db: DB,
}

impl ArchiveStore {
    /// Creates or opens an archive at the given path.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        info!(target: "archive", path = %path.display(), "Opened block archive");
        Ok(Self { db })
    }

    /// Opens an existing archive without write access.
    pub fn open_read_only(path: &Path) -> Result<Self, StorageError> {
        let db = DB::open_for_read_only(&Options::default(), path, false)?;
        info!(target: "archive", path = %path.display(), "Opened block archive read-only");
        Ok(Self { db })
    }

    /// Returns the highest contiguously downloaded block number, if any block was stored.
    pub fn last_downloaded(&self) -> Result<Option<BlockNumber>, StorageError> {
        Ok(self.db.get(LAST_DOWNLOADED_KEY)?.as_deref().and_then(decode_number))
    }

    /// Advances the high-water mark to `number`.
    ///
    /// Every block between the current mark and `number` must already be stored; the mark is
    /// never advertised past a gap. Lower values are ignored.
    pub fn set_last_downloaded(&self, number: BlockNumber) -> Result<(), StorageError> {
        let current = self.last_downloaded()?;
        if current.is_some_and(|current| current >= number) {
            return Ok(());
        }

        let first_unchecked = current.map_or(0, |current| current + 1);
        for candidate in first_unchecked..=number {
            if self.db.get_pinned(block_key(candidate))?.is_none() {
                return Err(StorageError::Gap { target: number, missing: candidate });
            }
        }

        self.db.put(LAST_DOWNLOADED_KEY, block_key(number))?;
        debug!(target: "archive", block_number = number, "Advanced archive high-water mark");
        Ok(())
    }

    /// Stores an encoded block.
    pub fn put_block(
        &self,
        number: BlockNumber,
        hash: B256,
        encoded: &[u8],
    ) -> Result<(), StorageError> {
        let mut value = Vec::with_capacity(1 + B256::len_bytes() + encoded.len());
        value.push(B256::len_bytes() as u8);
        value.extend_from_slice(hash.as_slice());
        value.extend_from_slice(encoded);
        self.db.put(block_key(number), value)?;
        Ok(())
    }

    /// Reads the encoded block stored under `number`.
    pub fn get_block(&self, number: BlockNumber) -> Result<Option<Bytes>, StorageError> {
        let Some(value) = self.db.get(block_key(number))? else {
            return Ok(None);
        };
        let (&hash_len, rest) =
            value.split_first().ok_or(StorageError::TruncatedRecord(number))?;
        let encoded = rest.get(hash_len as usize..).ok_or(StorageError::TruncatedRecord(number))?;
        Ok(Some(Bytes::copy_from_slice(encoded)))
    }

    /// Returns a lazy iterator over every archived block after `last_processed`, up to the
    /// high-water mark as it is at the time of this call.
    ///
    /// `None` starts at block zero. The iterator stops after the first error.
    pub fn stream_from(
        &self,
        last_processed: Option<BlockNumber>,
    ) -> Result<ArchiveIter<'_>, StorageError> {
        let next = last_processed.map_or(0, |number| number + 1);
        let end = self.last_downloaded()?;
        debug!(target: "archive", next, ?end, "Streaming archived blocks");
        Ok(ArchiveIter { store: self, next, end, done: false })
    }

    /// Async counterpart of [`Self::stream_from`]. Every database read runs on the blocking
    /// thread pool, so the stream can be polled from async code.
    pub async fn read_stream(
        self: Arc<Self>,
        last_processed: Option<BlockNumber>,
    ) -> Result<ArchiveStream, StorageError> {
        let next = last_processed.map_or(0, |number| number + 1);
        let store = Arc::clone(&self);
        let end = tokio::task::spawn_blocking(move || store.last_downloaded()).await??;
        debug!(target: "archive", next, ?end, "Streaming archived blocks");

        let blocks = futures::stream::unfold((self, next, false), move |(store, number, done)| async move {
            if done || end.is_none_or(|end| number > end) {
                return None;
            }
            let reader = Arc::clone(&store);
            let block = match tokio::task::spawn_blocking(move || reader.read_block(number)).await {
                Ok(block) => block,
                Err(err) => Err(err.into()),
            };
            let failed = block.is_err();
            Some((block, (store, number + 1, failed)))
        });
        Ok(blocks.boxed())
    }

    /// Reads the block stored under `number`, recomputing its hash from the header.
    fn read_block(&self, number: BlockNumber) -> Result<ArchivedBlock, StorageError> {
        let encoded = self.get_block(number)?.ok_or(StorageError::MissingBlock(number))?;
        let (hash, _) =
            header_hash(&encoded).map_err(|source| StorageError::Codec { number, source })?;
        Ok(ArchivedBlock::new(encoded, BlockMetadata { number, hash }))
    }

    /// Re-reads every archived block after `last_processed` and recomputes its hash.
    ///
    /// Returns the number of blocks verified, or the first error.
    pub fn verify(&self, last_processed: Option<BlockNumber>) -> Result<u64, StorageError> {
        let mut verified = 0;
        for block in self.stream_from(last_processed)? {
            let block = block?;
            verified += 1;
            if verified % 10_000 == 0 {
                info!(target: "archive", block_number = block.number(), verified, "Verifying archive");
            }
        }
        Ok(verified)
    }
}

/// Lazy, finite iterator over archived blocks. See [`ArchiveStore::stream_from`].
#[derive(Debug)]
pub struct ArchiveIter<'a> {
    store: &'a ArchiveStore,
    next: BlockNumber,
    end: Option<BlockNumber>,
    done: bool,
}

impl Iterator for ArchiveIter<'_> {
    type Item = Result<ArchivedBlock, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.end.is_none_or(|end| self.next > end) {
            return None;
        }

        let number = self.next;
        self.next += 1;
        let block = self.store.read_block(number);
        self.done = block.is_err();
        Some(block)
    }
}

fn block_key(number: BlockNumber) -> [u8; 8] {
    number.to_le_bytes()
}

fn decode_number(bytes: &[u8]) -> Option<BlockNumber> {
    bytes.try_into().ok().map(BlockNumber::from_le_bytes)
}
