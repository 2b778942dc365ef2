//! Groups a stream of blocks into [`Batch`]es bounded by payload size and block count.

use crate::ConfigError;
use archivist_protocol::{ArchivedBlock, Batch, BatchItem, BlockNumber, CodecError, MAX_PAYLOAD_SIZE};
use futures::{Stream, StreamExt, ready};
use std::{
    mem,
    pin::Pin,
    task::{Context, Poll},
};
use thiserror::Error;

/// Default cumulative payload size at which a batch is closed.
pub const DEFAULT_BYTE_LIMIT: usize = 3_500_000;

/// Default number of blocks at which a batch is closed.
pub const DEFAULT_COUNT_LIMIT: usize = 10;

/// Limits on the batches produced by a [`BatchStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// A batch is closed before an item that would take its payload size to this value.
    pub byte_limit: usize,
    /// A batch is closed once it holds this many blocks.
    pub count_limit: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self { byte_limit: DEFAULT_BYTE_LIMIT, count_limit: DEFAULT_COUNT_LIMIT }
    }
}

impl BatchLimits {
    /// Creates checked limits.
    pub fn new(byte_limit: usize, count_limit: usize) -> Result<Self, ConfigError> {
        let limits = Self { byte_limit, count_limit };
        limits.validate()?;
        Ok(limits)
    }

    /// Checks that every batch can hold at least one block.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.count_limit == 0 {
            return Err(ConfigError::BatchLimits("count limit must be at least 1"));
        }
        if self.byte_limit == 0 {
            return Err(ConfigError::BatchLimits("byte limit must be at least 1"));
        }
        Ok(())
    }
}

/// Errors yielded by a [`BatchStream`]. All of them end the stream.
#[derive(Debug, Error)]
pub enum BatchError<E> {
    /// A single block is too large to ever be submitted.
    #[error("block #{number} payload of {size} bytes exceeds the {max} byte limit", max = MAX_PAYLOAD_SIZE)]
    PayloadTooLarge {
        /// The block number.
        number: BlockNumber,
        /// The block and metadata size.
        size: usize,
    },
    /// The block metadata could not be serialized.
    #[error("block #{number}: {source}")]
    Codec {
        /// The block number.
        number: BlockNumber,
        /// The serialization error.
        #[source]
        source: CodecError,
    },
    /// The block source failed.
    #[error(transparent)]
    Source(E),
}

/// A lazy stream of batches over a stream of blocks.
///
/// For every block of size `s` (encoded block plus serialized metadata):
///
/// 1. `s >= MAX_PAYLOAD_SIZE` is an error.
/// 2. If the pending batch is not empty and `pending_size + s >= byte_limit`, the pending batch
///    is yielded first.
/// 3. The block is appended.
/// 4. The pending batch is yielded once it holds `count_limit` blocks.
///
/// When the source ends, a non-empty pending batch is yielded. The source is only polled when
/// the stream is.
#[derive(Debug)]
pub struct BatchStream<S> {
    source: S,
    limits: BatchLimits,
    pending: Vec<BatchItem>,
    pending_size: usize,
    done: bool,
}

impl<S> BatchStream<S> {
    /// Creates a batch stream over `source`.
    pub const fn new(source: S, limits: BatchLimits) -> Self {
        Self { source, limits, pending: Vec::new(), pending_size: 0, done: false }
    }

    fn take(&mut self) -> Option<Batch> {
        self.pending_size = 0;
        Batch::from_items(mem::take(&mut self.pending))
    }

    fn fail<E>(&mut self, err: BatchError<E>) -> Poll<Option<Result<Batch, BatchError<E>>>> {
        self.done = true;
        Poll::Ready(Some(Err(err)))
    }
}

impl<S, E> Stream for BatchStream<S>
where
    S: Stream<Item = Result<ArchivedBlock, E>> + Unpin,
{
    type Item = Result<Batch, BatchError<E>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        loop {
            // A block appended right after a size-triggered flush may already fill a batch.
            if this.pending.len() >= this.limits.count_limit {
                return Poll::Ready(this.take().map(Ok));
            }

            let block = match ready!(this.source.poll_next_unpin(cx)) {
                Some(Ok(block)) => block,
                Some(Err(err)) => return this.fail(BatchError::Source(err)),
                None => {
                    this.done = true;
                    return Poll::Ready(this.take().map(Ok));
                }
            };

            let number = block.number();
            let item = match block.into_batch_item() {
                Ok(item) => item,
                Err(source) => return this.fail(BatchError::Codec { number, source }),
            };
            let size = item.size();
            if size >= MAX_PAYLOAD_SIZE {
                return this.fail(BatchError::PayloadTooLarge { number, size });
            }

            let flushed = if !this.pending.is_empty() &&
                this.pending_size + size >= this.limits.byte_limit
            {
                this.take()
            } else {
                None
            };

            this.pending.push(item);
            this.pending_size += size;

            if flushed.is_some() {
                return Poll::Ready(flushed.map(Ok));
            }
            if this.pending.len() >= this.limits.count_limit {
                return Poll::Ready(this.take().map(Ok));
            }
        }
    }
}
