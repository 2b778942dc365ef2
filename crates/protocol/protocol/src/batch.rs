//! Contains the [`Batch`] type submitted to the target chain in one transaction.

use crate::BlockNumber;
use alloy_primitives::Bytes;

/// A single block payload inside a [`Batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    /// The block number, kept for checkpointing.
    pub number: BlockNumber,
    /// The encoded block.
    pub block: Bytes,
    /// The serialized block metadata.
    pub metadata: Bytes,
}

impl BatchItem {
    /// The number of payload bytes this item contributes to a transaction.
    pub fn size(&self) -> usize {
        self.block.len() + self.metadata.len()
    }
}

/// An ordered, non-empty group of blocks submitted atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    items: Vec<BatchItem>,
}

impl Batch {
    /// Creates a batch from its items, or `None` if there are none.
    pub fn from_items(items: Vec<BatchItem>) -> Option<Self> {
        (!items.is_empty()).then_some(Self { items })
    }

    /// Returns the items in submission order.
    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    /// Consumes the batch, returning its items.
    pub fn into_items(self) -> Vec<BatchItem> {
        self.items
    }

    /// The number of blocks in the batch.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always `false`; batches are never empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The number of the first block in the batch.
    pub fn first_block_number(&self) -> BlockNumber {
        self.items.first().map_or(0, |item| item.number)
    }

    /// The number of the last block in the batch. This is the checkpoint written once the batch
    /// is included.
    pub fn last_block_number(&self) -> BlockNumber {
        self.items.last().map_or(0, |item| item.number)
    }

    /// Total payload bytes of the batch.
    pub fn size(&self) -> usize {
        self.items.iter().map(BatchItem::size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(number: BlockNumber) -> BatchItem {
        BatchItem {
            number,
            block: Bytes::from(vec![0u8; 10]),
            metadata: Bytes::from(vec![1u8; 5]),
        }
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        assert!(Batch::from_items(vec![]).is_none());
    }

    #[test]
    fn test_batch_bounds() {
        let batch = Batch::from_items(vec![item(4), item(5), item(6)]).unwrap();
        assert_eq!(batch.len(), 3);
        assert!(!batch.is_empty());
        assert_eq!(batch.first_block_number(), 4);
        assert_eq!(batch.last_block_number(), 6);
        assert_eq!(batch.size(), 45);
    }
}
