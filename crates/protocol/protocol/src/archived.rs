//! Contains the [`ArchivedBlock`] produced by the archive reader and the live fetcher.

use crate::{BatchItem, BlockNumber, CodecError};
use alloy_primitives::{B256, Bytes};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Identifies a relayed block. Stored next to the block on the target chain.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display("#{number} ({hash})")]
pub struct BlockMetadata {
    /// The block number.
    pub number: BlockNumber,
    /// The block hash.
    pub hash: B256,
}

impl BlockMetadata {
    /// Serializes the metadata the way it is submitted: `{"number":..,"hash":"0x.."}`.
    pub fn to_bytes(&self) -> Result<Bytes, CodecError> {
        Ok(serde_json::to_vec(self)?.into())
    }
}

/// An encoded block ready to be batched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedBlock {
    /// The encoded block, see [`crate::encode_block`].
    pub bytes: Bytes,
    /// The block identity.
    pub metadata: BlockMetadata,
}

impl ArchivedBlock {
    /// Creates a new [`ArchivedBlock`].
    pub const fn new(bytes: Bytes, metadata: BlockMetadata) -> Self {
        Self { bytes, metadata }
    }

    /// Returns the block number.
    pub const fn number(&self) -> BlockNumber {
        self.metadata.number
    }

    /// Converts the block into the pair of payloads submitted to the target chain.
    pub fn into_batch_item(self) -> Result<BatchItem, CodecError> {
        let metadata = self.metadata.to_bytes()?;
        Ok(BatchItem { number: self.metadata.number, block: self.bytes, metadata })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_json_layout() {
        let metadata = BlockMetadata { number: 7, hash: B256::repeat_byte(0xab) };
        let bytes = metadata.to_bytes().unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            r#"{"number":7,"hash":"0xabababababababababababababababababababababababababababababababab"}"#
        );
    }

    #[test]
    fn test_into_batch_item() {
        let block = ArchivedBlock::new(
            Bytes::from_static(&[1, 2, 3]),
            BlockMetadata { number: 3, hash: B256::ZERO },
        );
        let item = block.into_batch_item().unwrap();
        assert_eq!(item.number, 3);
        assert_eq!(item.block, Bytes::from_static(&[1, 2, 3]));
        assert_eq!(item.size(), 3 + item.metadata.len());
    }

    #[test]
    fn test_metadata_display() {
        let metadata = BlockMetadata { number: 12, hash: B256::ZERO };
        assert!(metadata.to_string().starts_with("#12 (0x0000"));
    }
}
