#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod block;
pub use block::{
    Block, BlockNumber, Digest, EngineId, GRANDPA_ENGINE_ID, Header, Justification, SignedBlock,
};

mod codec;
pub use codec::{CodecError, DigestItem, ScaleHeader, blake2_256, encode_block, header_hash};

mod archived;
pub use archived::{ArchivedBlock, BlockMetadata};

mod batch;
pub use batch::{Batch, BatchItem};

/// Any single payload (encoded block plus metadata) at or above this many bytes can never be
/// relayed and is treated as fatal.
pub const MAX_PAYLOAD_SIZE: usize = 5_000_000;
