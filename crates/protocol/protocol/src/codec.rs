//! Deterministic binary encoding of relayed blocks.
//!
//! The encoding is the SCALE encoding of a Substrate `SignedBlock` restricted to a single
//! GRANDPA justification:
//!
//! ```text
//! parentHash(32B) || compact(number) || stateRoot(32B) || extrinsicsRoot(32B)
//! || compact(N_digest) || digestLog_1..N || compact(N_extrinsics) || extrinsic_1..N
//! || presenceByte
//! || [ compact(1) || "FRNK" || compact(len(justification)) || justification ]
//! ```

use crate::{Block, BlockNumber, GRANDPA_ENGINE_ID};
use alloy_primitives::B256;
use blake2::{Blake2b, Digest as _, digest::consts::U32};
use parity_scale_codec::{Compact, Decode, Encode};
use thiserror::Error;

/// Errors raised while encoding or decoding block data.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The bytes are not a valid SCALE encoding.
    #[error("invalid SCALE encoding: {0}")]
    Scale(#[from] parity_scale_codec::Error),
    /// Block metadata could not be serialized.
    #[error("invalid block metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// A header digest item, as far as is needed to find where an encoded header ends.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum DigestItem {
    /// Arbitrary data.
    #[codec(index = 0)]
    Other(Vec<u8>),
    /// A message from the runtime to the consensus engine.
    #[codec(index = 4)]
    Consensus([u8; 4], Vec<u8>),
    /// A seal produced by the block author.
    #[codec(index = 5)]
    Seal([u8; 4], Vec<u8>),
    /// A pre-runtime digest inserted by the block author.
    #[codec(index = 6)]
    PreRuntime([u8; 4], Vec<u8>),
    /// The runtime environment changed in this block.
    #[codec(index = 8)]
    RuntimeEnvironmentUpdated,
}

/// The SCALE form of a block header.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ScaleHeader {
    /// Hash of the parent block.
    pub parent_hash: [u8; 32],
    /// The block number.
    #[codec(compact)]
    pub number: BlockNumber,
    /// The state trie root.
    pub state_root: [u8; 32],
    /// The extrinsics trie root.
    pub extrinsics_root: [u8; 32],
    /// The digest items.
    pub digest: Vec<DigestItem>,
}

/// Computes the 32 byte blake2b digest of `data`.
pub fn blake2_256(data: &[u8]) -> B256 {
    B256::from_slice(Blake2b::<U32>::digest(data).as_slice())
}

/// Encodes a block and an optional GRANDPA justification payload.
///
/// Digest logs and extrinsics are embedded verbatim; they are already SCALE-encoded by the
/// source node.
pub fn encode_block(block: &Block, justification: Option<&[u8]>) -> Vec<u8> {
    let header = &block.header;
    let body_len: usize = header.digest.logs.iter().map(|log| log.len()).sum::<usize>() +
        block.extrinsics.iter().map(|xt| xt.len()).sum::<usize>();
    let mut out = Vec::with_capacity(128 + body_len + justification.map_or(0, <[u8]>::len));

    out.extend_from_slice(header.parent_hash.as_slice());
    Compact(header.number).encode_to(&mut out);
    out.extend_from_slice(header.state_root.as_slice());
    out.extend_from_slice(header.extrinsics_root.as_slice());

    Compact(header.digest.logs.len() as u64).encode_to(&mut out);
    for log in &header.digest.logs {
        out.extend_from_slice(log);
    }

    Compact(block.extrinsics.len() as u64).encode_to(&mut out);
    for xt in &block.extrinsics {
        out.extend_from_slice(xt);
    }

    match justification {
        None => out.push(0),
        Some(payload) => {
            out.push(1);
            Compact(1u64).encode_to(&mut out);
            out.extend_from_slice(&GRANDPA_ENGINE_ID);
            Compact(payload.len() as u64).encode_to(&mut out);
            out.extend_from_slice(payload);
        }
    }

    out
}

/// Decodes the header at the front of an encoded block and returns the block hash, which is
/// the blake2b-256 digest of exactly the header bytes.
pub fn header_hash(encoded: &[u8]) -> Result<(B256, ScaleHeader), CodecError> {
    let mut input = encoded;
    let header = ScaleHeader::decode(&mut input)?;
    let (header_bytes, _) = encoded.split_at(encoded.len() - input.len());
    Ok((blake2_256(header_bytes), header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Digest, Header};
    use alloy_primitives::{Bytes, hex};
    use rstest::rstest;

    fn sample_block(number: BlockNumber) -> Block {
        Block {
            header: Header {
                parent_hash: B256::repeat_byte(0x11),
                number,
                state_root: B256::repeat_byte(0x22),
                extrinsics_root: B256::repeat_byte(0x33),
                digest: Digest { logs: vec![Bytes::from_static(&hex!("0008aabb"))] },
            },
            extrinsics: vec![Bytes::from_static(&hex!("0c010203"))],
        }
    }

    #[test]
    fn test_encode_block_without_justification() {
        let encoded = encode_block(&sample_block(26), None);

        let expected = hex!(
            "11111111111111111111111111111111111111111111111111111111111111116822222222222222222222222222222222222222222222222222222222222222223333333333333333333333333333333333333333333333333333333333333333040008aabb040c01020300"
        );
        assert_eq!(encoded, expected.to_vec());
    }

    #[test]
    fn test_encode_block_is_deterministic() {
        let block = sample_block(26);
        assert_eq!(encode_block(&block, None), encode_block(&block, None));
        assert_eq!(encode_block(&block, Some(&[1, 2])), encode_block(&block, Some(&[1, 2])));
    }

    #[test]
    fn test_encode_block_with_justification() {
        let mut block = sample_block(65_536);
        block.header.digest.logs.clear();
        block.extrinsics.clear();

        let encoded = encode_block(&block, Some(&[0xde, 0xad]));

        let expected = hex!(
            "111111111111111111111111111111111111111111111111111111111111111102000400222222222222222222222222222222222222222222222222222222222222222233333333333333333333333333333333333333333333333333333333333333330000010446524e4b08dead"
        );
        assert_eq!(encoded, expected.to_vec());
    }

    #[rstest]
    #[case::single_byte(63, "fc")]
    #[case::two_bytes(64, "0101")]
    #[case::four_bytes(16_384, "02000100")]
    #[case::big_integer(1 << 30, "0300000040")]
    fn test_number_uses_compact_encoding(#[case] number: BlockNumber, #[case] compact: &str) {
        let encoded = encode_block(&sample_block(number), None);
        let compact = hex::decode(compact).unwrap();
        assert_eq!(&encoded[32..32 + compact.len()], compact.as_slice());
    }

    #[test]
    fn test_header_hash_covers_exactly_the_header() {
        let encoded = encode_block(&sample_block(26), Some(&[7; 40]));
        let (hash, header) = header_hash(&encoded).unwrap();

        // parent + compact(26) + roots + compact(1) + one `Other` digest item.
        let header_len = 32 + 1 + 32 + 32 + 1 + 4;
        assert_eq!(hash, blake2_256(&encoded[..header_len]));
        assert_eq!(header.number, 26);
        assert_eq!(header.digest, vec![DigestItem::Other(vec![0xaa, 0xbb])]);
        assert_eq!(header.encode(), encoded[..header_len].to_vec());
    }

    #[test]
    fn test_header_hash_rejects_truncated_input() {
        let encoded = encode_block(&sample_block(26), None);
        assert!(matches!(header_hash(&encoded[..40]), Err(CodecError::Scale(_))));
    }

    #[test]
    fn test_blake2_256_vector() {
        assert_eq!(
            blake2_256(b"abc"),
            B256::from(hex!("bddd813c634239723171ef3fee98579b94964e3bb1cb3e427262c8c068d52319"))
        );
    }
}
