//! JSON shapes of blocks as served by a Substrate node over `chain_getBlock`.

use alloy_primitives::{B256, Bytes};
use serde::{Deserialize, Serialize};

/// A source chain block number.
pub type BlockNumber = u64;

/// A four byte consensus engine identifier.
pub type EngineId = [u8; 4];

/// The engine identifier of GRANDPA finality justifications.
pub const GRANDPA_ENGINE_ID: EngineId = *b"FRNK";

/// A block header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Hash of the parent block.
    pub parent_hash: B256,
    /// The block number, served as a hex quantity.
    #[serde(with = "alloy_serde::quantity")]
    pub number: BlockNumber,
    /// The state trie root after this block.
    pub state_root: B256,
    /// The extrinsics trie root of this block.
    pub extrinsics_root: B256,
    /// The header digest.
    pub digest: Digest,
}

/// The header digest. Every log is an already SCALE-encoded digest item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    /// The encoded digest items.
    pub logs: Vec<Bytes>,
}

/// A block body together with its header. Every extrinsic is already SCALE-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// The block header.
    pub header: Header,
    /// The encoded extrinsics.
    pub extrinsics: Vec<Bytes>,
}

/// A consensus justification: the engine that produced it and its opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Justification(pub EngineId, pub Bytes);

/// A block with the justifications the node has for it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlock {
    /// The block.
    pub block: Block,
    /// Justifications attached to the block.
    #[serde(default)]
    pub justifications: Option<Vec<Justification>>,
}

impl SignedBlock {
    /// Returns the GRANDPA justification payload embedded in this block, if there is one.
    pub fn grandpa_justification(&self) -> Option<&Bytes> {
        self.justifications
            .as_deref()?
            .iter()
            .find(|Justification(engine, _)| *engine == GRANDPA_ENGINE_ID)
            .map(|Justification(_, payload)| payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;

    const BLOCK_JSON: &str = r#"{
        "block": {
            "header": {
                "parentHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
                "number": "0x1a",
                "stateRoot": "0x2222222222222222222222222222222222222222222222222222222222222222",
                "extrinsicsRoot": "0x3333333333333333333333333333333333333333333333333333333333333333",
                "digest": { "logs": ["0x0008aabb"] }
            },
            "extrinsics": ["0x0c010203"]
        },
        "justifications": [[[66, 69, 69, 70], "0x01"], [[70, 82, 78, 75], "0xdeadbeef"]]
    }"#;

    #[test]
    fn test_deserialize_signed_block() {
        let signed: SignedBlock = serde_json::from_str(BLOCK_JSON).unwrap();
        let header = &signed.block.header;

        assert_eq!(header.number, 26);
        assert_eq!(
            header.parent_hash,
            b256!("0x1111111111111111111111111111111111111111111111111111111111111111")
        );
        assert_eq!(header.digest.logs, vec![Bytes::from_static(&[0x00, 0x08, 0xaa, 0xbb])]);
        assert_eq!(signed.block.extrinsics.len(), 1);
        assert_eq!(
            signed.grandpa_justification(),
            Some(&Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]))
        );
    }

    #[test]
    fn test_missing_justifications() {
        let json = BLOCK_JSON.replace(
            r#""justifications": [[[66, 69, 69, 70], "0x01"], [[70, 82, 78, 75], "0xdeadbeef"]]"#,
            r#""justifications": null"#,
        );
        let signed: SignedBlock = serde_json::from_str(&json).unwrap();
        assert!(signed.justifications.is_none());
        assert!(signed.grandpa_justification().is_none());
    }

    #[test]
    fn test_non_grandpa_justification_is_ignored() {
        let json = BLOCK_JSON.replace(r#", [[70, 82, 78, 75], "0xdeadbeef"]"#, "");
        let signed: SignedBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(signed.justifications.as_ref().map(Vec::len), Some(1));
        assert!(signed.grandpa_justification().is_none());
    }
}
