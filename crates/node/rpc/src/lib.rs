#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod api;
pub use api::{
    AuthorApiClient, ChainApiClient, ChainHeadsApiClient, GrandpaApiClient, StateApiClient,
    SystemApiClient,
};

mod error;
pub use error::RpcError;

mod types;
pub use types::{RuntimeVersion, TransactionStatus};

pub mod extrinsic;
pub use extrinsic::{Call, ChainContext, PalletIndices, StorageKeys};

mod source;
pub use source::{
    DEFAULT_REQUEST_TIMEOUT, FinalizedHeads, MAX_MESSAGE_SIZE, SourceChain, SourceClient,
    justification_from_proof,
};

mod target;
pub use target::{DEFAULT_INCLUSION_TIMEOUT, TargetChain, TargetClient, watch_until_final};
