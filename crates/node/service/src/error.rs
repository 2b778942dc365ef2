use crate::{BatchError, ConfigError, TrackerError};
use alloy_primitives::B256;
use archivist_rpc::{RpcError, TransactionStatus};
use archivist_signer::SignerError;
use archivist_storage::StorageError;
use thiserror::Error;

/// Errors submitting an extrinsic to the target chain.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The target chain could not be reached.
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// The extrinsic could not be signed.
    #[error(transparent)]
    Signer(#[from] SignerError),
    /// The local feed cache could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The transaction pool gave up on the extrinsic.
    #[error("extrinsic rejected by the pool: {0:?}")]
    Rejected(TransactionStatus),
    /// The extrinsic was included but its dispatch failed.
    #[error("extrinsic #{index} in block {block_hash} failed")]
    ExtrinsicFailed {
        /// The including block.
        block_hash: B256,
        /// The extrinsic's index in that block.
        index: u32,
    },
    /// A storage value of the target chain has an unexpected shape.
    #[error("unexpected value in {0} storage")]
    InvalidStorage(&'static str),
}

/// Errors ending a relay loop.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The archive or the checkpoint store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A source chain request failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// A submission failed.
    #[error(transparent)]
    Submit(#[from] SubmitError),
    /// An archived block could not be batched.
    #[error(transparent)]
    ArchiveBatch(#[from] BatchError<StorageError>),
    /// A fetched block could not be batched.
    #[error(transparent)]
    LiveBatch(#[from] BatchError<RpcError>),
    /// The chain head tracker failed.
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    /// A submission task panicked or was cancelled.
    #[error("submission task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Errors ending the relay service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A signing pool could not be started.
    #[error(transparent)]
    Signer(#[from] SignerError),
    /// A relay loop failed.
    #[error(transparent)]
    Relay(#[from] RelayError),
    /// Archive replay was requested but no archive is configured.
    #[error("no downloaded archive path is configured for the primary chain")]
    NoArchivePath,
    /// A service task panicked or was cancelled.
    #[error("service task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<RpcError> for ServiceError {
    fn from(err: RpcError) -> Self {
        Self::Relay(err.into())
    }
}

impl From<SubmitError> for ServiceError {
    fn from(err: SubmitError) -> Self {
        Self::Relay(err.into())
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        Self::Relay(err.into())
    }
}
