use thiserror::Error;

/// Errors produced by the signing pool and address helpers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// A pool needs at least one worker.
    #[error("signing pool needs at least one worker")]
    NoWorkers,

    /// A worker thread could not be spawned.
    #[error("failed to spawn signing worker: {0}")]
    Spawn(String),

    /// The worker for a request has stopped.
    #[error("signing worker {0} has stopped")]
    WorkerStopped(usize),

    /// The response for a request was never delivered.
    #[error("signing request {0} was dropped")]
    RequestDropped(u64),

    /// The seed is not a 0x-prefixed 32-byte hex string.
    #[error("invalid account seed: {0}")]
    InvalidSeed(&'static str),

    /// The string is not a valid SS58 address.
    #[error("invalid ss58 address: {0}")]
    InvalidAddress(&'static str),
}
