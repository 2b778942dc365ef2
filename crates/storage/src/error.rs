use archivist_protocol::{BlockNumber, CodecError};
use thiserror::Error;

/// Errors that may occur while reading or writing archivist storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The archive database failed.
    #[error("database error: {0}")]
    Database(#[from] rocksdb::Error),

    /// A state document could not be read or written.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A state document could not be serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An archived block could not be decoded.
    #[error("block #{number} is not decodable: {source}")]
    Codec {
        /// The block number.
        number: BlockNumber,
        /// The decoding error.
        #[source]
        source: CodecError,
    },

    /// A block inside the advertised archive range is absent.
    #[error("block #{0} is missing from the archive")]
    MissingBlock(BlockNumber),

    /// An archive record is shorter than its own length prefix says.
    #[error("archive record for block #{0} is truncated")]
    TruncatedRecord(BlockNumber),

    /// The high-water mark was about to be advanced past a missing block.
    #[error("cannot mark #{target} as downloaded, block #{missing} is missing")]
    Gap {
        /// The requested high-water mark.
        target: BlockNumber,
        /// The first missing block below it.
        missing: BlockNumber,
    },

    /// A blocking archive read was cancelled or panicked.
    #[error("archive read task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A state document holds a value that is not a decimal number.
    #[error("invalid value {value:?} for key {key:?} in {document}")]
    InvalidValue {
        /// The document file name.
        document: &'static str,
        /// The offending key.
        key: String,
        /// The offending value.
        value: String,
    },
}
