#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod error;
pub use error::StorageError;

mod archive;
pub use archive::{ArchiveIter, ArchiveStore, ArchiveStream, LAST_DOWNLOADED_KEY};

mod state;
pub use state::{FEEDS_FILE, LAST_PROCESSED_FILE, PersistentState};
