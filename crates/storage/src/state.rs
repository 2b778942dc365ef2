//! Relay checkpoints and feed registrations persisted as small JSON documents.

use crate::StorageError;
use archivist_protocol::BlockNumber;
use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// File name of the per-chain checkpoint document.
pub const LAST_PROCESSED_FILE: &str = "last-processed.json";

/// File name of the per-account feed registration document.
pub const FEEDS_FILE: &str = "feeds.json";

/// Persistent relay state.
///
/// Each document is a flat JSON object of string keys to decimal string values. Writes replace
/// the file atomically. Read-modify-write cycles on a document are serialized within the
/// process, there is no locking across processes.
#[derive(Debug)]
pub struct PersistentState {
    last_processed: Document,
    feeds: Document,
}

impl PersistentState {
    /// Creates the state rooted at `dir`. The directory is created on first access.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            last_processed: Document::new(&dir, LAST_PROCESSED_FILE),
            feeds: Document::new(&dir, FEEDS_FILE),
        }
    }

    /// Returns the last block relayed for `chain`.
    pub async fn get_last_processed(
        &self,
        chain: &str,
    ) -> Result<Option<BlockNumber>, StorageError> {
        self.last_processed.get(chain).await
    }

    /// Records `number` as the last block relayed for `chain`.
    ///
    /// The checkpoint never moves backwards: a value lower than the stored one is ignored.
    pub async fn save_last_processed(
        &self,
        chain: &str,
        number: BlockNumber,
    ) -> Result<(), StorageError> {
        let _guard = self.last_processed.lock.lock().await;
        let mut entries = self.last_processed.read().await?;
        let current =
            entries.get(chain).map(|value| parse(LAST_PROCESSED_FILE, chain, value)).transpose()?;
        if let Some(current) = current.filter(|current| *current > number) {
            warn!(target: "state", chain, current, number, "Refusing to move checkpoint backwards");
            return Ok(());
        }
        entries.insert(chain.to_owned(), number.to_string());
        self.last_processed.write(&entries).await?;
        debug!(target: "state", chain, number, "Saved checkpoint");
        Ok(())
    }

    /// Returns the feed registered for `address`.
    pub async fn get_feed_id(&self, address: &str) -> Result<Option<u64>, StorageError> {
        self.feeds.get(address).await
    }

    /// Records `feed_id` as the feed registered for `address`.
    pub async fn save_feed_id(&self, address: &str, feed_id: u64) -> Result<(), StorageError> {
        let _guard = self.feeds.lock.lock().await;
        let mut entries = self.feeds.read().await?;
        entries.insert(address.to_owned(), feed_id.to_string());
        self.feeds.write(&entries).await?;
        debug!(target: "state", address, feed_id, "Saved feed id");
        Ok(())
    }
}

#[derive(Debug)]
struct Document {
    name: &'static str,
    path: PathBuf,
    lock: Mutex<()>,
}

impl Document {
    fn new(dir: &Path, name: &'static str) -> Self {
        Self { name, path: dir.join(name), lock: Mutex::new(()) }
    }

    async fn get(&self, key: &str) -> Result<Option<u64>, StorageError> {
        let _guard = self.lock.lock().await;
        let entries = self.read().await?;
        entries.get(key).map(|value| parse(self.name, key, value)).transpose()
    }

    async fn read(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.create_dir().await?;
                return Ok(BTreeMap::new());
            }
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_slice(&raw) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                warn!(target: "state", path = %self.path.display(), %err, "Ignoring unparsable state document");
                Ok(BTreeMap::new())
            }
        }
    }

    async fn create_dir(&self) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }

    async fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        self.create_dir().await?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(entries)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn parse(document: &'static str, key: &str, value: &str) -> Result<u64, StorageError> {
    value.parse().map_err(|_| StorageError::InvalidValue {
        document,
        key: key.to_owned(),
        value: value.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_documents_are_empty() {
        let dir = TempDir::new().unwrap();
        let state_dir = dir.path().join("nested").join("state");
        let state = PersistentState::new(&state_dir);

        assert_eq!(state.get_last_processed("Polkadot").await.unwrap(), None);
        assert_eq!(state.get_feed_id("5Grw").await.unwrap(), None);
        // The first read creates the directory, but no document.
        assert!(state_dir.is_dir());
        assert!(!state_dir.join(LAST_PROCESSED_FILE).exists());
        assert!(!state_dir.join(FEEDS_FILE).exists());
    }

    #[tokio::test]
    async fn test_checkpoint_round_trip_and_file_format() {
        let dir = TempDir::new().unwrap();
        let state = PersistentState::new(dir.path().join("state"));

        state.save_last_processed("Polkadot", 41).await.unwrap();
        state.save_last_processed("Polkadot", 42).await.unwrap();
        state.save_last_processed("Statemint", 7).await.unwrap();
        assert_eq!(state.get_last_processed("Polkadot").await.unwrap(), Some(42));
        assert_eq!(state.get_last_processed("Statemint").await.unwrap(), Some(7));

        let raw = std::fs::read(dir.path().join("state").join(LAST_PROCESSED_FILE)).unwrap();
        let doc: BTreeMap<String, String> = serde_json::from_slice(&raw).unwrap();
        assert_eq!(doc["Polkadot"], "42");
        assert!(!dir.path().join("state").join(FEEDS_FILE).exists());
        assert!(!dir.path().join("state").join("last-processed.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_checkpoint_never_moves_backwards() {
        let dir = TempDir::new().unwrap();
        let state = PersistentState::new(dir.path());

        state.save_last_processed("Kusama", 100).await.unwrap();
        state.save_last_processed("Kusama", 99).await.unwrap();
        assert_eq!(state.get_last_processed("Kusama").await.unwrap(), Some(100));
    }

    #[tokio::test]
    async fn test_documents_are_independent() {
        let dir = TempDir::new().unwrap();
        let state = PersistentState::new(dir.path());

        state.save_feed_id("5Grw", 3).await.unwrap();
        std::fs::write(dir.path().join(LAST_PROCESSED_FILE), b"{ not json").unwrap();

        assert_eq!(state.get_last_processed("Polkadot").await.unwrap(), None);
        assert_eq!(state.get_feed_id("5Grw").await.unwrap(), Some(3));

        // An unparsable document is replaced on the next write.
        state.save_last_processed("Polkadot", 1).await.unwrap();
        assert_eq!(state.get_last_processed("Polkadot").await.unwrap(), Some(1));
        assert_eq!(state.get_feed_id("5Grw").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_invalid_value_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(FEEDS_FILE), br#"{"5Grw":"seven"}"#).unwrap();
        let state = PersistentState::new(dir.path());

        assert!(matches!(
            state.get_feed_id("5Grw").await,
            Err(StorageError::InvalidValue { document: FEEDS_FILE, .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_do_not_lose_updates() {
        let dir = TempDir::new().unwrap();
        let state = Arc::new(PersistentState::new(dir.path()));

        let handles = (0..16u64)
            .map(|i| {
                let state = Arc::clone(&state);
                tokio::spawn(async move { state.save_last_processed(&format!("chain-{i}"), i).await })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for i in 0..16u64 {
            assert_eq!(state.get_last_processed(&format!("chain-{i}")).await.unwrap(), Some(i));
        }
    }
}
