//! The relay configuration file.

use archivist_rpc::{PalletIndices, StorageKeys};
use archivist_signer::{AccountSeed, DEFAULT_SS58_PREFIX, SignerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Errors loading a [`RelayConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// The config file path.
        path: PathBuf,
        /// The read error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a valid configuration.
    #[error("invalid config file {path}: {source}")]
    Parse {
        /// The config file path.
        path: PathBuf,
        /// The parse error.
        #[source]
        source: serde_json::Error,
    },
    /// An account seed is malformed.
    #[error("invalid account seed for {chain}: {source}")]
    Seed {
        /// The chain the seed belongs to.
        chain: String,
        /// The seed error.
        #[source]
        source: SignerError,
    },
    /// Two parachains share an id.
    #[error("parachain {0} is configured twice")]
    DuplicateParachain(u32),
    /// A batch limit would never let a batch close.
    #[error("invalid batch limits: {0}")]
    BatchLimits(&'static str),
}

/// Target runtime layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetConfig {
    /// Pallet and call indices.
    pub pallet_indices: PalletIndices,
    /// Raw storage keys.
    pub storage_keys: StorageKeys,
    /// SS58 prefix of the signing accounts' addresses.
    pub ss58_prefix: u16,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            pallet_indices: PalletIndices::default(),
            storage_keys: StorageKeys::default(),
            ss58_prefix: DEFAULT_SS58_PREFIX,
        }
    }
}

/// The primary chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryChainConfig {
    /// HTTP RPC endpoint.
    pub http_url: Url,
    /// WebSocket RPC endpoint, used for the finalized head subscription.
    pub ws_url: Url,
    /// `0x`-prefixed 32-byte ed25519 seed of the account storing this chain's blocks.
    pub account_seed: String,
    /// A local block archive to replay instead of fetching blocks live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded_archive_path: Option<PathBuf>,
}

/// A parachain of the primary chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParachainConfig {
    /// HTTP RPC endpoint.
    pub http_url: Url,
    /// `0x`-prefixed 32-byte ed25519 seed of the account storing this chain's blocks.
    pub account_seed: String,
    /// The parachain id.
    pub para_id: u32,
}

/// The relay configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    /// WebSocket RPC endpoint of the target chain.
    pub target_chain_url: Url,
    /// The primary chain.
    pub primary_chain: PrimaryChainConfig,
    /// Parachains relayed alongside the primary chain.
    #[serde(default)]
    pub parachains: Vec<ParachainConfig>,
    /// Target runtime layout.
    #[serde(default)]
    pub target: TargetConfig,
}

impl RelayConfig {
    /// Reads and validates the configuration at `path`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read(path)
            .map_err(|source| ConfigError::Read { path: path.to_owned(), source })?;
        let config: Self = serde_json::from_slice(&raw)
            .map_err(|source| ConfigError::Parse { path: path.to_owned(), source })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the parts serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.primary_seed()?;
        let mut para_ids = Vec::with_capacity(self.parachains.len());
        for parachain in &self.parachains {
            parachain.seed()?;
            if para_ids.contains(&parachain.para_id) {
                return Err(ConfigError::DuplicateParachain(parachain.para_id));
            }
            para_ids.push(parachain.para_id);
        }
        Ok(())
    }

    /// The primary chain's signing seed.
    pub fn primary_seed(&self) -> Result<AccountSeed, ConfigError> {
        AccountSeed::from_hex(&self.primary_chain.account_seed)
            .map_err(|source| ConfigError::Seed { chain: "primary chain".to_owned(), source })
    }
}

impl ParachainConfig {
    /// The parachain's signing seed.
    pub fn seed(&self) -> Result<AccountSeed, ConfigError> {
        AccountSeed::from_hex(&self.account_seed).map_err(|source| ConfigError::Seed {
            chain: format!("parachain {}", self.para_id),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SEED: &str = "0x9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

    fn config_json(parachains: &str) -> String {
        format!(
            r#"{{
                "targetChainUrl": "ws://127.0.0.1:9944",
                "primaryChain": {{
                    "httpUrl": "http://127.0.0.1:9933",
                    "wsUrl": "ws://127.0.0.1:9945",
                    "accountSeed": "{SEED}"
                }},
                "parachains": [{parachains}]
            }}"#
        )
    }

    #[test]
    fn test_load_config_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config_json("").as_bytes()).unwrap();

        let config = RelayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.primary_chain.downloaded_archive_path, None);
        assert!(config.parachains.is_empty());
        assert_eq!(config.target, TargetConfig::default());
        assert_eq!(config.target.ss58_prefix, 42);
    }

    #[test]
    fn test_parachains_and_target_overrides() {
        let parachain = format!(
            r#"{{"httpUrl": "http://127.0.0.1:8833", "accountSeed": "{SEED}", "paraId": 1000}}"#
        );
        let mut json: serde_json::Value = serde_json::from_str(&config_json(&parachain)).unwrap();
        json["target"] = serde_json::json!({ "ss58Prefix": 2254, "palletIndices": { "feeds": 5 } });

        let config: RelayConfig = serde_json::from_value(json).unwrap();
        config.validate().unwrap();
        assert_eq!(config.parachains[0].para_id, 1000);
        assert_eq!(config.target.ss58_prefix, 2254);
        assert_eq!(config.target.pallet_indices.feeds, 5);
    }

    #[test]
    fn test_rejects_duplicate_parachains() {
        let parachain = format!(
            r#"{{"httpUrl": "http://127.0.0.1:8833", "accountSeed": "{SEED}", "paraId": 1000}}"#
        );
        let config: RelayConfig =
            serde_json::from_str(&config_json(&format!("{parachain},{parachain}"))).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateParachain(1000))));
    }

    #[test]
    fn test_rejects_bad_seed() {
        let config: RelayConfig =
            serde_json::from_str(&config_json("").replace(SEED, "0x1234")).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Seed { .. })));
    }

    #[test]
    fn test_missing_file() {
        let err = RelayConfig::from_file(Path::new("/nonexistent/archivist.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
