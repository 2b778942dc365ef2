#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod batch;
pub use batch::{BatchError, BatchLimits, BatchStream, DEFAULT_BYTE_LIMIT, DEFAULT_COUNT_LIMIT};

mod config;
pub use config::{ConfigError, ParachainConfig, PrimaryChainConfig, RelayConfig, TargetConfig};

mod download;
pub use download::{CHECKPOINT_EVERY, download_archive};

mod error;
pub use error::{RelayError, ServiceError, SubmitError};

mod fetcher;
pub use fetcher::{BlockFetcher, RELAY_CHAINS, is_relay_chain};

mod metrics;
pub use metrics::Metrics;

mod relayer;
pub use relayer::{
    DEFAULT_POLL_INTERVAL, DEFAULT_REPORT_INTERVAL, Relayer, RelayerConfig, SyncStatus,
};

mod retry;
pub use retry::RetryPolicy;

mod service;
pub use service::RelayService;

mod submitter;
pub use submitter::{BlockSubmitter, TargetSubmitter};

mod tracker;
pub use tracker::{ChainHeadState, ChainHeadTracker, TrackerError};
