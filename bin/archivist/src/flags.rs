//! Flags shared by every command.

use archivist_cli::{LogArgs, MetricsArgs};
use archivist_service::{
    BatchLimits, DEFAULT_BYTE_LIMIT, DEFAULT_COUNT_LIMIT, RelayConfig, RelayService,
    RelayerConfig, RetryPolicy,
};
use clap::{Args, Parser, builder::RangedU64ValueParser};
use std::{path::PathBuf, time::Duration};

/// Global arguments for the CLI.
#[derive(Parser, Clone, Debug)]
pub struct GlobalArgs {
    /// Logging arguments.
    #[command(flatten)]
    pub log_args: LogArgs,
    /// Path of the JSON configuration file.
    #[arg(long, short = 'c', global = true, env = "ARCHIVIST_CONFIG", default_value = "archivist.json")]
    pub config: PathBuf,
    /// Directory of the checkpoint and feed cache files.
    #[arg(long, global = true, env = "ARCHIVIST_STATE_DIR", default_value = "state")]
    pub state_dir: PathBuf,
    /// Prometheus CLI arguments.
    #[command(flatten)]
    pub metrics: MetricsArgs,
    /// Relay tuning.
    #[command(flatten)]
    pub relay: RelayArgs,
}

impl GlobalArgs {
    /// Loads the configuration file.
    pub fn load_config(&self) -> anyhow::Result<RelayConfig> {
        Ok(RelayConfig::from_file(&self.config)?)
    }

    /// Builds the relay service from the configuration file and the flags.
    pub fn service(&self) -> anyhow::Result<RelayService> {
        let mut service =
            RelayService::new(self.load_config()?, &self.state_dir, self.relay.relayer_config()?)
                .with_request_timeout(Duration::from_secs(self.relay.rpc_timeout));
        if let Some(workers) = self.relay.signer_workers {
            service = service.with_signer_workers(workers);
        }
        Ok(service)
    }
}

/// Relay tuning flags.
#[derive(Args, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelayArgs {
    /// A batch is closed before its payload would reach this many bytes.
    #[arg(
        long = "batch.byte-limit",
        env = "ARCHIVIST_BATCH_BYTE_LIMIT",
        default_value_t = DEFAULT_BYTE_LIMIT,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub batch_byte_limit: usize,
    /// A batch is closed once it holds this many blocks.
    #[arg(
        long = "batch.count-limit",
        env = "ARCHIVIST_BATCH_COUNT_LIMIT",
        default_value_t = DEFAULT_COUNT_LIMIT,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub batch_count_limit: usize,
    /// Delay before the first retry of a failed call, in milliseconds.
    #[arg(long = "retry.min-delay-ms", env = "ARCHIVIST_RETRY_MIN_DELAY_MS", default_value_t = 1_000)]
    pub retry_min_delay_ms: u64,
    /// Upper bound of the delay between retries, in seconds.
    #[arg(long = "retry.max-delay-secs", env = "ARCHIVIST_RETRY_MAX_DELAY_SECS", default_value_t = 3_600)]
    pub retry_max_delay_secs: u64,
    /// Interval between archive replay throughput reports, in seconds.
    #[arg(long = "report-interval-secs", env = "ARCHIVIST_REPORT_INTERVAL_SECS", default_value_t = 60)]
    pub report_interval_secs: u64,
    /// Interval at which caught-up parachains re-query their finalized head, in seconds.
    #[arg(long = "poll-interval-secs", env = "ARCHIVIST_POLL_INTERVAL_SECS", default_value_t = 12)]
    pub poll_interval_secs: u64,
    /// Signing threads per account. Defaults to the available parallelism.
    #[arg(long = "signer-workers", env = "ARCHIVIST_SIGNER_WORKERS")]
    pub signer_workers: Option<usize>,
    /// RPC request timeout, in seconds.
    #[arg(long = "rpc-timeout-secs", env = "ARCHIVIST_RPC_TIMEOUT_SECS", default_value_t = 90)]
    pub rpc_timeout: u64,
}

impl RelayArgs {
    /// The relayer tuning selected by the flags.
    pub fn relayer_config(&self) -> anyhow::Result<RelayerConfig> {
        Ok(RelayerConfig {
            batch_limits: BatchLimits::new(self.batch_byte_limit, self.batch_count_limit)?,
            retry: RetryPolicy {
                min_delay: Duration::from_millis(self.retry_min_delay_ms),
                max_delay: Duration::from_secs(self.retry_max_delay_secs),
            },
            report_interval: Duration::from_secs(self.report_interval_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
        })
    }
}
