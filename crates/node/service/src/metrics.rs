//! Relay metrics.

use archivist_protocol::BlockNumber;

/// Container for the relay's metric names.
#[derive(Debug, Clone)]
pub struct Metrics;

impl Metrics {
    /// Identifier for the counter of confirmed batches.
    pub const RELAY_BATCHES_TOTAL: &'static str = "archivist_relay_batches_total";

    /// Identifier for the counter of confirmed blocks.
    pub const RELAY_BLOCKS_TOTAL: &'static str = "archivist_relay_blocks_total";

    /// Identifier for the gauge of the last confirmed block number.
    pub const RELAY_LAST_BLOCK: &'static str = "archivist_relay_last_block";

    /// Identifier for the gauge of the archive replay throughput.
    pub const RELAY_BLOCKS_PER_SECOND: &'static str = "archivist_relay_blocks_per_second";

    /// Identifier for the counter of failed submission attempts.
    pub const RELAY_SUBMISSION_FAILURES_TOTAL: &'static str =
        "archivist_relay_submission_failures_total";

    /// Identifier for the gauge of the primary chain's finalized head.
    pub const HEAD_FINALIZED: &'static str = "archivist_head_finalized";

    /// Describes and zeroes the relay metrics.
    pub fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_counter!(
            Self::RELAY_BATCHES_TOTAL,
            metrics::Unit::Count,
            "Batches confirmed on the target chain"
        );
        metrics::describe_counter!(
            Self::RELAY_BLOCKS_TOTAL,
            metrics::Unit::Count,
            "Blocks confirmed on the target chain"
        );
        metrics::describe_gauge!(
            Self::RELAY_LAST_BLOCK,
            "Number of the last block confirmed on the target chain"
        );
        metrics::describe_gauge!(
            Self::RELAY_BLOCKS_PER_SECOND,
            "Blocks relayed per second since the archive replay started"
        );
        metrics::describe_counter!(
            Self::RELAY_SUBMISSION_FAILURES_TOTAL,
            metrics::Unit::Count,
            "Failed submission attempts, each followed by a retry"
        );
        metrics::describe_gauge!(
            Self::HEAD_FINALIZED,
            "Highest finalized block number reported by the primary chain"
        );
    }

    fn zero() {
        metrics::counter!(Self::RELAY_BATCHES_TOTAL).increment(0);
        metrics::counter!(Self::RELAY_BLOCKS_TOTAL).increment(0);
        metrics::counter!(Self::RELAY_SUBMISSION_FAILURES_TOTAL).increment(0);
        metrics::gauge!(Self::HEAD_FINALIZED).set(0.0);
    }

    /// Records a confirmed batch.
    pub fn inc_batches(chain: &str) {
        metrics::counter!(Self::RELAY_BATCHES_TOTAL, "chain" => chain.to_owned()).increment(1);
    }

    /// Records `count` confirmed blocks, the last of which is `last`.
    pub fn inc_blocks(chain: &str, count: usize, last: BlockNumber) {
        metrics::counter!(Self::RELAY_BLOCKS_TOTAL, "chain" => chain.to_owned())
            .increment(count as u64);
        metrics::gauge!(Self::RELAY_LAST_BLOCK, "chain" => chain.to_owned()).set(last as f64);
    }

    /// Records a failed submission attempt.
    pub fn inc_submission_failures(chain: &str) {
        metrics::counter!(Self::RELAY_SUBMISSION_FAILURES_TOTAL, "chain" => chain.to_owned())
            .increment(1);
    }

    /// Records the archive replay throughput.
    pub fn set_throughput(chain: &str, blocks_per_second: f64) {
        metrics::gauge!(Self::RELAY_BLOCKS_PER_SECOND, "chain" => chain.to_owned())
            .set(blocks_per_second);
    }

    /// Records the primary chain's finalized head.
    pub fn set_finalized_head(number: BlockNumber) {
        metrics::gauge!(Self::HEAD_FINALIZED).set(number as f64);
    }
}
