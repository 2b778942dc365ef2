//! Archive Subcommand

use crate::flags::GlobalArgs;
use clap::Parser;
use tracing::info;

/// The `archive` Subcommand
///
/// Replays the archive configured as the primary chain's `downloadedArchivePath`, resuming after
/// the last checkpoint.
///
/// # Usage
///
/// ```sh
/// archivist archive [OPTIONS]
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Replays the primary chain's downloaded archive.")]
pub struct ArchiveCommand {}

impl ArchiveCommand {
    /// Runs the archive subcommand.
    pub async fn run(self, args: &GlobalArgs) -> anyhow::Result<()> {
        let status = args.service()?.run_archive().await?;
        info!(target: "archivist", ?status, "Archive replay complete");
        Ok(())
    }
}
