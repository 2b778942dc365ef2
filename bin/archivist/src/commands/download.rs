//! Download Subcommand

use crate::flags::GlobalArgs;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// The `download` Subcommand
///
/// Downloads the primary chain's finalized blocks into a local archive, resuming after the
/// archive's last contiguous block.
///
/// # Usage
///
/// ```sh
/// archivist download [--path <DIR>] [--until <BLOCK>]
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Downloads the primary chain's finalized blocks into an archive.")]
pub struct DownloadCommand {
    /// Archive directory. Defaults to the configured `downloadedArchivePath`.
    #[arg(long)]
    pub path: Option<PathBuf>,
    /// Last block to download. Defaults to the finalized head.
    #[arg(long)]
    pub until: Option<u64>,
}

impl DownloadCommand {
    /// Runs the download subcommand.
    pub async fn run(self, args: &GlobalArgs) -> anyhow::Result<()> {
        let status = args.service()?.download(self.path.as_deref(), self.until).await?;
        info!(target: "archivist", ?status, "Download complete");
        Ok(())
    }
}
