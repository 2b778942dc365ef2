//! Verify Archive Subcommand

use crate::flags::GlobalArgs;
use anyhow::Context;
use archivist_storage::ArchiveStore;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// The `verify-archive` Subcommand
///
/// Re-reads every archived block, recomputing its hash, and fails on the first missing or
/// undecodable block.
///
/// # Usage
///
/// ```sh
/// archivist verify-archive [--path <DIR>] [--after <BLOCK>]
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Re-reads every archived block and checks its hash.")]
pub struct VerifyArchiveCommand {
    /// Archive directory. Defaults to the configured `downloadedArchivePath`.
    #[arg(long)]
    pub path: Option<PathBuf>,
    /// Only verify blocks after this one.
    #[arg(long)]
    pub after: Option<u64>,
}

impl VerifyArchiveCommand {
    /// Runs the verify-archive subcommand.
    pub fn run(self, args: &GlobalArgs) -> anyhow::Result<()> {
        let path = match self.path {
            Some(path) => path,
            None => args
                .load_config()?
                .primary_chain
                .downloaded_archive_path
                .context("no --path given and no downloadedArchivePath configured")?,
        };
        let archive = ArchiveStore::open_read_only(&path)?;
        let last = archive.last_downloaded()?;
        let verified = archive.verify(self.after)?;
        info!(target: "archivist", path = %path.display(), verified, ?last, "Archive verified");
        Ok(())
    }
}
