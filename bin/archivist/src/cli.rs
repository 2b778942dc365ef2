//! Contains the archivist CLI.

use crate::{
    commands::{ArchiveCommand, DownloadCommand, FundCommand, VerifyArchiveCommand},
    flags::GlobalArgs,
};
use anyhow::Result;
use archivist_cli::{cli_styles, init_tracing_subscriber};
use clap::{Parser, Subcommand};
use std::future::Future;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Relays finalized blocks of a relay chain and its parachains into permanent storage on a
/// target chain. Without a subcommand, every configured chain is relayed live.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, styles = cli_styles(), long_about = None)]
pub struct Cli {
    /// Global arguments for the CLI.
    #[command(flatten)]
    pub global: GlobalArgs,
    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands of the CLI.
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Replays the primary chain's downloaded archive.
    Archive(ArchiveCommand),
    /// Downloads the primary chain's finalized blocks into an archive.
    Download(DownloadCommand),
    /// Re-reads every archived block and checks its hash.
    VerifyArchive(VerifyArchiveCommand),
    /// Transfers funds from the primary chain's account.
    Fund(FundCommand),
}

impl Cli {
    /// Runs the CLI.
    pub fn run(self) -> Result<()> {
        init_tracing_subscriber(self.global.log_args.verbosity, None::<EnvFilter>)?;

        Self::run_until_ctrl_c(self.start())
    }

    /// Starts the metrics server and the selected command.
    pub async fn start(self) -> Result<()> {
        if let Some(addr) = self.global.metrics.init_metrics()? {
            info!(target: "archivist", %addr, "Metrics server started");
        }
        match self.command {
            None => Ok(self.global.service()?.run().await?),
            Some(Commands::Archive(command)) => command.run(&self.global).await,
            Some(Commands::Download(command)) => command.run(&self.global).await,
            Some(Commands::VerifyArchive(command)) => command.run(&self.global),
            Some(Commands::Fund(command)) => command.run(&self.global).await,
        }
    }

    /// Runs `fut` on a new runtime until it completes or the process is asked to stop.
    pub fn run_until_ctrl_c<F>(fut: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let rt = Self::tokio_runtime()?;
        rt.block_on(async move {
            tokio::select! {
                res = fut => res,
                signal = shutdown_signal() => {
                    let signal = signal?;
                    info!(target: "archivist", signal, "Shutting down");
                    Ok(())
                }
            }
        })
    }

    /// Creates a new default tokio multi-thread [Runtime](tokio::runtime::Runtime) with all
    /// features enabled.
    pub fn tokio_runtime() -> Result<tokio::runtime::Runtime, std::io::Error> {
        tokio::runtime::Builder::new_multi_thread().enable_all().build()
    }
}

/// Resolves with the name of the first shutdown signal received.
async fn shutdown_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.map(|()| "SIGINT"),
            _ = terminate.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map(|()| "SIGINT")
    }
}
