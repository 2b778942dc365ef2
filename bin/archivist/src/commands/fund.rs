//! Fund Subcommand

use crate::flags::GlobalArgs;
use clap::Parser;
use tracing::info;

/// The `fund` Subcommand
///
/// Transfers funds from the primary chain's signing account, typically to a parachain's
/// signing account before its first relay.
///
/// # Usage
///
/// ```sh
/// archivist fund --to <SS58> --amount <PLANCK>
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Transfers funds from the primary chain's account.")]
pub struct FundCommand {
    /// SS58 address of the recipient.
    #[arg(long)]
    pub to: String,
    /// Amount in the target chain's smallest unit.
    #[arg(long)]
    pub amount: u128,
}

impl FundCommand {
    /// Runs the fund subcommand.
    pub async fn run(self, args: &GlobalArgs) -> anyhow::Result<()> {
        let block_hash = args.service()?.fund(&self.to, self.amount).await?;
        info!(target: "archivist", to = %self.to, amount = self.amount, %block_hash, "Transfer included");
        Ok(())
    }
}
