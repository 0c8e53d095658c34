use anyhow::{bail, Result};
use clap::Args;
use owo_colors::OwoColorize;
use rust_decimal::Decimal;
use tracing::info;

use crate::cli::commands::open_ledger;
use crate::data_paths::DataPaths;
use crate::ledger::types::{Trade, TradeSide};

#[derive(Args, Clone)]
pub struct UpdateArgs {
    /// Trade id to update
    pub id: u64,

    /// New ticker symbol (moves the trade between portfolios)
    #[arg(long)]
    pub symbol: Option<String>,

    /// New trade direction
    #[arg(long, value_enum)]
    pub side: Option<TradeSide>,

    /// New price per share
    #[arg(long)]
    pub price: Option<Decimal>,

    /// New number of shares
    #[arg(long)]
    pub shares: Option<i64>,
}

pub struct UpdateCommand {
    args: UpdateArgs,
}

impl UpdateCommand {
    pub fn new(args: UpdateArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, data_paths: DataPaths) -> Result<()> {
        let ledger = open_ledger(&data_paths);
        let old = ledger.trades.get(self.args.id).await?;

        // Partial update: untouched fields keep their stored values.
        let mut updated = Trade::new(
            self.args.symbol.clone().unwrap_or_else(|| old.symbol.clone()),
            self.args.side.unwrap_or(old.side),
            self.args.price.unwrap_or(old.price),
            self.args.shares.unwrap_or(old.shares),
        )?;
        updated.id = old.id;
        updated.timestamp = old.timestamp;

        info!(id = self.args.id, %updated, "Updating trade");
        let Some(saved) = ledger.engine.amend(updated).await? else {
            bail!("trade update not possible");
        };

        println!(
            "{} trade #{}: {}",
            "Updated".bright_green(),
            self.args.id,
            saved
        );
        Ok(())
    }
}
