use anyhow::{bail, Result};
use clap::Args;
use owo_colors::OwoColorize;
use rust_decimal::Decimal;
use tracing::info;

use crate::cli::commands::open_ledger;
use crate::data_paths::DataPaths;
use crate::ledger::types::{Trade, TradeSide};

#[derive(Args, Clone)]
pub struct AddArgs {
    /// Ticker symbol (e.g. AAPL)
    pub symbol: String,

    /// Trade direction
    #[arg(long, value_enum)]
    pub side: TradeSide,

    /// Price per share (e.g. 100.50)
    #[arg(long)]
    pub price: Decimal,

    /// Number of shares
    #[arg(long)]
    pub shares: i64,
}

pub struct AddCommand {
    args: AddArgs,
}

impl AddCommand {
    pub fn new(args: AddArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, data_paths: DataPaths) -> Result<()> {
        let ledger = open_ledger(&data_paths);
        let trade = Trade::new(
            &self.args.symbol,
            self.args.side,
            self.args.price,
            self.args.shares,
        )?;

        info!(%trade, "Adding trade");
        let Some(saved) = ledger.engine.record(trade).await? else {
            bail!("trade adding not possible");
        };

        println!(
            "{} trade #{}: {}",
            "Recorded".bright_green(),
            saved.id.unwrap_or_default(),
            saved
        );
        match ledger.portfolios.get(&saved.symbol).await? {
            Some(portfolio) => println!(
                "Portfolio {}: {} shares @ avg {}",
                portfolio.symbol, portfolio.shares, portfolio.average_price
            ),
            None => println!("Portfolio {} closed", saved.symbol),
        }
        Ok(())
    }
}
