use anyhow::Result;
use clap::Args;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use owo_colors::OwoColorize;

use crate::cli::commands::open_ledger;
use crate::data_paths::DataPaths;
use crate::ledger::types::TradeSide;

#[derive(Args, Clone)]
pub struct TradesArgs {
    /// Only show trades for this ticker symbol
    #[arg(long)]
    pub symbol: Option<String>,
}

pub struct TradesCommand {
    args: TradesArgs,
}

impl TradesCommand {
    pub fn new(args: TradesArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, data_paths: DataPaths) -> Result<()> {
        let ledger = open_ledger(&data_paths);
        let trades = match &self.args.symbol {
            Some(symbol) => {
                ledger
                    .trades
                    .list_by_symbol(&symbol.trim().to_uppercase())
                    .await?
            }
            None => ledger.trades.list_all().await?,
        };

        if trades.is_empty() {
            println!("{}", "No trades found".bright_black());
            return Ok(());
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["ID", "Timestamp", "Symbol", "Side", "Price", "Shares"]);

        for trade in &trades {
            let side = match trade.side {
                TradeSide::Buy => "buy".bright_green().to_string(),
                TradeSide::Sell => "sell".bright_red().to_string(),
            };
            table.add_row(vec![
                trade.id.map(|id| id.to_string()).unwrap_or_default(),
                trade.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                trade.symbol.clone(),
                side,
                format!("{:.2}", trade.price),
                trade.shares.to_string(),
            ]);
        }

        println!("{}", table);
        Ok(())
    }
}
