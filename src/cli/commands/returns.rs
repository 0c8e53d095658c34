use anyhow::Result;
use clap::Args;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use owo_colors::OwoColorize;
use rust_decimal::Decimal;

use crate::cli::commands::open_ledger;
use crate::data_paths::DataPaths;
use crate::ledger::store::{FixedPriceSource, PriceSource};

/// Fallback quote used when no price source is wired up.
const DEFAULT_QUOTE: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

#[derive(Args, Clone)]
pub struct ReturnsArgs {
    /// Quote every instrument at this price instead of the default
    #[arg(long)]
    pub price: Option<Decimal>,
}

pub struct ReturnsCommand {
    args: ReturnsArgs,
}

impl ReturnsCommand {
    pub fn new(args: ReturnsArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, data_paths: DataPaths) -> Result<()> {
        let ledger = open_ledger(&data_paths);
        let quotes = FixedPriceSource::new(self.args.price.unwrap_or(DEFAULT_QUOTE));

        let portfolios = ledger.portfolios.list_all().await?;
        if portfolios.is_empty() {
            println!("{}", "No tracked portfolios".bright_black());
            return Ok(());
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Symbol", "Shares", "Avg Price", "Quote", "Return"]);

        let mut total = Decimal::ZERO;
        for portfolio in &portfolios {
            let quote = quotes.current_price(&portfolio.symbol).await?;
            let gain = (quote - portfolio.average_price) * Decimal::from(portfolio.shares);
            total += gain;
            table.add_row(vec![
                portfolio.symbol.clone(),
                portfolio.shares.to_string(),
                format!("{:.2}", portfolio.average_price),
                format!("{:.2}", quote),
                format!("{:.2}", gain),
            ]);
        }

        println!("{}", table);
        println!("Cumulative return: {:.2}", total);
        Ok(())
    }
}
