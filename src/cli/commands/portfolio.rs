use anyhow::Result;
use clap::Args;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use owo_colors::OwoColorize;

use crate::cli::commands::open_ledger;
use crate::data_paths::DataPaths;

#[derive(Args, Clone)]
pub struct PortfolioArgs {
    /// Only show this ticker symbol
    #[arg(long)]
    pub symbol: Option<String>,
}

pub struct PortfolioCommand {
    args: PortfolioArgs,
}

impl PortfolioCommand {
    pub fn new(args: PortfolioArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, data_paths: DataPaths) -> Result<()> {
        let ledger = open_ledger(&data_paths);
        let portfolios = match &self.args.symbol {
            Some(symbol) => ledger
                .portfolios
                .get(&symbol.trim().to_uppercase())
                .await?
                .into_iter()
                .collect(),
            None => ledger.portfolios.list_all().await?,
        };

        if portfolios.is_empty() {
            println!("{}", "No tracked portfolios".bright_black());
            return Ok(());
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Symbol", "Shares", "Avg Price", "Cost Basis"]);

        for portfolio in &portfolios {
            table.add_row(vec![
                portfolio.symbol.clone(),
                portfolio.shares.to_string(),
                format!("{:.2}", portfolio.average_price),
                format!("{:.2}", portfolio.cost_basis()),
            ]);
        }

        println!("{}", table);
        Ok(())
    }
}
