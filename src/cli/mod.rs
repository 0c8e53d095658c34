//! CLI module for Folio
//!
//! This module provides the command-line interface for the portfolio
//! ledger. It uses clap for argument parsing and provides a structured
//! command pattern for all ledger operations.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

use crate::data_paths::{DataPaths, DEFAULT_DATA_DIR};
use crate::logging::{init_logging, LoggingConfig};

use commands::add::{AddArgs, AddCommand};
use commands::delete::{DeleteArgs, DeleteCommand};
use commands::portfolio::{PortfolioArgs, PortfolioCommand};
use commands::returns::{ReturnsArgs, ReturnsCommand};
use commands::trades::{TradesArgs, TradesCommand};
use commands::update::{UpdateArgs, UpdateCommand};

#[derive(Parser)]
#[command(name = "folio")]
#[command(version)]
#[command(about = "Trade ledger with average-cost portfolio tracking", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory path (default: ./data)
    #[arg(long, global = true, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a new trade and reconcile its portfolio
    Add(AddArgs),

    /// Update an existing trade by id
    Update(UpdateArgs),

    /// Delete a trade by id
    Delete(DeleteArgs),

    /// List trades in the ledger
    Trades(TradesArgs),

    /// Show tracked portfolios
    Portfolio(PortfolioArgs),

    /// Show portfolio returns against a quoted price
    Returns(ReturnsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let data_paths = DataPaths::new(&self.data_dir);

        // Ensure all directories exist
        data_paths.ensure_directories()?;
        init_logging(LoggingConfig::new(data_paths.clone(), self.verbose))?;

        match self.command {
            Commands::Add(args) => AddCommand::new(args).execute(data_paths).await,
            Commands::Update(args) => UpdateCommand::new(args).execute(data_paths).await,
            Commands::Delete(args) => DeleteCommand::new(args).execute(data_paths).await,
            Commands::Trades(args) => TradesCommand::new(args).execute(data_paths).await,
            Commands::Portfolio(args) => PortfolioCommand::new(args).execute(data_paths).await,
            Commands::Returns(args) => ReturnsCommand::new(args).execute(data_paths).await,
        }
    }
}
