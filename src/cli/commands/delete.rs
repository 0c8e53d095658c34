use anyhow::{bail, Result};
use clap::Args;
use owo_colors::OwoColorize;
use tracing::info;

use crate::cli::commands::open_ledger;
use crate::data_paths::DataPaths;

#[derive(Args, Clone)]
pub struct DeleteArgs {
    /// Trade id to delete
    pub id: u64,
}

pub struct DeleteCommand {
    args: DeleteArgs,
}

impl DeleteCommand {
    pub fn new(args: DeleteArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, data_paths: DataPaths) -> Result<()> {
        let ledger = open_ledger(&data_paths);

        info!(id = self.args.id, "Deleting trade");
        if !ledger.engine.remove(self.args.id).await? {
            bail!("trade delete not possible");
        }

        println!("{} trade #{}", "Deleted".bright_green(), self.args.id);
        Ok(())
    }
}
