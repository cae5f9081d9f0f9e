//! The `patchkit check` subcommand.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::UpdaterConfig;
use crate::updater::Updater;

/// Ask the update server whether newer content is available.
#[derive(Args)]
pub struct CheckCommand {
    /// Print the raw server answer as JSON.
    #[arg(long)]
    json: bool,
}

impl CheckCommand {
    pub async fn execute(self, config: UpdaterConfig) -> Result<()> {
        let updater = Updater::new(config).await?;
        let check = updater.check_for_update().await?;

        if self.json {
            println!(
                "{}",
                serde_json::json!({
                    "update_available": check.update_available,
                    "latest_version": check.latest_version,
                })
            );
            return Ok(());
        }

        if check.update_available {
            println!(
                "{} version {} is available",
                "update:".green().bold(),
                check.latest_version
            );
        } else {
            println!("{} installation is up to date", "ok:".green().bold());
        }
        Ok(())
    }
}
