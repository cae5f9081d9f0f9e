//! The `patchkit list` subcommand.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::UpdaterConfig;
use crate::updater::Updater;

/// List installed versions, newest first.
#[derive(Args)]
pub struct ListCommand {
    /// Show version paths and catalog metadata.
    #[arg(long)]
    details: bool,
}

impl ListCommand {
    pub async fn execute(self, config: UpdaterConfig) -> Result<()> {
        let updater = Updater::new(config).await?;
        let versions = updater.catalog().list_installed().await?;

        if versions.is_empty() {
            println!("no versions installed");
            return Ok(());
        }

        for (index, version) in versions.iter().enumerate() {
            let marker = if index == 0 { "latest".green().to_string() } else { String::new() };
            if self.details {
                let name = version
                    .map
                    .as_ref()
                    .and_then(|m| m.name.as_deref())
                    .unwrap_or("-");
                println!(
                    "{:8} {:20} {} {marker}",
                    version.version,
                    name,
                    version.path.display()
                );
            } else {
                println!("{:8} {marker}", version.version);
            }
        }
        Ok(())
    }
}
