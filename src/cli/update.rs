//! The `patchkit update` subcommand.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::UpdaterConfig;
use crate::progress::ProgressEvent;
use crate::updater::{UpdateStatus, Updater};
use crate::utils::progress::TransferBar;

/// Run a full update cycle.
#[derive(Args)]
pub struct UpdateCommand {
    /// Only report what would change; skip download and apply.
    #[arg(long)]
    dry_run: bool,
}

impl UpdateCommand {
    pub async fn execute(self, config: UpdaterConfig) -> Result<()> {
        let updater = Updater::new(config).await?;

        if self.dry_run {
            let check = updater.check_for_update().await?;
            if check.update_available {
                println!(
                    "{} version {} is available (dry run, nothing changed)",
                    "update:".green().bold(),
                    check.latest_version
                );
            } else {
                println!("{} installation is up to date", "ok:".green().bold());
            }
            return Ok(());
        }

        // Ctrl-C aborts the download phase cleanly.
        let cancel = CancellationToken::new();
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                signal_cancel.cancel();
            }
        });

        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<ProgressEvent>();
        let reporter = tokio::spawn(async move {
            let bar = TransferBar::new(None);
            let mut failures = Vec::new();
            while let Some(event) = events_rx.recv().await {
                if let Some(error) = &event.error {
                    failures.push(format!("{}: {error}", event.subject));
                } else if event.completed {
                    bar.set_message(format!("{} done", event.subject));
                } else {
                    let eta = event
                        .eta_seconds
                        .map_or_else(String::new, |eta| format!(", eta {eta:.0}s"));
                    bar.set_message(format!(
                        "{} {:.1}% ({:.1} MB/s{eta})",
                        event.subject, event.percent, event.mbps
                    ));
                }
            }
            bar.finish_with_message("transfer complete");
            failures
        });

        let status = updater.update(&cancel, events_tx).await;
        let failures = reporter.await.unwrap_or_default();
        for failure in &failures {
            eprintln!("{} {failure}", "warning:".yellow().bold());
        }

        match status? {
            UpdateStatus::UpToDate => {
                println!("{} installation is up to date", "ok:".green().bold());
            }
            UpdateStatus::Updated(version) => {
                println!(
                    "{} now at version {} ({})",
                    "updated:".green().bold(),
                    version.version,
                    version.path.display()
                );
            }
        }
        Ok(())
    }
}
