//! Command-line interface for patchkit.
//!
//! Global flags resolve the updater configuration (config file plus
//! overrides); each subcommand owns its execution logic in its own module.

mod check;
mod list;
mod update;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::UpdaterConfig;

/// Top-level CLI for the patchkit update client.
#[derive(Parser)]
#[command(
    name = "patchkit",
    about = "Self-update client for versioned game installations",
    version,
    long_about = "patchkit keeps a versioned game installation current: it checks the update \
server for newer content, computes the delta between the installed files and the latest \
published manifest, downloads the minimal update package and applies it as a new version \
directory."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (equivalent to RUST_LOG=debug).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (default: ~/.config/patchkit/patchkit.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the numbered version folders.
    #[arg(long, global = true)]
    install_path: Option<PathBuf>,

    /// Base URL of the update server.
    #[arg(long, global = true)]
    update_url: Option<String>,

    /// How many installed versions to retain after an update.
    #[arg(long, global = true)]
    keep_versions: Option<usize>,

    /// Do not send OS details or the installed-version list with update checks.
    #[arg(long, global = true)]
    no_stats: bool,

    /// Worker limit for the local hashing pool.
    #[arg(long, global = true)]
    concurrency: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the update server whether newer content is available.
    Check(check::CheckCommand),
    /// Run a full update cycle: check, hash, delta, download, clone, apply.
    Update(update::UpdateCommand),
    /// List installed versions, newest first.
    List(list::ListCommand),
}

impl Cli {
    /// Resolve configuration and dispatch to the selected subcommand.
    pub async fn execute(self) -> Result<()> {
        let config = self.resolve_config()?;
        match self.command {
            Commands::Check(cmd) => cmd.execute(config).await,
            Commands::Update(cmd) => cmd.execute(config).await,
            Commands::List(cmd) => cmd.execute(config).await,
        }
    }

    /// Whether `--verbose` was passed.
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    fn resolve_config(&self) -> Result<UpdaterConfig> {
        let file = match &self.config {
            Some(path) => Some(path.clone()),
            None => UpdaterConfig::default_path().filter(|p| p.exists()),
        };

        let mut config = match file {
            Some(path) => UpdaterConfig::load(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => {
                let (Some(install_path), Some(update_url)) =
                    (self.install_path.clone(), self.update_url.clone())
                else {
                    bail!(
                        "no config file found; pass --install-path and --update-url or create {}",
                        UpdaterConfig::default_path()
                            .map_or_else(|| "a patchkit.toml".to_string(), |p| p.display().to_string())
                    );
                };
                UpdaterConfig::new(install_path, update_url)
            }
        };

        if let Some(install_path) = &self.install_path {
            config.install_path = install_path.clone();
        }
        if let Some(update_url) = &self.update_url {
            config.update_url = update_url.clone();
        }
        if let Some(keep_versions) = self.keep_versions {
            config.keep_versions = keep_versions;
        }
        if let Some(concurrency) = self.concurrency {
            config.hash_concurrency = concurrency;
        }
        if self.no_stats {
            config.send_stats = false;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_file() {
        let temp = tempfile::tempdir().unwrap();
        let config_path = temp.path().join("patchkit.toml");
        std::fs::write(
            &config_path,
            r#"
install_path = "/opt/game/installs"
update_url = "https://updates.example.com"
keep_versions = 3
"#,
        )
        .unwrap();

        let cli = Cli::parse_from([
            "patchkit",
            "--config",
            config_path.to_str().unwrap(),
            "--keep-versions",
            "7",
            "--no-stats",
            "list",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.keep_versions, 7);
        assert!(!config.send_stats);
        assert_eq!(config.update_url, "https://updates.example.com");
    }

    #[test]
    fn missing_required_settings_is_an_error() {
        let cli = Cli::parse_from(["patchkit", "--config", "/nonexistent/patchkit.toml", "check"]);
        assert!(cli.resolve_config().is_err());
    }

    #[test]
    fn flags_alone_are_enough() {
        let cli = Cli::parse_from([
            "patchkit",
            "--install-path",
            "/opt/game/installs",
            "--update-url",
            "https://updates.example.com",
            "check",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.install_path, PathBuf::from("/opt/game/installs"));
    }
}
