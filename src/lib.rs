//! patchkit - self-update client for versioned game installations
//!
//! A game installation directory holds multiple numbered version folders
//! (`001`, `002`, `003`, ...). patchkit keeps that installation current:
//! it asks the update server whether newer content exists, hashes the
//! installed files, computes the delta against the latest published
//! manifest, downloads the minimal update package identified by that
//! delta's canonical hash, clones the newest version directory and applies
//! the package onto the clone, preserving older versions up to a retention
//! limit.
//!
//! # Architecture
//!
//! The content-synchronization engine is built from small pieces, leaves
//! first:
//!
//! - [`hasher`] - [`ByteCounter`](hasher::ByteCounter) (pass-through byte
//!   observation), per-file hash tasks with progress/ETA events, and the
//!   bounded-concurrency [`HashPool`](hasher::HashPool)
//! - [`delta`] - add/modify/remove computation between two manifests and
//!   the canonical, order-independent delta hash the server uses to
//!   resolve a package URL
//! - [`manifest`] - path → hash manifests and file-tree walking
//! - [`catalog`] - the version → metadata map fetched from the server with
//!   a local-cache fallback, plus installed-version listing
//! - [`updater`] - the orchestrator: update check (with bounded retry),
//!   remote manifest fetch, package-URL resolution, cancellable
//!   progress-reporting download, version cloning, package application and
//!   retention pruning
//!
//! Supporting modules: [`progress`] (the shared event shape and interval
//! meter), [`telemetry`] (host OS identity for update checks), [`config`],
//! [`cli`], [`core`] (error taxonomy) and [`utils`].
//!
//! # Example
//!
//! ```rust,no_run
//! use patchkit::config::UpdaterConfig;
//! use patchkit::updater::{UpdateStatus, Updater};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = UpdaterConfig::new("/opt/game/installs", "https://updates.example.com");
//! let updater = Updater::new(config).await?;
//!
//! let (events, mut progress) =
//!     tokio::sync::mpsc::unbounded_channel::<patchkit::progress::ProgressEvent>();
//! tokio::spawn(async move {
//!     while let Some(event) = progress.recv().await {
//!         println!("{}: {:.1}%", event.subject, event.percent);
//!     }
//! });
//!
//! match updater.update(&CancellationToken::new(), events).await? {
//!     UpdateStatus::UpToDate => println!("nothing to do"),
//!     UpdateStatus::Updated(version) => println!("now at {}", version.version),
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod delta;
pub mod hasher;
pub mod manifest;
pub mod progress;
pub mod telemetry;
pub mod updater;
pub mod utils;
