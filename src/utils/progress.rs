//! Terminal progress indicators for the CLI.
//!
//! Thin wrappers over `indicatif` with consistent styling. Bars disable
//! themselves when `PATCHKIT_NO_PROGRESS` is set so scripted runs stay
//! clean.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

fn is_progress_disabled() -> bool {
    std::env::var("PATCHKIT_NO_PROGRESS").is_ok()
}

/// A byte-denominated progress bar for downloads and hashing runs.
pub struct TransferBar {
    bar: IndicatifBar,
}

impl TransferBar {
    /// Create a bar for `total` bytes, or a spinner-style bar when the total
    /// is unknown.
    pub fn new(total: Option<u64>) -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            match total {
                Some(total) => {
                    let bar = IndicatifBar::new(total);
                    bar.set_style(
                        IndicatifStyle::with_template(
                            "{msg:30} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, eta {eta})",
                        )
                        .unwrap_or_else(|_| IndicatifStyle::default_bar())
                        .progress_chars("=> "),
                    );
                    bar
                }
                None => {
                    let bar = IndicatifBar::new_spinner();
                    bar.enable_steady_tick(Duration::from_millis(100));
                    bar
                }
            }
        };
        Self { bar }
    }

    /// Set the label shown next to the bar.
    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    /// Set the absolute byte position.
    pub fn set_position(&self, bytes: u64) {
        self.bar.set_position(bytes);
    }

    /// Finish the bar, leaving `message` behind.
    pub fn finish_with_message(&self, message: impl Into<String>) {
        self.bar.finish_with_message(message.into());
    }

    /// Abandon the bar without marking it complete.
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

/// A step-counting bar for multi-file operations.
pub struct CountBar {
    bar: IndicatifBar,
}

impl CountBar {
    /// Create a bar over `total` steps.
    pub fn new(total: u64) -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new(total);
            bar.set_style(
                IndicatifStyle::with_template("{msg:30} [{bar:30.cyan/blue}] {pos}/{len}")
                    .unwrap_or_else(|_| IndicatifStyle::default_bar())
                    .progress_chars("=> "),
            );
            bar
        };
        Self { bar }
    }

    /// Set the label shown next to the bar.
    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    /// Advance by one step.
    pub fn inc(&self) {
        self.bar.inc(1);
    }

    /// Finish the bar, leaving `message` behind.
    pub fn finish_with_message(&self, message: impl Into<String>) {
        self.bar.finish_with_message(message.into());
    }
}
