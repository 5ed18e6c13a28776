//! Console progress for pipeline stages
//!
//! Bars only move when the external tool reports a percentage. Stages that
//! report nothing get a spinner that stops when the stage returns.

use crate::types::Stage;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress display for one stage
pub struct StageProgress {
    pb: ProgressBar,
    determinate: bool,
}

impl StageProgress {
    /// Start a spinner for `stage` (hidden when `enabled` is false)
    pub fn start(stage: Stage, enabled: bool) -> Self {
        if !enabled {
            return Self {
                pb: ProgressBar::hidden(),
                determinate: false,
            };
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("{} (stage {} of 3 running)", stage, stage.number()));
        pb.enable_steady_tick(Duration::from_millis(120));

        Self {
            pb,
            determinate: false,
        }
    }

    /// Update from a percentage reported by the tool
    ///
    /// The first report switches the spinner to a bar.
    pub fn set_percent(&mut self, percent: f32) {
        if self.pb.is_hidden() {
            return;
        }
        if !self.determinate {
            self.pb.set_length(100);
            self.pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
            );
            self.determinate = true;
        }
        self.pb.set_position(percent.clamp(0.0, 100.0).round() as u64);
    }

    /// Clear the bar once the stage succeeded
    pub fn finish(self) {
        self.pb.finish_and_clear();
    }

    /// Leave the bar where it stopped after a failure
    pub fn abandon(self) {
        self.pb.abandon();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_progress_ignores_updates() {
        let mut progress = StageProgress::start(Stage::Acquired, false);
        progress.set_percent(42.0);
        assert!(!progress.determinate);
        progress.finish();
    }
}
