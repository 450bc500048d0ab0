//! Progress bar for the export loop

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Progress indicator over the records being exported.
pub struct ExportProgress {
    bar: ProgressBar,
}

impl ExportProgress {
    /// Progress bar drawn on stderr.
    pub fn new(total: u64, store: &str) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░"),
        );
        bar.set_message(format!("Saving contacts ({store})"));
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress that counts without drawing.
    pub fn hidden(total: u64) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::hidden());
        Self { bar }
    }

    /// Increment the progress by one
    pub fn inc(&self) {
        self.bar.inc(1);
    }

    /// Records processed so far.
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Run `f` with the bar cleared from the terminal.
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.bar.suspend(f)
    }

    /// Finish and clear the progress bar
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }

    /// Whether the bar was finished.
    pub fn is_finished(&self) -> bool {
        self.bar.is_finished()
    }
}
