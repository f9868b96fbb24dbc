//! # Progress Feedback Module
//!
//! Spinner `indicatif` mostrato dalla CLI mentre la strategia gira su un
//! thread bloccante. La pipeline non ha progressi intermedi misurabili: il
//! feedback è indeterminato fino alla fine.
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:12] Compressing holiday.mp4 as video...
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Indeterminate progress for a single compression request
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Start a spinner with `message`; hidden when `visible` is false
    pub fn spinner(message: &str, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Clear the spinner, e.g. before printing an error
    pub fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}
