// src/progress.rs
use crate::types::Progress;
use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str =
    "{msg}: {percent:>3}%|{bar:40.cyan/blue}| {pos}/{len} Words [{elapsed_precise}<{eta_precise}, {per_sec}]";

/// Terminal progress bar told "one more of N done" per result.
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new(total: u64, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(total)
        } else {
            ProgressBar::hidden()
        };

        let style = ProgressStyle::default_bar()
            .template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        bar.set_style(style);
        bar.set_message("Progress");

        Self { bar }
    }

    pub fn advance(&self, progress: Progress) {
        self.bar.set_position(progress.completed as u64);
    }

    /// Prints a line without tearing the bar, even when the bar is hidden.
    pub fn println(&self, line: &str) {
        self.bar.suspend(|| println!("{}", line));
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_tracks_completed() {
        let reporter = ProgressReporter::new(3, false);
        reporter.advance(Progress { completed: 2, total: 3 });
        assert_eq!(reporter.position(), 2);
    }
}
