//! Spinner for builds and other tasks without a known duration.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Simple spinner for tasks without known duration.
///
/// When stderr is not a terminal the spinner draws nothing and only the
/// final status line is printed.
///
/// # Examples
///
/// ```no_run
/// use kiln_cli::ui::Spinner;
///
/// let spinner = Spinner::new("Building...");
/// spinner.finish("Build complete");
/// ```
pub struct Spinner {
    pb: ProgressBar,
    drawn: bool,
}

impl Spinner {
    /// Create and start a new spinner.
    pub fn new(message: &str) -> Self {
        if !console::Term::stderr().is_term() {
            eprintln!("{}", message);
            return Self {
                pb: ProgressBar::hidden(),
                drawn: false,
            };
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_strings(&["◐", "◓", "◑", "◒"]));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb, drawn: true }
    }

    /// Update spinner message while it's running.
    pub fn set_message(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    /// Finish spinner with a green checkmark.
    pub fn finish(&self, message: &str) {
        if self.drawn {
            self.pb
                .finish_with_message(format!("{} {}", "✓".green(), message));
        } else {
            self.pb.finish();
            crate::ui::success(message);
        }
    }

    /// Finish spinner with a red X.
    pub fn fail(&self, message: &str) {
        if self.drawn {
            self.pb
                .finish_with_message(format!("{} {}", "✗".red(), message));
        } else {
            self.pb.finish();
            crate::ui::error(message);
        }
    }
}
