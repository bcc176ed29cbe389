//! Terminal UI utilities for status output.
//!
//! Operator-facing output only: build spinners, success/failure lines and the
//! readiness message. Nothing here is ever sent to HTTP clients.
//!
//! # Examples
//!
//! ```no_run
//! use kiln_cli::ui;
//!
//! ui::init_colors(false);
//!
//! let spinner = ui::Spinner::new("Building server and client...");
//! spinner.finish("Build complete");
//!
//! ui::success("Running on http://localhost:3000");
//! ui::error("Failed to read configuration");
//! ```

mod format;
mod messages;
mod spinner;

pub use format::format_duration;
pub use messages::{error, info, success, warning};
pub use spinner::Spinner;

/// Check if color output should be enabled.
///
/// `NO_COLOR` disables colors, `FORCE_COLOR` enables them even without a
/// terminal, otherwise stderr's terminal capability decides.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }

    console::user_attended_stderr()
}

/// Initialize color support based on environment.
///
/// Call early in `main`. `--no-color` wins over everything else.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && should_use_color();
    console::set_colors_enabled(enabled);
    console::set_colors_enabled_stderr(enabled);
}
