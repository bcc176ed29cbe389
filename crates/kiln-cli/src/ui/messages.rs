//! Status message functions for terminal output.

use owo_colors::OwoColorize;

fn print(symbol: impl std::fmt::Display, plain: &str, message: impl std::fmt::Display) {
    if console::colors_enabled_stderr() {
        eprintln!("{} {}", symbol, message);
    } else {
        eprintln!("{} {}", plain, message);
    }
}

/// Print a success message to stderr.
pub fn success(message: &str) {
    print("✓".green().bold(), "✓", message);
}

/// Print an info message to stderr.
pub fn info(message: &str) {
    print("ℹ".blue().bold(), "ℹ", message);
}

/// Print a warning message to stderr.
pub fn warning(message: &str) {
    if console::colors_enabled_stderr() {
        eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
    } else {
        eprintln!("⚠ {}", message);
    }
}

/// Print an error message to stderr.
pub fn error(message: &str) {
    if console::colors_enabled_stderr() {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    } else {
        eprintln!("✗ {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages() {
        success("Success message");
        info("Info message");
        warning("Warning message");
        error("Error message");
    }
}
