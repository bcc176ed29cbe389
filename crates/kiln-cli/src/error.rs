//! Error handling for the kiln CLI.
//!
//! This module provides a hierarchical error type system using `thiserror`.
//! Each variant is meant to be actionable and carries a hint where one helps.
//!
//! # Architecture
//!
//! - **Top-level errors** (`CliError`) represent broad categories of failures
//! - **Domain-specific errors** (`ConfigError`, `kiln_build::BuildError`) carry details
//! - **Error conversion** is automatic via `#[from]` attributes
//! - **Context helpers** (`ResultExt`) attach paths, hints and messages
//!
//! Build failures are the only errors that end a `kiln build` run with a
//! non-zero status; `main` performs that mapping via [`exit_code`].

use kiln_build::BuildError;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration-related errors (invalid env values, bad config file)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Build failures (bundler could not run, target errors, stats writes)
    #[error("Build failed:\n{0}")]
    Build(#[from] BuildError),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file doesn't exist at the given location
    #[error("Config file not found: {}\n\nHint: Create a kiln.toml file or omit --config", .0.display())]
    NotFound(PathBuf),

    /// Configuration sources could not be combined into a valid config
    #[error("Invalid configuration: {0}\n\nHint: Check NODE_ENV (development|production), PORT and kiln.toml field types")]
    Extract(#[from] Box<figment::Error>),

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn a not-found I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a hint line to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}

/// Process exit status for a command result.
///
/// `0` for a clean start/stop, `1` for anything else. Build failures land
/// here as ordinary errors; no component below `main` exits the process.
pub fn exit_code<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

/// Convert a CLI error to a miette report for terminal display.
pub fn cli_error_to_miette(err: CliError) -> miette::Report {
    match err {
        CliError::Build(BuildError::Compilation { errors }) => miette::miette!(
            help = "Fix the errors above and run the build again",
            "Build failed with {} error(s):\n{}",
            errors.len(),
            errors.join("\n")
        ),
        CliError::Build(e) => miette::miette!("Build failed: {}", e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        other => miette::miette!("{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_not_found() {
        let err = ConfigError::NotFound(PathBuf::from("kiln.toml"));
        let msg = err.to_string();
        assert!(msg.contains("Config file not found"));
        assert!(msg.contains("kiln.toml"));
        assert!(msg.contains("Hint:"));
    }

    #[test]
    fn test_config_error_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "port".to_string(),
            value: "0".to_string(),
            hint: "Use a port between 1 and 65535".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Invalid value for 'port'"));
        assert!(msg.contains("Use a port between 1 and 65535"));
    }

    #[test]
    fn test_cli_error_from_build_error() {
        let build_err = BuildError::Compilation {
            errors: vec!["boom".to_string()],
        };
        let cli_err: CliError = build_err.into();
        assert!(matches!(cli_err, CliError::Build(_)));
        assert!(cli_err.to_string().contains("boom"));
    }

    #[test]
    fn test_exit_code() {
        let ok: Result<()> = Ok(());
        let failed: Result<()> = Err(CliError::Build(BuildError::Compilation {
            errors: vec!["x".to_string()],
        }));
        assert_eq!(exit_code(&ok), 0);
        assert_eq!(exit_code(&failed), 1);
    }

    #[test]
    fn test_result_ext_with_path() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));

        let err = result.with_path("/test/public").unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
    }

    #[test]
    fn test_result_ext_with_hint() {
        let result: std::result::Result<(), ConfigError> =
            Err(ConfigError::NotFound(PathBuf::from("kiln.toml")));

        let err = result.with_hint("Try creating the file").unwrap_err();
        assert!(err.to_string().contains("Hint: Try creating the file"));
    }

    #[test]
    fn test_result_ext_context() {
        let result: std::result::Result<(), ConfigError> =
            Err(ConfigError::NotFound(PathBuf::from("kiln.toml")));

        let err = result.context("Failed to start").unwrap_err();
        assert!(err.to_string().starts_with("Failed to start: "));
    }

    #[test]
    fn test_miette_report_lists_compilation_errors() {
        let report = cli_error_to_miette(CliError::Build(BuildError::Compilation {
            errors: vec!["a".to_string(), "b".to_string()],
        }));
        let msg = report.to_string();
        assert!(msg.contains("2 error(s)"));
        assert!(msg.contains("a\nb"));
    }
}
