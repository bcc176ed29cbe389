//! Command implementations for the kiln CLI.
//!
//! - [`build`] - One-shot compile with stats
//! - [`dev`] - Watch-mode server
//! - [`start`] - Serve built output
//!
//! Each command takes its parsed arguments and the loaded configuration and
//! returns a Result; none of them exits the process.

pub mod build;
pub mod dev;
pub mod start;

pub use build::execute as build_execute;
pub use dev::execute as dev_execute;
pub use start::execute as start_execute;

use crate::config::AppConfig;
use crate::ui;
use kiln_build::CompilerDriver;
use std::sync::Arc;

/// Driver running the configured bundler command over the configured targets.
pub fn compiler_driver(config: &AppConfig) -> CompilerDriver {
    CompilerDriver::new(Arc::new(config.command_bundler()), config.target_env())
}

/// Resolves on Ctrl+C.
pub(crate) async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => ui::info("Shutting down..."),
        Err(e) => {
            // Without a signal handler the server runs until killed
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
