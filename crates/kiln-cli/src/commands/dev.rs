//! Dev command implementation.
//!
//! Orchestrates watch mode:
//! - First compile triggered right after the socket is bound
//! - File watching with debouncing
//! - Pipeline with the dev middleware and event stream
//! - Graceful shutdown on Ctrl+C

use crate::cli::DevArgs;
use crate::commands::{compiler_driver, shutdown_signal};
use crate::config::AppConfig;
use crate::dev::{DevRebuild, DevState, FileWatcher};
use crate::error::{Result, ResultExt};
use crate::server::{self, Pipeline};
use crate::ui;
use std::sync::Arc;

/// Execute the dev command.
///
/// Compilation errors never end the command; they are reported and the
/// last good bundle keeps being served.
///
/// # Errors
///
/// Returns errors for:
/// - Watch paths that do not exist
/// - A port that cannot be bound
pub async fn execute(_args: DevArgs, config: &AppConfig) -> Result<()> {
    ui::info("Starting development server...");

    let state = Arc::new(DevState::new(config.public_url()));
    let rebuild = DevRebuild::new(compiler_driver(config), state, config.dev_options());

    rebuild.on_ready(|signal| {
        ui::success(&format!(
            "Listening on {} (build {} in {})",
            signal.url,
            signal.cycle,
            ui::format_duration(signal.duration)
        ));
    });

    let (watcher, changes) = FileWatcher::new(
        config.root.clone(),
        &config.watch.paths,
        &config.watch.ignore,
        config.watch.debounce_ms,
    )
    .with_hint("Set [watch] paths in kiln.toml to your source directories")?;

    for dir in watcher.watched() {
        ui::info(&format!("Watching {}", dir.display()));
    }

    let listener = server::bind(config.bind_addr()).await?;

    rebuild.trigger();
    let watch_task = rebuild.clone().watch(changes);

    let app = Pipeline::from_config(config).with_dev(rebuild).into_router();
    ui::info("Press Ctrl+C to stop");

    let result = server::serve(listener, app, shutdown_signal()).await;

    watch_task.abort();
    drop(watcher);

    result?;
    ui::success("Development server stopped");
    Ok(())
}
