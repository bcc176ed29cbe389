//! Build command implementation.
//!
//! Runs the compiler driver once over the application targets (or the static
//! export), fails fast on any compilation error and persists stats on
//! success.

use crate::cli::BuildArgs;
use crate::commands::compiler_driver;
use crate::config::AppConfig;
use crate::error::{Result, ResultExt};
use crate::ui;
use kiln_build::{BuildError, CompiledArtifactSet, CompilerDriver, TargetSelection};

/// Execute the build command.
///
/// # Errors
///
/// Returns errors for:
/// - A bundler that could not be started
/// - Any target reporting compilation errors
/// - Stats that could not be written
pub async fn execute(args: BuildArgs, config: &AppConfig) -> Result<()> {
    let selection = if args.static_export {
        TargetSelection::Static
    } else {
        TargetSelection::App
    };

    ui::info(&format!(
        "Building {} targets ({})",
        selection_label(selection),
        config.mode
    ));

    let dist = config.dist_dir();
    tokio::fs::create_dir_all(&dist)
        .await
        .context(format!("Failed to create {}", dist.display()))?;

    run(&compiler_driver(config), selection).await?;
    Ok(())
}

/// Build `selection` with a spinner, reporting the outcome.
///
/// Shared with `kiln start --build`.
pub async fn run(
    driver: &CompilerDriver,
    selection: TargetSelection,
) -> Result<CompiledArtifactSet> {
    let spinner = ui::Spinner::new(&format!("Compiling {}...", selection_label(selection)));

    match driver.build(selection).await {
        Ok(set) => {
            spinner.finish(&format!(
                "Compiled in {}",
                ui::format_duration(set.duration())
            ));
            if set.warning_count() > 0 {
                ui::warning(&format!("{} warning(s)", set.warning_count()));
            }
            if selection.persists_stats() {
                let paths = driver.stats_paths();
                ui::info(&format!(
                    "Stats written to {} and {}",
                    paths.server.display(),
                    paths.client.display()
                ));
            }
            Ok(set)
        }
        Err(e) => {
            let summary = match &e {
                BuildError::Compilation { errors } => {
                    format!("Compilation failed with {} error(s)", errors.len())
                }
                BuildError::Bundler(_) => "Bundler could not run".to_string(),
                BuildError::MissingStats(kind) => format!("No output for the {} target", kind),
                BuildError::Persist { .. } => "Could not write build stats".to_string(),
            };
            spinner.fail(&summary);
            Err(e.into())
        }
    }
}

fn selection_label(selection: TargetSelection) -> &'static str {
    match selection {
        TargetSelection::App => "server + client",
        TargetSelection::Static => "static",
    }
}
