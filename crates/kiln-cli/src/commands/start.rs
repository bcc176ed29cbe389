//! Start command implementation.
//!
//! Serves the pipeline without the dev middleware. In production the built
//! client output is probed before the source `public/` directory.

use crate::cli::StartArgs;
use crate::commands::{build, compiler_driver, shutdown_signal};
use crate::config::AppConfig;
use crate::error::Result;
use crate::server::{self, Pipeline};
use crate::ui;
use kiln_build::TargetSelection;

/// Execute the start command.
///
/// # Errors
///
/// Returns errors for:
/// - A failed `--build`
/// - A port that cannot be bound
pub async fn execute(args: StartArgs, config: &AppConfig) -> Result<()> {
    if args.build {
        tokio::fs::create_dir_all(config.dist_dir()).await?;
        build::run(&compiler_driver(config), TargetSelection::App).await?;
    }

    let pipeline = Pipeline::from_config(config);
    for root in &static_roots_summary(config) {
        ui::info(root);
    }

    let listener = server::bind(config.bind_addr()).await?;
    ui::success(&format!("Listening on {}", config.public_url()));

    server::serve(listener, pipeline.into_router(), shutdown_signal()).await?;
    ui::success("Server stopped");
    Ok(())
}

fn static_roots_summary(config: &AppConfig) -> Vec<String> {
    server::static_roots(config)
        .into_iter()
        .map(|root| format!("Serving {:?} files from {}", root.kind, root.dir.display()))
        .collect()
}
