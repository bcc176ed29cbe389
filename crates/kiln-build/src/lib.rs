//! # kiln-build
//!
//! Multi-target build driver for kiln.
//!
//! This crate coordinates a module bundler across the project's three build
//! targets (server, client, static export) without knowing anything about how
//! the bundler works:
//!
//! - [`target`] - Build target descriptions and their typed merge rules
//! - [`bundler`] - The bundler boundary and the command-backed implementation
//! - [`driver`] - One-shot and watch-friendly compile entry points
//! - [`stats`] - Stats file persistence for successful builds
//!
//! ## Quick Start
//!
//! ```no_run
//! use kiln_build::{CommandBundler, CompilerDriver, TargetEnv, TargetSelection};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let env = TargetEnv {
//!     root: ".".into(),
//!     dist: "dist".into(),
//!     production: true,
//!     graphql: false,
//! };
//! let bundler = Arc::new(CommandBundler::new("node").arg("scripts/bundle.js"));
//! let driver = CompilerDriver::new(bundler, env);
//!
//! // Fails fast on any error; writes dist/{server,client}.stats.json on success.
//! driver.build(TargetSelection::App).await?;
//! # Ok(()) }
//! ```

pub mod bundler;
pub mod driver;
pub mod error;
pub mod stats;
pub mod target;

pub use bundler::{Bundler, BundlerFailure, BundlerOutput, CommandBundler, TargetStats};
pub use driver::{CompiledArtifactSet, CompilerDriver};
pub use error::{BuildError, Result};
pub use stats::{CLIENT_STATS_FILE, SERVER_STATS_FILE, StatsPaths};
pub use target::{
    BuildTarget, Devtool, LoaderRule, OutputConfig, PluginSpec, TargetEnv, TargetKind,
    TargetOverlay, TargetSelection,
};
