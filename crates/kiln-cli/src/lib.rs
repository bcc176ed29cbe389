//! Kiln CLI - build orchestration and serving for server-rendered web apps.
//!
//! # Architecture
//!
//! - [`config`] - Layered, immutable application configuration
//! - [`server`] - The request pipeline: CORS, error boundary, static
//!   fallback chain, dev middleware, router
//! - [`dev`] - Watch-mode rebuilds with supersession and an event stream
//! - [`commands`] - `build`, `dev` and `start`
//! - [`error`] - Error types with actionable messages
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Terminal status output
//!
//! Compiling itself is delegated to [`kiln_build`].
//!
//! # Example
//!
//! ```rust,no_run
//! use kiln_cli::config::{AppConfig, ConfigOverrides};
//! use kiln_cli::server::Pipeline;
//!
//! # fn main() -> kiln_cli::Result<()> {
//! let config = AppConfig::load(&ConfigOverrides::default(), None)?;
//! let app = Pipeline::from_config(&config).into_router();
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod server;
pub mod ui;

pub use config::AppConfig;
pub use error::{CliError, ConfigError, Result, ResultExt};
