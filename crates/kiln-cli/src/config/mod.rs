//! Application configuration, built once at startup.
//!
//! Merges settings from defaults, an optional `kiln.toml`, the process
//! environment and CLI flags into an immutable [`AppConfig`]. Priority:
//! CLI > environment > file > defaults.
//!
//! This is the only place that reads the environment. Every other component
//! receives `&AppConfig` (or a value derived from it).

mod loading;
mod types;

pub use loading::CONFIG_FILE;
pub use types::{BundlerConfig, ConfigOverrides, Mode, WatchConfig};

use crate::dev::{DevOptions, DevOptionsOverlay};
use crate::error::{ConfigError, Result};
use kiln_build::{CommandBundler, TargetEnv};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Immutable process-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Build/serve posture (`NODE_ENV`)
    #[serde(default)]
    pub mode: Mode,

    /// Interface to bind the HTTP server to
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// HTTP port (`PORT`)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether the data-fetching layer is compiled in (`GRAPHQL`)
    #[serde(default, deserialize_with = "types::deserialize_flag")]
    pub graphql: bool,

    /// Project root
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Distribution directory, relative to `root` unless absolute
    #[serde(default = "default_dist")]
    pub dist: PathBuf,

    /// Developer-editable static directory, relative to `root` unless absolute
    #[serde(default = "default_public")]
    pub public: PathBuf,

    /// External bundler command
    #[serde(default)]
    pub bundler: BundlerConfig,

    /// File watching (development only)
    #[serde(default)]
    pub watch: WatchConfig,

    /// Overrides for the development rebuild middleware
    #[serde(default)]
    pub dev_middleware: DevOptionsOverlay,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    3000
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_dist() -> PathBuf {
    PathBuf::from("dist")
}

fn default_public() -> PathBuf {
    PathBuf::from("public")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            host: default_host(),
            port: default_port(),
            graphql: false,
            root: default_root(),
            dist: default_dist(),
            public: default_public(),
            bundler: BundlerConfig::default(),
            watch: WatchConfig::default(),
            dev_middleware: DevOptionsOverlay::default(),
        }
    }
}

impl AppConfig {
    /// Whether this is a production posture.
    pub fn is_production(&self) -> bool {
        self.mode == Mode::Production
    }

    /// Absolute-or-root-relative distribution directory.
    pub fn dist_dir(&self) -> PathBuf {
        self.root.join(&self.dist)
    }

    /// Already-built client output (`<dist>/public`).
    pub fn built_public_dir(&self) -> PathBuf {
        self.dist_dir().join("public")
    }

    /// Developer-editable static directory (`<root>/public`).
    pub fn source_public_dir(&self) -> PathBuf {
        self.root.join(&self.public)
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Address reported to the operator once the server is ready.
    pub fn public_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    /// Inputs for the build target presets.
    pub fn target_env(&self) -> TargetEnv {
        TargetEnv {
            root: self.root.clone(),
            dist: self.dist_dir(),
            production: self.is_production(),
            graphql: self.graphql,
        }
    }

    /// The bundler command, with the posture passed through its environment.
    pub fn command_bundler(&self) -> CommandBundler {
        CommandBundler::new(&self.bundler.program)
            .args(self.bundler.args.iter().cloned())
            .current_dir(&self.root)
            .env("NODE_ENV", self.mode.as_str())
            .env("KILN_GRAPHQL", self.graphql.to_string())
    }

    /// Dev middleware options: defaults with `[dev_middleware]` applied.
    pub fn dev_options(&self) -> DevOptions {
        DevOptions::default().merge(self.dev_middleware.clone())
    }

    /// Check values that deserialization alone cannot catch.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `port` is 0
    /// - `root` does not exist
    /// - `bundler.program` is empty
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port".to_string(),
                value: self.port.to_string(),
                hint: "Use a port between 1 and 65535".to_string(),
            }
            .into());
        }

        if !self.root.is_dir() {
            return Err(ConfigError::InvalidValue {
                field: "root".to_string(),
                value: self.root.display().to_string(),
                hint: "Project root does not exist or is not a directory".to_string(),
            }
            .into());
        }

        if self.bundler.program.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "bundler.program".to_string(),
                value: String::new(),
                hint: "Set the bundler command in kiln.toml, e.g. program = \"node\"".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
