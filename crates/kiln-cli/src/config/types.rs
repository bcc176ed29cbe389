use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Build and serve posture.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Watch-mode rebuilds, source roots only, no immutable caching
    #[default]
    #[serde(alias = "dev", alias = "test")]
    Development,
    /// Pre-built output, immutable caching of built assets
    #[serde(alias = "prod")]
    Production,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External bundler command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundlerConfig {
    /// Executable to spawn once per target
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments passed before the target is piped on stdin
    #[serde(default = "default_args")]
    pub args: Vec<String>,
}

fn default_program() -> String {
    "node".to_string()
}

fn default_args() -> Vec<String> {
    vec!["kiln.bundle.mjs".to_string()]
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
        }
    }
}

/// File watching configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Directories to watch, relative to the project root
    #[serde(default = "default_watch_paths")]
    pub paths: Vec<PathBuf>,

    /// Extra path fragments to ignore on top of the built-in list
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Window in which repeated events for one path are collapsed
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_watch_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("src")]
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            paths: default_watch_paths(),
            ignore: Vec::new(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Values supplied on the command line.
///
/// Only fields that were actually given are serialized, so an absent flag
/// never masks a value from the environment or the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

/// Accept `true`/`false`, `1`/`0` and their string spellings for feature flags.
pub(crate) fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Str(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Int(value) => Ok(value != 0),
        Flag::Str(value) => match value.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "no" | "off" => Ok(false),
            "1" | "true" | "yes" | "on" => Ok(true),
            other => Err(serde::de::Error::custom(format!(
                "invalid flag value '{other}', expected true or false"
            ))),
        },
    }
}
