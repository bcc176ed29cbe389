//! The bundler boundary.
//!
//! The orchestrator never looks inside a bundler. It hands over a list of
//! [`BuildTarget`]s and gets back per-target stats payloads plus an aggregated
//! error list, or a [`BundlerFailure`] when the bundler could not run at all.
//!
//! [`CommandBundler`] is the shipped implementation: it runs an external
//! bundler command once per target, writing the target description as JSON to
//! the process's stdin and reading the stats payload as JSON from its stdout.

use crate::target::{BuildTarget, TargetKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Telemetry for one compiled target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetStats {
    /// Target this payload belongs to
    pub kind: TargetKind,
    /// Arbitrary structured telemetry (errors, warnings, timings, assets)
    pub payload: Value,
}

impl TargetStats {
    /// Wrap a payload reported by the bundler.
    pub fn new(kind: TargetKind, payload: Value) -> Self {
        Self { kind, payload }
    }

    /// Error messages listed in the payload's `errors` array.
    ///
    /// Entries may be plain strings or objects carrying a `message` field.
    pub fn errors(&self) -> Vec<String> {
        messages(&self.payload, "errors")
    }

    /// Number of entries in the payload's `warnings` array.
    pub fn warning_count(&self) -> usize {
        self.payload
            .get("warnings")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }
}

fn messages(payload: &Value, key: &str) -> Vec<String> {
    let Some(items) = payload.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        })
        .collect()
}

/// Result of one bundler run over a target set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BundlerOutput {
    /// Aggregated error messages across all targets
    pub errors: Vec<String>,
    /// Per-target stats, in the order targets were given
    pub children: Vec<TargetStats>,
}

/// The bundler itself could not run.
#[derive(Debug, thiserror::Error)]
pub enum BundlerFailure {
    /// The bundler process could not be started or awaited
    #[error("Failed to run bundler '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The bundler exited cleanly but its stats output was unreadable
    #[error("Bundler produced unreadable stats for target '{target}': {source}")]
    InvalidStats {
        target: TargetKind,
        #[source]
        source: serde_json::Error,
    },

    /// The target list could not be prepared for the bundler
    #[error("Invalid bundler configuration: {0}")]
    InvalidConfig(String),
}

/// A module bundler, consumed as a black box.
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Compile `targets` once to completion.
    async fn run(&self, targets: &[BuildTarget]) -> Result<BundlerOutput, BundlerFailure>;
}

/// Bundler backed by an external command.
///
/// For each target the command is spawned with:
/// - the target serialized as JSON on stdin
/// - `KILN_TARGET=<name>` plus any configured variables in the environment
///
/// The process must print its stats payload as JSON on stdout. A non-zero
/// exit status marks the target as failed; its errors are taken from the
/// payload when present, otherwise from stderr.
#[derive(Debug, Clone)]
pub struct CommandBundler {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl CommandBundler {
    /// Create a bundler running `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the command from `dir`.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set an environment variable for every invocation.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    async fn run_target(&self, target: &BuildTarget) -> Result<TargetStats, BundlerFailure> {
        let spawn_err = |source| BundlerFailure::Spawn {
            program: self.program.clone(),
            source,
        };

        let input = serde_json::to_vec(target)
            .map_err(|e| BundlerFailure::InvalidConfig(e.to_string()))?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env("KILN_TARGET", target.kind.as_str())
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        tracing::debug!(target = %target.kind, program = %self.program, "spawning bundler");
        let mut child = command.spawn().map_err(spawn_err)?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&input).await {
                Ok(()) => {}
                // The bundler may exit without reading its input; its exit
                // status and stdout still decide the outcome.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    tracing::debug!(target = %target.kind, "bundler closed stdin early");
                }
                Err(e) => return Err(spawn_err(e)),
            }
            // Dropping closes the pipe so the bundler sees EOF.
        }

        let output = child.wait_with_output().await.map_err(spawn_err)?;
        let parsed = serde_json::from_slice::<Value>(&output.stdout);

        if output.status.success() {
            let payload = parsed.map_err(|source| BundlerFailure::InvalidStats {
                target: target.kind,
                source,
            })?;
            return Ok(TargetStats::new(target.kind, payload));
        }

        // Failed target: keep whatever payload it printed, but make sure it
        // carries at least one error.
        let mut payload = parsed.unwrap_or_else(|_| serde_json::json!({}));
        if messages(&payload, "errors").is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let mut errors: Vec<Value> = stderr
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| Value::String(line.to_string()))
                .collect();
            if errors.is_empty() {
                errors.push(Value::String(format!(
                    "bundler exited with {}",
                    output.status
                )));
            }
            if let Some(obj) = payload.as_object_mut() {
                obj.insert("errors".to_string(), Value::Array(errors));
            } else {
                payload = serde_json::json!({ "errors": errors });
            }
        }

        Ok(TargetStats::new(target.kind, payload))
    }
}

#[async_trait]
impl Bundler for CommandBundler {
    async fn run(&self, targets: &[BuildTarget]) -> Result<BundlerOutput, BundlerFailure> {
        let mut output = BundlerOutput::default();

        for target in targets {
            let stats = self.run_target(target).await?;
            output.errors.extend(
                stats
                    .errors()
                    .into_iter()
                    .map(|e| format!("[{}] {}", target.kind, e)),
            );
            output.children.push(stats);
        }

        Ok(output)
    }
}
