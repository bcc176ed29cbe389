//! Multi-target compiler driver.
//!
//! [`CompilerDriver::compile`] runs the bundler once over a target selection
//! and folds compilation errors into the returned [`CompiledArtifactSet`].
//! [`CompilerDriver::build`] is the one-shot production path on top of it:
//! any failure comes back as a fatal [`BuildError`], and only an unambiguous
//! success persists stats.
//!
//! The driver never exits the process. Mapping a fatal error to an exit
//! status is the entry point's job.

use crate::bundler::{Bundler, TargetStats};
use crate::error::{BuildError, Result};
use crate::stats::StatsPaths;
use crate::target::{TargetEnv, TargetKind, TargetSelection};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of one compiler invocation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledArtifactSet {
    selection: TargetSelection,
    stats: Vec<TargetStats>,
    errors: Vec<String>,
    duration: Duration,
}

impl CompiledArtifactSet {
    /// Assemble a result from the bundler's per-target stats and errors.
    pub fn new(
        selection: TargetSelection,
        stats: Vec<TargetStats>,
        errors: Vec<String>,
        duration: Duration,
    ) -> Self {
        Self {
            selection,
            stats,
            errors,
            duration,
        }
    }

    /// Targets this run covered.
    pub fn selection(&self) -> TargetSelection {
        self.selection
    }

    /// Whether every target compiled without errors.
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Aggregated error messages across all targets.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Total warnings reported across all targets.
    pub fn warning_count(&self) -> usize {
        self.stats.iter().map(TargetStats::warning_count).sum()
    }

    /// Wall-clock time of the bundler run.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Stats payload for a target.
    pub fn stats_for(&self, kind: TargetKind) -> Option<&Value> {
        self.stats
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| &s.payload)
    }

    /// All per-target stats, in bundler order.
    pub fn stats(&self) -> &[TargetStats] {
        &self.stats
    }
}

/// Drives a [`Bundler`] over the project's targets.
#[derive(Clone)]
pub struct CompilerDriver {
    bundler: Arc<dyn Bundler>,
    env: TargetEnv,
    stats_paths: StatsPaths,
}

impl CompilerDriver {
    /// Create a driver for the targets described by `env`.
    pub fn new(bundler: Arc<dyn Bundler>, env: TargetEnv) -> Self {
        let stats_paths = StatsPaths::new(&env.dist);
        Self {
            bundler,
            env,
            stats_paths,
        }
    }

    /// Target inputs this driver was created with.
    pub fn env(&self) -> &TargetEnv {
        &self.env
    }

    /// Where successful builds persist stats.
    pub fn stats_paths(&self) -> &StatsPaths {
        &self.stats_paths
    }

    /// Run the bundler once over `selection`.
    ///
    /// Compilation errors are reported through
    /// [`CompiledArtifactSet::success`]. Only an environmental failure, or a
    /// bundler that skips a requested target, is returned as an error.
    pub async fn compile(&self, selection: TargetSelection) -> Result<CompiledArtifactSet> {
        let targets = self.env.targets(selection);
        let start = Instant::now();

        tracing::debug!(targets = targets.len(), "running bundler");
        let output = self.bundler.run(&targets).await?;
        let duration = start.elapsed();

        for kind in selection.kinds() {
            if !output.children.iter().any(|s| s.kind == *kind) {
                return Err(BuildError::MissingStats(*kind));
            }
        }

        let set = CompiledArtifactSet::new(selection, output.children, output.errors, duration);
        if set.success() {
            tracing::info!(
                duration_ms = duration.as_millis() as u64,
                warnings = set.warning_count(),
                "compiled successfully"
            );
        } else {
            tracing::warn!(errors = set.errors().len(), "compilation failed");
        }

        Ok(set)
    }

    /// One-shot build: compile, fail fast, persist stats on success.
    ///
    /// # Errors
    ///
    /// - [`BuildError::Bundler`] if the bundler could not run
    /// - [`BuildError::Compilation`] if any target reported errors; no stats
    ///   file is touched
    /// - [`BuildError::Persist`] if the stats files could not be written
    pub async fn build(&self, selection: TargetSelection) -> Result<CompiledArtifactSet> {
        let set = self.compile(selection).await?;

        if !set.success() {
            return Err(BuildError::Compilation {
                errors: set.errors().to_vec(),
            });
        }

        if selection.persists_stats() {
            self.stats_paths.persist(&set).await?;
        }

        Ok(set)
    }
}

impl std::fmt::Debug for CompilerDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilerDriver")
            .field("env", &self.env)
            .field("stats_paths", &self.stats_paths)
            .finish_non_exhaustive()
    }
}
