//! Build error taxonomy.
//!
//! Every variant is fatal on the one-shot build path; the caller decides how
//! that maps to a process exit. Watch mode only ever sees [`BuildError::Bundler`]
//! and [`BuildError::MissingStats`], because compilation errors are folded into
//! the [`CompiledArtifactSet`](crate::CompiledArtifactSet) there.

use crate::bundler::BundlerFailure;
use crate::target::TargetKind;
use std::path::PathBuf;

/// Errors produced by the compiler driver and stats persistence.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The bundler itself could not run (I/O, configuration, missing binary)
    #[error("{0}\n\nHint: Check that the bundler command is installed and the project configuration is valid")]
    Bundler(#[from] BundlerFailure),

    /// The bundler ran but one or more targets reported errors
    #[error("{}", .errors.join("\n"))]
    Compilation {
        /// Aggregated error messages from every target
        errors: Vec<String>,
    },

    /// The bundler finished without reporting stats for a requested target
    #[error("Bundler returned no stats for target '{0}'")]
    MissingStats(TargetKind),

    /// A stats file could not be written
    #[error("Failed to write stats file {}: {source}\n\nHint: Check output directory permissions", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Error messages for operator display, one per line.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Compilation { errors } => errors.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// Result alias for build operations.
pub type Result<T, E = BuildError> = std::result::Result<T, E>;
