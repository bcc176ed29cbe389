//! Development rebuild integration.
//!
//! Provides the watch-mode half of the pipeline:
//! - Rebuild cycles driven by file changes, with supersession
//! - The last successful client bundle held in memory
//! - A Server-Sent-Events stream announcing each cycle
//! - A single readiness hook fired on every READY transition

pub mod middleware;
pub mod options;
pub mod rebuild;
pub mod state;
pub mod watcher;

pub use middleware::{EVENTS_PATH, dev_middleware};
pub use options::{DevLogLevel, DevOptions, DevOptionsOverlay};
pub use rebuild::{DevRebuild, snapshot_dir};
pub use state::{
    BundleCache, CLIENT_BUFFER, DevState, Publication, ReadinessSignal, RebuildPhase,
    SharedDevState,
};
pub use watcher::{FileChange, FileWatcher};

use serde::{Deserialize, Serialize};

/// Events pushed to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DevEvent {
    /// A cycle was triggered
    BuildStarted { cycle: u64 },

    /// A cycle was published
    BuildCompleted { cycle: u64, duration_ms: u64 },

    /// The latest cycle failed
    BuildFailed { cycle: u64, error: String },
}
