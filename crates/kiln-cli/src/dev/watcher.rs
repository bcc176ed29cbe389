//! File system watcher with debouncing for watch mode.
//!
//! Watches the configured source directories and filters changes to relevant
//! files, ignoring dependencies, build output and hidden paths.

use crate::error::{CliError, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Ignored in every project, on top of configured patterns.
pub const DEFAULT_IGNORES: &[&str] = &["node_modules", "dist", "*.log"];

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Recursive watcher over one or more directories of a project.
///
/// Keep it alive for as long as events are wanted; dropping it stops the
/// underlying notify watcher and closes the channel.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
    watched: Vec<PathBuf>,
}

impl FileWatcher {
    /// Watch `paths` (relative to `root`) and stream filtered changes.
    ///
    /// # Errors
    ///
    /// Returns error if none of the paths exist or the watcher cannot be
    /// created.
    pub fn new(
        root: PathBuf,
        paths: &[PathBuf],
        extra_ignores: &[String],
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        // notify reports absolute paths
        let root = root.canonicalize().unwrap_or(root);
        let watched: Vec<PathBuf> = paths
            .iter()
            .map(|p| root.join(p))
            .filter(|p| p.exists())
            .collect();

        if watched.is_empty() {
            return Err(CliError::FileNotFound(
                paths.first().map(|p| root.join(p)).unwrap_or_else(|| root.clone()),
            ));
        }

        let ignore_patterns: Vec<String> = DEFAULT_IGNORES
            .iter()
            .map(|s| s.to_string())
            .chain(extra_ignores.iter().cloned())
            .collect();

        let (tx, rx) = mpsc::channel(100);

        let debounce = Duration::from_millis(debounce_ms);
        let mut last_event: Option<(PathBuf, Instant)> = None;
        let root_clone = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "watch error");
                    return;
                }
            };

            for path in &event.paths {
                if Self::should_ignore(path, &root_clone, &ignore_patterns) {
                    continue;
                }

                let now = Instant::now();
                if let Some((last_path, last_time)) = &last_event {
                    if last_path == path && now.duration_since(*last_time) < debounce {
                        continue;
                    }
                }
                last_event = Some((path.clone(), now));

                let change = match event.kind {
                    notify::EventKind::Create(_) => FileChange::Created(path.clone()),
                    notify::EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    notify::EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };

                // Receiver gone means the dev loop shut down
                let _ = tx.blocking_send(change);
            }
        })?;

        for dir in &watched {
            watcher.watch(dir, RecursiveMode::Recursive)?;
        }

        Ok((
            Self {
                _watcher: watcher,
                root,
                watched,
            },
            rx,
        ))
    }

    /// Check if a path should be ignored.
    ///
    /// Paths outside `root` and hidden files are always ignored.
    fn should_ignore(path: &Path, root: &Path, ignore_patterns: &[String]) -> bool {
        let rel_path = match path.strip_prefix(root) {
            Ok(p) => p,
            Err(_) => return true,
        };

        let path_str = rel_path.to_string_lossy();

        for pattern in ignore_patterns {
            if let Some(ext) = pattern.strip_prefix('*') {
                if path_str.ends_with(ext) {
                    return true;
                }
            } else if rel_path
                .components()
                .any(|c| c.as_os_str().to_str() == Some(pattern.as_str()))
            {
                return true;
            }
        }

        rel_path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
        })
    }

    /// Project root the watched paths are relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directories actually being watched.
    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }
}
