//! Stats persistence.
//!
//! A successful non-static build writes one JSON document per target:
//! `<dist>/server.stats.json` and `<dist>/client.stats.json`.
//!
//! Both destinations are checked and both documents are staged as temporary
//! files in the destination directory before either is renamed into place, so
//! a failure while writing leaves the previous pair untouched. Only a failure
//! of the second rename itself (after the first succeeded) can leave a mixed
//! pair behind.

use crate::driver::CompiledArtifactSet;
use crate::error::{BuildError, Result};
use crate::target::TargetKind;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File name of the server stats document.
pub const SERVER_STATS_FILE: &str = "server.stats.json";

/// File name of the client stats document.
pub const CLIENT_STATS_FILE: &str = "client.stats.json";

/// Fixed stats locations beneath a distribution directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsPaths {
    pub server: PathBuf,
    pub client: PathBuf,
}

impl StatsPaths {
    /// Resolve the stats paths for `dist`.
    pub fn new(dist: &Path) -> Self {
        Self {
            server: dist.join(SERVER_STATS_FILE),
            client: dist.join(CLIENT_STATS_FILE),
        }
    }

    /// Path for a target, if that target has a stats file.
    pub fn for_target(&self, kind: TargetKind) -> Option<&Path> {
        match kind {
            TargetKind::Server => Some(&self.server),
            TargetKind::Client => Some(&self.client),
            TargetKind::Static => None,
        }
    }

    /// Write the server and client payloads of `set`.
    ///
    /// Fails with [`BuildError::MissingStats`] if either payload is absent and
    /// with [`BuildError::Persist`] if a destination is not writable.
    pub async fn persist(&self, set: &CompiledArtifactSet) -> Result<()> {
        let mut documents = Vec::with_capacity(2);
        for kind in [TargetKind::Server, TargetKind::Client] {
            let payload = set.stats_for(kind).ok_or(BuildError::MissingStats(kind))?;
            let path = self
                .for_target(kind)
                .map(Path::to_path_buf)
                .ok_or(BuildError::MissingStats(kind))?;
            let bytes = serde_json::to_vec(payload).map_err(|e| BuildError::Persist {
                path: path.clone(),
                source: e.into(),
            })?;
            documents.push((path, bytes));
        }

        let fallback = documents[0].0.clone();
        tokio::task::spawn_blocking(move || write_all_or_nothing(documents))
            .await
            .map_err(|e| BuildError::Persist {
                path: fallback,
                source: std::io::Error::other(e),
            })?
    }
}

fn write_all_or_nothing(documents: Vec<(PathBuf, Vec<u8>)>) -> Result<()> {
    for (path, _) in &documents {
        check_destination(path)?;
    }

    let mut staged = Vec::with_capacity(documents.len());

    for (path, bytes) in documents {
        let persist_err = |source| BuildError::Persist {
            path: path.clone(),
            source,
        };
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(persist_err)?;

        let mut file = NamedTempFile::new_in(dir).map_err(persist_err)?;
        file.write_all(&bytes).map_err(persist_err)?;
        file.as_file().sync_all().map_err(persist_err)?;
        staged.push((path, file));
    }

    for (path, file) in staged {
        file.persist(&path).map_err(|e| BuildError::Persist {
            path: path.clone(),
            source: e.error,
        })?;
        tracing::debug!(path = %path.display(), "wrote stats file");
    }

    Ok(())
}

/// A rename can only replace a regular file (or nothing).
fn check_destination(path: &Path) -> Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => Err(BuildError::Persist {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::IsADirectory,
                "destination is a directory",
            ),
        }),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(BuildError::Persist {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::TargetStats;
    use crate::target::TargetSelection;
    use serde_json::json;
    use std::time::Duration;

    fn app_set(server: serde_json::Value, client: serde_json::Value) -> CompiledArtifactSet {
        CompiledArtifactSet::new(
            TargetSelection::App,
            vec![
                TargetStats::new(TargetKind::Server, server),
                TargetStats::new(TargetKind::Client, client),
            ],
            Vec::new(),
            Duration::from_millis(5),
        )
    }

    #[test]
    fn test_paths_under_dist() {
        let paths = StatsPaths::new(Path::new("/app/dist"));
        assert_eq!(paths.server, PathBuf::from("/app/dist/server.stats.json"));
        assert_eq!(paths.client, PathBuf::from("/app/dist/client.stats.json"));
        assert!(paths.for_target(TargetKind::Static).is_none());
    }

    #[tokio::test]
    async fn test_persist_writes_both_documents() {
        let temp = tempfile::TempDir::new().unwrap();
        let paths = StatsPaths::new(temp.path());

        paths
            .persist(&app_set(json!({"hash": "s"}), json!({"hash": "c"})))
            .await
            .unwrap();

        let server: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&paths.server).unwrap()).unwrap();
        let client: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&paths.client).unwrap()).unwrap();
        assert_eq!(server, json!({"hash": "s"}));
        assert_eq!(client, json!({"hash": "c"}));
    }

    #[tokio::test]
    async fn test_missing_client_payload_writes_nothing() {
        let temp = tempfile::TempDir::new().unwrap();
        let paths = StatsPaths::new(temp.path());
        let set = CompiledArtifactSet::new(
            TargetSelection::App,
            vec![TargetStats::new(TargetKind::Server, json!({}))],
            Vec::new(),
            Duration::ZERO,
        );

        let err = paths.persist(&set).await.unwrap_err();
        assert!(matches!(err, BuildError::MissingStats(TargetKind::Client)));
        assert!(!paths.server.exists());
        assert!(!paths.client.exists());
    }

    #[tokio::test]
    async fn test_blocked_client_destination_keeps_previous_server_stats() {
        let temp = tempfile::TempDir::new().unwrap();
        let paths = StatsPaths::new(temp.path());
        std::fs::write(&paths.server, r#"{"v":1}"#).unwrap();
        std::fs::create_dir(&paths.client).unwrap();

        let err = paths
            .persist(&app_set(json!({"v": 2}), json!({"v": 2})))
            .await
            .unwrap_err();

        match err {
            BuildError::Persist { path, .. } => assert_eq!(path, paths.client),
            other => panic!("unexpected error: {other}"),
        }
        let server: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&paths.server).unwrap()).unwrap();
        assert_eq!(server, json!({"v": 1}));
        assert!(paths.client.is_dir());

        // no staged temp files left behind
        let entries = std::fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(entries, 2);
    }
}
