//! Watch-mode rebuild cycles.
//!
//! Each trigger compiles the application targets through the same
//! [`CompilerDriver`] the one-shot build uses, snapshots the client output
//! into memory and hands the result to [`DevState`], which decides whether
//! the cycle is still the latest one. Compilation errors never end the
//! process; they are reported and the previous bundle keeps being served.
//!
//! Every cycle writes the same output directory, so at most one bundler run
//! is in flight. Triggers that arrive while it runs wait their turn, and
//! only the latest of them compiles; the others are folded into it.

use crate::dev::state::{BundleCache, Publication, ReadinessSignal, SharedDevState};
use crate::dev::{DevEvent, DevLogLevel, DevOptions, FileChange};
use crate::ui;
use kiln_build::{CompiledArtifactSet, CompilerDriver, TargetSelection};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use walkdir::WalkDir;

/// Files larger than this are left out of the in-memory bundle.
const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Rebuild driver shared by the watcher loop and the request pipeline.
#[derive(Clone)]
pub struct DevRebuild {
    driver: CompilerDriver,
    state: SharedDevState,
    options: Arc<DevOptions>,
    client_dir: PathBuf,
    // Held from compile through snapshot
    compiling: Arc<Mutex<()>>,
}

impl DevRebuild {
    /// Create a rebuild driver serving the client target's output directory.
    pub fn new(driver: CompilerDriver, state: SharedDevState, options: DevOptions) -> Self {
        let client_dir = driver.env().client().output.path;
        Self {
            driver,
            state,
            options: Arc::new(options),
            client_dir,
            compiling: Arc::new(Mutex::new(())),
        }
    }

    pub fn state(&self) -> &SharedDevState {
        &self.state
    }

    pub fn options(&self) -> &DevOptions {
        &self.options
    }

    /// Directory snapshotted after each successful cycle.
    pub fn client_dir(&self) -> &Path {
        &self.client_dir
    }

    /// Register the readiness handler. See [`crate::dev::DevState::on_ready`].
    pub fn on_ready<F>(&self, handler: F) -> bool
    where
        F: Fn(&ReadinessSignal) + Send + Sync + 'static,
    {
        self.state.on_ready(handler)
    }

    /// Start a new cycle in the background.
    ///
    /// The cycle number is taken before this returns, so the order of
    /// `trigger` calls is the order that decides which result is served.
    pub fn trigger(&self) -> JoinHandle<()> {
        let cycle = self.state.begin_cycle();
        tracing::debug!(cycle, "rebuild triggered");
        self.state.broadcast(&DevEvent::BuildStarted { cycle });

        let this = self.clone();
        tokio::spawn(async move { this.run_cycle(cycle).await })
    }

    /// Trigger a cycle for every change until the channel closes.
    pub fn watch(self, mut changes: mpsc::Receiver<FileChange>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(change) = changes.recv().await {
                if self.options.log_level.allows(DevLogLevel::Info) {
                    ui::info(&format!("File changed: {}", change.path().display()));
                }
                self.trigger();
            }
            tracing::debug!("watch channel closed");
        })
    }

    async fn run_cycle(&self, cycle: u64) {
        let _running = self.compiling.lock().await;
        if cycle != self.state.last_triggered() {
            tracing::debug!(
                cycle,
                latest = self.state.last_triggered(),
                "folded into a later cycle"
            );
            return;
        }

        let outcome = match self.driver.compile(TargetSelection::App).await {
            Ok(set) if set.success() => match snapshot_dir(self.client_dir.clone()).await {
                Ok(cache) => Ok((set, cache)),
                Err(e) => Err(vec![format!(
                    "Failed to read client output {}: {}",
                    self.client_dir.display(),
                    e
                )]),
            },
            Ok(set) => Err(set.errors().to_vec()),
            Err(e) => Err(e.messages()),
        };

        match outcome {
            Ok((set, cache)) => self.complete(cycle, set, cache),
            Err(errors) => self.fail(cycle, errors),
        }
    }

    fn complete(&self, cycle: u64, set: CompiledArtifactSet, cache: BundleCache) {
        let files = cache.len();
        match self.state.publish(cycle, cache, set.duration()) {
            Publication::Discarded => {
                tracing::debug!(cycle, files, "discarding superseded cycle");
            }
            Publication::Ready => {
                let duration_ms = set.duration().as_millis() as u64;
                self.report_success(&set, files);
                self.state
                    .broadcast(&DevEvent::BuildCompleted { cycle, duration_ms });
            }
        }
    }

    fn fail(&self, cycle: u64, errors: Vec<String>) {
        let error = errors.join("\n");
        if !self.state.fail(cycle, error.clone()) {
            tracing::debug!(cycle, "discarding superseded failure");
            return;
        }

        tracing::warn!(cycle, errors = errors.len(), "rebuild failed");
        if self.options.log_level.allows(DevLogLevel::Error) {
            ui::error(&format!("Rebuild failed:\n{}", error));
        }
        self.state.broadcast(&DevEvent::BuildFailed { cycle, error });
    }

    fn report_success(&self, set: &CompiledArtifactSet, files: usize) {
        let level = self.options.log_level;
        if level.allows(DevLogLevel::Info) {
            ui::success(&format!(
                "Compiled in {} ({} files in memory)",
                ui::format_duration(set.duration()),
                files
            ));
        }
        if set.warning_count() > 0 && level.allows(DevLogLevel::Warn) {
            ui::warning(&format!("{} warning(s)", set.warning_count()));
        }
        if self.options.stats && level.allows(DevLogLevel::Info) {
            for stats in set.stats() {
                let assets = stats
                    .payload
                    .get("assets")
                    .and_then(|a| a.as_array())
                    .map_or(0, Vec::len);
                ui::info(&format!(
                    "{}: {} asset(s), {} warning(s)",
                    stats.kind,
                    assets,
                    stats.warning_count()
                ));
            }
        }
    }
}

impl std::fmt::Debug for DevRebuild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevRebuild")
            .field("client_dir", &self.client_dir)
            .field("options", &self.options)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Load every file under `dir` into a [`BundleCache`] keyed by URL path.
///
/// A missing directory yields an empty cache.
pub async fn snapshot_dir(dir: PathBuf) -> std::io::Result<BundleCache> {
    tokio::task::spawn_blocking(move || snapshot_dir_blocking(&dir))
        .await
        .map_err(std::io::Error::other)?
}

fn snapshot_dir_blocking(dir: &Path) -> std::io::Result<BundleCache> {
    let mut cache = BundleCache::new();
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "client output directory missing");
        return Ok(cache);
    }

    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let len = entry.metadata().map_err(std::io::Error::other)?.len();
        if len > MAX_FILE_SIZE {
            tracing::warn!(path = %entry.path().display(), bytes = len, "skipping large file");
            continue;
        }

        let rel = match entry.path().strip_prefix(dir) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let url_path = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .fold(String::new(), |mut acc, part| {
                acc.push('/');
                acc.push_str(&part);
                acc
            });

        let content = std::fs::read(entry.path())?;
        cache.insert(url_path.clone(), content, content_type(&url_path).to_string());
    }

    Ok(cache)
}

/// Determine content type from file extension.
pub(crate) fn content_type(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "eot" => "application/vnd.ms-fontobject",
        "wasm" => "application/wasm",
        "gz" => "application/gzip",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_snapshot_dir_keys_by_url_path() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("assets/css")).unwrap();
        std::fs::write(dir.path().join("main.js"), "console.log(1)").unwrap();
        std::fs::write(dir.path().join("assets/css/app.css"), "body{}").unwrap();

        let cache = snapshot_dir(dir.path().to_path_buf()).await.unwrap();
        assert_eq!(cache.len(), 2);

        let (body, content_type) = cache.get("/main.js").unwrap();
        assert_eq!(body, b"console.log(1)");
        assert_eq!(content_type, "application/javascript");
        assert_eq!(cache.get("/assets/css/app.css").unwrap().1, "text/css");
    }

    #[tokio::test]
    async fn test_snapshot_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = snapshot_dir(dir.path().join("nope")).await.unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("/a.js"), "application/javascript");
        assert_eq!(content_type("/a.js.map"), "application/json");
        assert_eq!(content_type("/fonts/a.woff2"), "font/woff2");
        assert_eq!(content_type("/unknown.bin"), "application/octet-stream");
    }
}
