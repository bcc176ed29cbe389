//! Shared state for the development rebuild loop.
//!
//! One [`DevState`] is shared by the rebuild task (single writer) and every
//! request (readers). The published bundle is an `Arc<BundleCache>` swapped
//! under a parking_lot lock, so a reader always sees one complete cycle.

use crate::dev::DevEvent;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Phase of the rebuild state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildPhase {
    /// No cycle has been triggered yet
    Idle,
    /// The latest triggered cycle is running
    Compiling { cycle: u64, started_at: Instant },
    /// The latest triggered cycle was published
    Ready { cycle: u64, duration_ms: u64 },
    /// The latest triggered cycle failed; the previous bundle is still served
    Failed { cycle: u64, error: String },
}

impl RebuildPhase {
    pub fn is_compiling(&self) -> bool {
        matches!(self, RebuildPhase::Compiling { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, RebuildPhase::Ready { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RebuildPhase::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// In-memory snapshot of one cycle's client output.
///
/// Maps URL paths (`/main.js`) to their content and content type.
#[derive(Debug, Clone, Default)]
pub struct BundleCache {
    files: HashMap<String, (Vec<u8>, String)>,
}

impl BundleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: String, content: Vec<u8>, content_type: String) {
        self.files.insert(path, (content, content_type));
    }

    pub fn get(&self, path: &str) -> Option<&(Vec<u8>, String)> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Outcome of [`DevState::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publication {
    /// A later cycle was triggered; nothing changed
    Discarded,
    /// Served and the machine is READY
    Ready,
}

/// Emitted once per READY transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessSignal {
    /// Externally reachable address of the server
    pub url: String,
    /// Cycle that became ready
    pub cycle: u64,
    /// Compile time of that cycle
    pub duration: Duration,
}

/// Events buffered per event-stream client before it is dropped.
pub const CLIENT_BUFFER: usize = 100;

type ReadyHandler = Box<dyn Fn(&ReadinessSignal) + Send + Sync>;

/// Connected event-stream clients.
pub type ClientRegistry = Arc<RwLock<HashMap<usize, mpsc::Sender<String>>>>;

struct Published {
    cycle: u64,
    cache: Arc<BundleCache>,
}

/// Shared rebuild state.
pub struct DevState {
    url: String,
    phase: RwLock<RebuildPhase>,
    published: RwLock<Published>,
    last_triggered: AtomicU64,
    on_ready: OnceLock<ReadyHandler>,
    clients: ClientRegistry,
    next_client_id: AtomicUsize,
    // Serializes transitions so phase and publication agree
    transition: Mutex<()>,
}

impl DevState {
    /// Create state for a server reachable at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            phase: RwLock::new(RebuildPhase::Idle),
            published: RwLock::new(Published {
                cycle: 0,
                cache: Arc::new(BundleCache::new()),
            }),
            last_triggered: AtomicU64::new(0),
            on_ready: OnceLock::new(),
            clients: Arc::new(RwLock::new(HashMap::new())),
            next_client_id: AtomicUsize::new(0),
            transition: Mutex::new(()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn phase(&self) -> RebuildPhase {
        self.phase.read().clone()
    }

    /// Start a new cycle and return its number. Numbers start at 1.
    pub fn begin_cycle(&self) -> u64 {
        let _guard = self.transition.lock();
        let cycle = self.last_triggered.fetch_add(1, Ordering::SeqCst) + 1;
        *self.phase.write() = RebuildPhase::Compiling {
            cycle,
            started_at: Instant::now(),
        };
        cycle
    }

    /// Most recently triggered cycle, 0 if none.
    pub fn last_triggered(&self) -> u64 {
        self.last_triggered.load(Ordering::SeqCst)
    }

    /// Cycle whose bundle is currently served, 0 if none.
    pub fn published_cycle(&self) -> u64 {
        self.published.read().cycle
    }

    /// The bundle currently served.
    pub fn snapshot(&self) -> Arc<BundleCache> {
        Arc::clone(&self.published.read().cache)
    }

    /// Publish a completed cycle.
    ///
    /// Only the latest triggered cycle is published. Anything older is
    /// [`Publication::Discarded`] in favor of the latest cycle's outcome,
    /// leaving the served bundle and the phase untouched. On publication the
    /// phase becomes `Ready` and the ready handler runs once.
    pub fn publish(&self, cycle: u64, cache: BundleCache, duration: Duration) -> Publication {
        let signal = {
            let _guard = self.transition.lock();
            if cycle != self.last_triggered() {
                return Publication::Discarded;
            }
            {
                let mut published = self.published.write();
                if cycle <= published.cycle {
                    return Publication::Discarded;
                }
                *published = Published {
                    cycle,
                    cache: Arc::new(cache),
                };
            }

            *self.phase.write() = RebuildPhase::Ready {
                cycle,
                duration_ms: duration.as_millis() as u64,
            };
            ReadinessSignal {
                url: self.url.clone(),
                cycle,
                duration,
            }
        };

        if let Some(handler) = self.on_ready.get() {
            handler(&signal);
        }
        Publication::Ready
    }

    /// Record a failed cycle.
    ///
    /// The served bundle never changes. The phase only moves to `Failed` if
    /// `cycle` is still the latest trigger; returns whether it did.
    pub fn fail(&self, cycle: u64, error: String) -> bool {
        let _guard = self.transition.lock();
        if cycle != self.last_triggered() {
            return false;
        }
        *self.phase.write() = RebuildPhase::Failed { cycle, error };
        true
    }

    /// Register the readiness handler.
    ///
    /// Only one handler may be registered; a second registration is refused
    /// and returns `false`.
    pub fn on_ready<F>(&self, handler: F) -> bool
    where
        F: Fn(&ReadinessSignal) + Send + Sync + 'static,
    {
        self.on_ready.set(Box::new(handler)).is_ok()
    }

    /// Register a new event-stream client.
    pub fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        self.clients.write().insert(id, tx);
        (id, rx)
    }

    pub fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Send an event to every connected client without waiting.
    ///
    /// Clients that left, or stopped reading until their buffer filled, are
    /// dropped. Their stream ends and the browser reconnects.
    pub fn broadcast(&self, event: &DevEvent) {
        let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());

        let mut failed_ids = Vec::new();
        for (id, tx) in self.clients.read().iter() {
            match tx.try_send(json.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!(client = id, "event stream client is not reading");
                    failed_ids.push(*id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => failed_ids.push(*id),
            }
        }

        for id in failed_ids {
            self.unregister_client(id);
        }
    }
}

impl std::fmt::Debug for DevState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevState")
            .field("url", &self.url)
            .field("phase", &*self.phase.read())
            .field("published_cycle", &self.published_cycle())
            .field("last_triggered", &self.last_triggered())
            .finish_non_exhaustive()
    }
}

/// Shared state handle.
pub type SharedDevState = Arc<DevState>;
