//! Static asset resolution across an ordered list of roots.
//!
//! Each root is probed in turn with tower-http's `ServeDir`; the first root
//! holding a regular file answers. Anything that is not found (missing file,
//! directory, traversal attempt, dot-file, unreadable file) moves on to the
//! next root, and after the last root the request continues down the
//! pipeline. The chain never answers 404 itself.

use crate::config::AppConfig;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{self, HeaderMap, HeaderValue, Method, StatusCode, Uri, Version, header},
    middleware::Next,
    response::Response,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;

/// Cache policy for already-built, content-hashed output.
pub const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";

/// Cache policy for developer-editable files.
pub const REVALIDATE_CACHE: &str = "public, max-age=0";

/// Where a root's files come from, which decides how they may be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    /// Bundler output; never changes under a given name
    Built,
    /// Checked-in files; may change at any time
    Source,
}

impl RootKind {
    pub fn cache_control(self) -> &'static str {
        match self {
            RootKind::Built => IMMUTABLE_CACHE,
            RootKind::Source => REVALIDATE_CACHE,
        }
    }
}

/// One directory in the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticRoot {
    pub dir: PathBuf,
    pub kind: RootKind,
}

impl StaticRoot {
    pub fn built(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            kind: RootKind::Built,
        }
    }

    pub fn source(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            kind: RootKind::Source,
        }
    }
}

/// The roots for a configuration: built output first, and only in production.
pub fn static_roots(config: &AppConfig) -> Vec<StaticRoot> {
    let mut roots = Vec::with_capacity(2);
    if config.is_production() {
        roots.push(StaticRoot::built(config.built_public_dir()));
    }
    roots.push(StaticRoot::source(config.source_public_dir()));
    roots
}

/// Ordered, immutable list of roots with a file server for each.
#[derive(Clone)]
pub struct StaticChain {
    roots: Arc<[(StaticRoot, ServeDir)]>,
}

impl StaticChain {
    pub fn new(roots: Vec<StaticRoot>) -> Self {
        let roots = roots
            .into_iter()
            .map(|root| {
                if !root.dir.is_dir() {
                    tracing::debug!(root = %root.dir.display(), "static root does not exist");
                }
                let serve = ServeDir::new(&root.dir)
                    .append_index_html_on_directories(false)
                    .precompressed_gzip();
                (root, serve)
            })
            .collect();
        Self { roots }
    }

    pub fn roots(&self) -> impl Iterator<Item = &StaticRoot> {
        self.roots.iter().map(|(root, _)| root)
    }

    /// Serve the request from the first root that has it, or `None` to pass
    /// it on.
    pub async fn resolve(&self, head: RequestHead) -> Option<Response> {
        if !is_eligible(&head.method, head.uri.path()) {
            return None;
        }

        for (root, serve) in self.roots.iter() {
            let mut serve = serve.clone();
            match serve.try_call(head.to_request()).await {
                Ok(response) if response.status() == StatusCode::NOT_FOUND => continue,
                Ok(response) => {
                    tracing::debug!(
                        path = head.uri.path(),
                        root = %root.dir.display(),
                        status = response.status().as_u16(),
                        "served static file"
                    );
                    let mut response = response.map(Body::new);
                    response.headers_mut().insert(
                        header::CACHE_CONTROL,
                        HeaderValue::from_static(root.kind.cache_control()),
                    );
                    return Some(response);
                }
                Err(e) => {
                    tracing::debug!(
                        path = head.uri.path(),
                        root = %root.dir.display(),
                        error = %e,
                        "static lookup failed"
                    );
                    continue;
                }
            }
        }

        None
    }
}

impl std::fmt::Debug for StaticChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.roots()).finish()
    }
}

/// Middleware form of [`StaticChain::resolve`].
pub async fn static_files(State(chain): State<StaticChain>, req: Request, next: Next) -> Response {
    let head = RequestHead::of(&req);
    match chain.resolve(head).await {
        Some(response) => response,
        None => next.run(req).await,
    }
}

fn is_eligible(method: &Method, path: &str) -> bool {
    if method != Method::GET && method != Method::HEAD {
        return false;
    }
    if path == "/" {
        return false;
    }
    !path.split('/').any(is_hidden_segment)
}

fn is_hidden_segment(segment: &str) -> bool {
    segment.starts_with('.')
        || segment
            .get(..3)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("%2e"))
}

/// The parts of a request a root lookup needs, detached from its body.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
}

impl RequestHead {
    pub fn of<B>(req: &http::Request<B>) -> Self {
        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
            version: req.version(),
            headers: req.headers().clone(),
        }
    }

    /// Body-less request for probing one root.
    fn to_request(&self) -> Request {
        let mut probe = Request::new(Body::empty());
        *probe.method_mut() = self.method.clone();
        *probe.uri_mut() = self.uri.clone();
        *probe.version_mut() = self.version;
        *probe.headers_mut() = self.headers.clone();
        probe
    }
}
