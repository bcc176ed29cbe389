//! HTTP request pipeline.
//!
//! The order is fixed when the pipeline is built and never changes:
//!
//! 1. CORS headers, on every response including errors
//! 2. Error boundary ([`boundary`])
//! 3. Static fallback chain ([`static_files`])
//! 4. Dev rebuild middleware, development only ([`crate::dev`])
//! 5. Router ([`router`])

pub mod boundary;
pub mod router;
pub mod static_files;

pub use boundary::{GENERIC_ERROR_BODY, PipelineError, error_boundary};
pub use router::routes;
pub use static_files::{RequestHead, RootKind, StaticChain, StaticRoot, static_roots};

use crate::config::AppConfig;
use crate::dev::{DevRebuild, dev_middleware};
use crate::error::{CliError, Result};
use axum::{Router, http::Method, middleware};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Methods advertised to cross-origin callers.
pub const CORS_METHODS: [Method; 6] = [
    Method::GET,
    Method::HEAD,
    Method::PUT,
    Method::POST,
    Method::DELETE,
    Method::PATCH,
];

/// Any origin, the standard method set.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(CORS_METHODS)
}

/// Assembles the request pipeline.
#[derive(Debug, Default)]
pub struct Pipeline {
    roots: Vec<StaticRoot>,
    dev: Option<DevRebuild>,
    app_routes: Option<Router>,
}

impl Pipeline {
    /// Pipeline serving static files from `roots`, in order.
    pub fn new(roots: Vec<StaticRoot>) -> Self {
        Self {
            roots,
            dev: None,
            app_routes: None,
        }
    }

    /// Pipeline with the static roots implied by `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(static_roots(config))
    }

    /// Insert the dev rebuild middleware between static files and the router.
    pub fn with_dev(mut self, dev: DevRebuild) -> Self {
        self.dev = Some(dev);
        self
    }

    /// Merge application routes into the router stage.
    pub fn with_routes(mut self, routes: Router) -> Self {
        self.app_routes = Some(routes);
        self
    }

    /// Build the service. Later `layer` calls wrap earlier ones, so the
    /// stages are applied innermost first.
    pub fn into_router(self) -> Router {
        let mut app = routes(self.app_routes);

        if let Some(dev) = self.dev {
            app = app.layer(middleware::from_fn_with_state(dev, dev_middleware));
        }

        app.layer(middleware::from_fn_with_state(
            StaticChain::new(self.roots),
            static_files::static_files,
        ))
        .layer(middleware::from_fn(error_boundary))
        .layer(cors_layer())
    }
}

/// Bind the listening socket.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| CliError::Server(format!("Failed to bind to {}: {}", addr, e)))
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "listening");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| CliError::Server(format!("Server error: {}", e)))
}
