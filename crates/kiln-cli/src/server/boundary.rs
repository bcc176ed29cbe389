//! Error boundary for the request pipeline.
//!
//! Everything below the boundary may fail in two ways: a handler returns a
//! [`PipelineError`], or it panics. Both end up here exactly once, are
//! logged, and turn into the same opaque 500 response.

use axum::{
    body::Body,
    extract::Request,
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use thiserror::Error;

/// Body of every response produced by the boundary.
pub const GENERIC_ERROR_BODY: &str = "There was an error. Please try again later.";

/// Failure raised by a handler inside the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

impl PipelineError {
    pub fn internal(message: impl Into<String>) -> Self {
        PipelineError::Internal(message.into())
    }
}

/// Marker left on a response by [`PipelineError::into_response`].
///
/// Holds the internal message for logging; it never reaches the client.
#[derive(Debug, Clone)]
struct HandlerFailure(String);

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response
            .extensions_mut()
            .insert(HandlerFailure(self.to_string()));
        response
    }
}

/// Middleware catching handler errors and panics from everything it wraps.
pub async fn error_boundary(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => match response.extensions().get::<HandlerFailure>() {
            Some(HandlerFailure(message)) => {
                tracing::error!(%method, %uri, error = %message, "request failed");
                generic_error()
            }
            None => response,
        },
        Err(panic) => {
            tracing::error!(
                %method,
                %uri,
                panic = panic_message(panic.as_ref()),
                "request handler panicked"
            );
            generic_error()
        }
    }
}

fn generic_error() -> Response {
    let mut response = Response::new(Body::from(GENERIC_ERROR_BODY));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
