//! Request-side half of the dev rebuild integration.
//!
//! Sits between the static chain and the router. Serves the event stream and
//! the most recently published client bundle from memory; everything else
//! goes on to the router.

use crate::dev::{DevEvent, DevRebuild};
use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{
        IntoResponse, Response, Sse,
        sse::{Event, KeepAlive},
    },
};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};

/// Server-Sent-Events endpoint announcing rebuild cycles.
pub const EVENTS_PATH: &str = "/__kiln/events";

/// Serve from the published bundle, or pass the request on.
pub async fn dev_middleware(State(dev): State<DevRebuild>, req: Request, next: Next) -> Response {
    let is_read = req.method() == Method::GET || req.method() == Method::HEAD;
    if !is_read {
        return next.run(req).await;
    }

    if req.uri().path() == EVENTS_PATH {
        return events(&dev).await;
    }

    // Whatever cycle is published now is served whole, even mid-compile
    let bundle = dev.state().snapshot();
    let hit = dev
        .options()
        .bundle_path(req.uri().path())
        .and_then(|path| bundle.get(path))
        .cloned();

    match hit {
        Some((content, content_type)) => {
            let body = if req.method() == Method::HEAD {
                Body::empty()
            } else {
                Body::from(content)
            };
            let mut response = Response::new(body);
            *response.status_mut() = StatusCode::OK;
            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&content_type) {
                headers.insert(header::CONTENT_TYPE, value);
            }
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            response
        }
        None => next.run(req).await,
    }
}

async fn events(dev: &DevRebuild) -> Response {
    let state = dev.state();
    let (id, rx) = state.register_client();
    tracing::debug!(client = id, "event stream connected");

    // Late subscribers learn the current cycle right away
    let greeting = match state.phase() {
        crate::dev::RebuildPhase::Ready { cycle, duration_ms } => {
            Some(DevEvent::BuildCompleted { cycle, duration_ms })
        }
        crate::dev::RebuildPhase::Compiling { cycle, .. } => Some(DevEvent::BuildStarted { cycle }),
        crate::dev::RebuildPhase::Failed { cycle, error } => {
            Some(DevEvent::BuildFailed { cycle, error })
        }
        crate::dev::RebuildPhase::Idle => None,
    }
    .and_then(|event| serde_json::to_string(&event).ok());

    let initial = tokio_stream::iter(greeting);
    let stream = initial
        .chain(ReceiverStream::new(rx))
        .map(|data| Ok::<_, Infallible>(Event::default().data(data)));

    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("ping"),
        )
        .into_response()
}
