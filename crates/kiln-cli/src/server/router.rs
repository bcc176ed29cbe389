//! Innermost pipeline stage: the application router.

use axum::{Router, http::StatusCode, routing::get};

/// Liveness probe.
pub async fn ping() -> &'static str {
    "pong"
}

/// Browsers ask for this on every page; answer without a body.
pub async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Built-in routes, with the host application's routes merged in.
///
/// Unmatched paths get axum's default 404.
pub fn routes(app_routes: Option<Router>) -> Router {
    let base = Router::new()
        .route("/ping", get(ping))
        .route("/favicon.ico", get(favicon));

    match app_routes {
        Some(app) => base.merge(app),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::Request};
    use tower::ServiceExt;

    fn get_request(path: &str) -> Request {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let response = routes(None).oneshot(get_request("/ping")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"pong");
    }

    #[tokio::test]
    async fn test_favicon_is_empty() {
        let response = routes(None)
            .oneshot(get_request("/favicon.ico"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_unmatched_is_404() {
        let response = routes(None).oneshot(get_request("/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_app_routes_are_merged() {
        let app = Router::new().route("/hello", get(|| async { "world" }));
        let response = routes(Some(app))
            .oneshot(get_request("/hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
