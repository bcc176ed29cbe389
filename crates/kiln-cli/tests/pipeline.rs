//! Request pipeline behaviour, end to end through the assembled router.

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
    response::Response,
    routing::get,
};
use kiln_cli::server::{
    GENERIC_ERROR_BODY, Pipeline, PipelineError, StaticRoot,
    static_files::{IMMUTABLE_CACHE, REVALIDATE_CACHE},
};
use std::fs;
use tempfile::TempDir;
use tower::ServiceExt;

fn request(method: Method, path: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::ORIGIN, "http://elsewhere.test")
        .body(Body::empty())
        .unwrap()
}

fn get_request(path: &str) -> Request<Body> {
    request(Method::GET, path)
}

async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn allow_origin(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .and_then(|v| v.to_str().ok())
}

async fn failing_handler() -> Result<&'static str, PipelineError> {
    Err(PipelineError::internal("boom"))
}

async fn panicking_handler() -> &'static str {
    panic!("boom")
}

fn failing_routes() -> Router {
    Router::new()
        .route("/fail", get(failing_handler))
        .route("/panic", get(panicking_handler))
}

/// Two roots, `a` probed before `b`.
fn two_roots() -> (TempDir, StaticRoot, StaticRoot) {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::create_dir_all(&a).unwrap();
    fs::create_dir_all(b.join("img")).unwrap();

    fs::write(a.join("shared.txt"), "from a").unwrap();
    fs::write(b.join("shared.txt"), "from b").unwrap();
    fs::write(b.join("only-b.txt"), "only in b").unwrap();
    fs::write(b.join("img/logo.svg"), "<svg/>").unwrap();

    (dir, StaticRoot::built(a), StaticRoot::source(b))
}

#[tokio::test]
async fn test_ping() {
    let app = Pipeline::new(vec![]).into_router();
    let response = app.oneshot(get_request("/ping")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "pong");
}

#[tokio::test]
async fn test_favicon_is_no_content() {
    let app = Pipeline::new(vec![]).into_router();
    let response = app.oneshot(get_request("/favicon.ico")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(body_string(response).await.is_empty());
}

#[tokio::test]
async fn test_handler_error_does_not_leak_message() {
    let app = Pipeline::new(vec![])
        .with_routes(failing_routes())
        .into_router();
    let response = app.oneshot(get_request("/fail")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(response).await;
    assert_eq!(body, GENERIC_ERROR_BODY);
    assert!(!body.contains("boom"));
}

#[tokio::test]
async fn test_cors_headers_on_boundary_500() {
    let app = Pipeline::new(vec![])
        .with_routes(failing_routes())
        .into_router();

    for path in ["/fail", "/panic"] {
        let response = app.clone().oneshot(get_request(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(allow_origin(response.headers()), Some("*"));
        assert!(!body_string(response).await.contains("boom"));
    }
}

#[tokio::test]
async fn test_cors_headers_on_404_and_200() {
    let app = Pipeline::new(vec![]).into_router();

    let response = app.clone().oneshot(get_request("/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(allow_origin(response.headers()), Some("*"));

    let response = app.oneshot(get_request("/ping")).await.unwrap();
    assert_eq!(allow_origin(response.headers()), Some("*"));
}

#[tokio::test]
async fn test_cors_preflight_lists_methods() {
    let app = Pipeline::new(vec![]).into_router();
    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/ping")
        .header(header::ORIGIN, "http://elsewhere.test")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(preflight).await.unwrap();
    let methods = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    for method in ["GET", "HEAD", "PUT", "POST", "DELETE", "PATCH"] {
        assert!(methods.contains(method), "missing {method} in {methods}");
    }
}

#[tokio::test]
async fn test_static_fallback_reaches_second_root() {
    let (_dir, a, b) = two_roots();
    let app = Pipeline::new(vec![a, b]).into_router();

    let response = app.oneshot(get_request("/only-b.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "only in b");
}

#[tokio::test]
async fn test_static_first_root_wins() {
    let (_dir, a, b) = two_roots();
    let app = Pipeline::new(vec![a, b]).into_router();

    let response = app.oneshot(get_request("/shared.txt")).await.unwrap();
    assert_eq!(body_string(response).await, "from a");
}

#[tokio::test]
async fn test_static_miss_reaches_router() {
    let (_dir, a, b) = two_roots();
    let app = Pipeline::new(vec![a, b]).into_router();

    let response = app.clone().oneshot(get_request("/nowhere.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let catch_all = Router::new().fallback(|| async { "app shell" });
    let (_dir, a, b) = two_roots();
    let app = Pipeline::new(vec![a, b]).with_routes(catch_all).into_router();
    let response = app.oneshot(get_request("/nowhere.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "app shell");
}

#[tokio::test]
async fn test_root_path_is_never_static() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("index.html"), "<h1>static</h1>").unwrap();

    let app = Pipeline::new(vec![StaticRoot::source(dir.path())])
        .with_routes(Router::new().route("/", get(|| async { "rendered" })))
        .into_router();

    let response = app.oneshot(get_request("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "rendered");
}

#[tokio::test]
async fn test_directories_and_dotfiles_pass_through() {
    let (dir, a, b) = two_roots();
    fs::write(dir.path().join("b/.env"), "SECRET=1").unwrap();
    let app = Pipeline::new(vec![a, b]).into_router();

    for path in ["/img", "/img/", "/.env", "/%2eenv", "/../b/only-b.txt"] {
        let response = app.clone().oneshot(get_request(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "path {path}");
        assert!(!body_string(response).await.contains("SECRET"));
    }
}

#[tokio::test]
async fn test_static_only_answers_reads() {
    let (_dir, a, b) = two_roots();
    let app = Pipeline::new(vec![a, b]).into_router();

    let response = app.oneshot(request(Method::POST, "/only-b.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cache_policy_per_root_kind() {
    let (_dir, a, b) = two_roots();
    let app = Pipeline::new(vec![a, b]).into_router();

    let built = app.clone().oneshot(get_request("/shared.txt")).await.unwrap();
    assert_eq!(
        built.headers().get(header::CACHE_CONTROL).unwrap(),
        IMMUTABLE_CACHE
    );

    let source = app.oneshot(get_request("/only-b.txt")).await.unwrap();
    let cache_control = source
        .headers()
        .get(header::CACHE_CONTROL)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(cache_control, REVALIDATE_CACHE);
    assert!(!cache_control.contains("immutable"));
}

#[tokio::test]
async fn test_static_sets_content_headers() {
    let (_dir, a, b) = two_roots();
    let app = Pipeline::new(vec![a, b]).into_router();

    let response = app.oneshot(get_request("/img/logo.svg")).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "image/svg+xml");
    assert_eq!(headers.get(header::CONTENT_LENGTH).unwrap(), "6");
    assert!(headers.get(header::LAST_MODIFIED).is_some());
}

#[tokio::test]
async fn test_precompressed_gzip_is_preferred() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.js"), "plain").unwrap();
    fs::write(dir.path().join("main.js.gz"), "gzipped-bytes").unwrap();
    let app = Pipeline::new(vec![StaticRoot::built(dir.path())]).into_router();

    let req = Request::builder()
        .uri("/main.js")
        .header(header::ACCEPT_ENCODING, "gzip")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.headers().get(header::CONTENT_ENCODING).unwrap(), "gzip");
    assert_eq!(body_string(response).await, "gzipped-bytes");
}
