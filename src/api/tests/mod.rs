use super::*;
use crate::publisher::test_helpers::create_test_publisher_with;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use std::time::Duration;
use tower::ServiceExt;


/// Test publisher behind a router built from its own (tweakable) config
async fn test_app(
    configure: impl FnOnce(&mut Config),
) -> (Router, Arc<SnapshotPublisher>, tempfile::TempDir) {
    let (publisher, _sink, temp_dir) = create_test_publisher_with(configure).await;
    let publisher = Arc::new(publisher);
    let router = create_router(publisher.clone(), publisher.get_config());
    (router, publisher, temp_dir)
}

async fn send(app: Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (_router, publisher, _temp_dir) = test_app(|_| {}).await;

    let mut config = (*publisher.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let publisher = publisher.clone();
        async move { start_api_server(publisher, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should still be serving");
    api_handle.abort();
}

#[tokio::test]
async fn test_cors_headers_for_any_origin() {
    let (app, _publisher, _temp_dir) = test_app(|c| {
        c.server.api.cors_enabled = true;
        c.server.api.cors_origins = vec!["*".into()];
    })
    .await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let (app, _publisher, _temp_dir) = test_app(|c| {
        c.server.api.cors_origins = vec!["http://dashboard.local".into()];
    })
    .await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://dashboard.local")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://dashboard.local"
    );
}

#[tokio::test]
async fn test_cors_disabled_sends_no_headers() {
    let (app, _publisher, _temp_dir) = test_app(|c| c.server.api.cors_enabled = false).await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_api_key_guards_routes_except_health() {
    let (app, _publisher, _temp_dir) =
        test_app(|c| c.server.api.api_key = Some("s3cret".into())).await;

    let response = send(app.clone(), Method::GET, "/processes", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(app.clone(), Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .uri("/processes")
        .header("X-Api-Key", "s3cret")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_swagger_ui_toggle() {
    let (app, _publisher, _temp_dir) = test_app(|c| c.server.api.swagger_ui = false).await;
    let response = send(app, Method::GET, "/swagger-ui/", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let (app, _publisher, _temp_dir) = test_app(|c| c.server.api.swagger_ui = true).await;
    let response = send(app, Method::GET, "/swagger-ui/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}
