//! Router tests against a mocked secrets backend.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_json, header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vaultload_core::gateway::{DEFAULT_TIMEOUT, VaultGateway};
use vaultload_server::routes::build_router;
use vaultload_server::state::AppState;

fn app() -> Router {
    let gateway = VaultGateway::new(DEFAULT_TIMEOUT).expect("client");
    build_router(Arc::new(AppState::new(gateway)), 8)
}

async fn post(uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn health_reports_ok_with_security_headers() {
    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert_eq!(response.headers()["cache-control"], "no-store");

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_route_reports_backend_reachability() {
    let vault = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .and(header_eq("X-Vault-Token", "t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .mount(&vault)
        .await;

    let (status, body) = post(
        "/api/vault/test",
        json!({"url": vault.uri(), "token": "t1"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (status, body) = post(
        "/api/vault/test",
        json!({"url": vault.uri(), "token": "wrong"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": false}));
}

#[tokio::test]
async fn test_route_requires_url_and_token() {
    let (status, body) = post("/api/vault/test", json!({"url": "http://v"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"success": false, "error": "URL and token are required"})
    );
}

#[tokio::test]
async fn token_auth_returns_token_and_forwards_namespace() {
    let vault = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .and(header_eq("X-Vault-Namespace", "team-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(1)
        .mount(&vault)
        .await;

    let (status, body) = post(
        "/api/vault/auth/token",
        json!({"url": vault.uri(), "token": "t1", "namespace": "team-a"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "token": "t1"}));
}

#[tokio::test]
async fn token_auth_passes_backend_status_and_message_through() {
    let vault = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"errors": ["permission denied"]})),
        )
        .mount(&vault)
        .await;

    let (status, body) = post(
        "/api/vault/auth/token",
        json!({"url": vault.uri(), "token": "bad"}),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"success": false, "error": "permission denied"}));
}

#[tokio::test]
async fn approle_auth_returns_issued_token() {
    let vault = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .and(body_json(json!({"role_id": "r", "secret_id": "s"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"auth": {"client_token": "hvs.new"}})),
        )
        .mount(&vault)
        .await;

    let (status, body) = post(
        "/api/vault/auth/approle",
        json!({"url": vault.uri(), "roleId": "r", "secretId": "s"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "token": "hvs.new"}));
}

#[tokio::test]
async fn approle_success_without_token_is_bad_request() {
    let vault = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"auth": {}})))
        .mount(&vault)
        .await;

    let (status, body) = post(
        "/api/vault/auth/approle",
        json!({"url": vault.uri(), "roleId": "r", "secretId": "s"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"success": false, "error": "Authentication successful but no token received"})
    );
}

#[tokio::test]
async fn secrets_route_writes_under_normalized_path() {
    let vault = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/kv/data/app/svc"))
        .and(header_eq("X-Vault-Token", "t1"))
        .and(body_json(json!({"data": {"user": "admin", "pass": "x"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"version": 1}})))
        .expect(1)
        .mount(&vault)
        .await;

    let (status, body) = post(
        "/api/vault/secrets",
        json!({
            "url": vault.uri(),
            "token": "t1",
            "path": "kv/data/app",
            "secretName": "svc",
            "data": {"user": "admin", "pass": "x"}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
}

#[tokio::test]
async fn secrets_route_requires_every_field() {
    let (status, body) = post(
        "/api/vault/secrets",
        json!({"url": "http://v", "token": "t1", "path": "kv/data/app", "secretName": "svc"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"success": false, "error": "Missing required parameters"})
    );
}

#[tokio::test]
async fn secrets_route_reports_invalid_backend_json() {
    let vault = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/kv/data/app/svc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&vault)
        .await;

    let (status, body) = post(
        "/api/vault/secrets",
        json!({
            "url": vault.uri(),
            "token": "t1",
            "path": "app",
            "secretName": "svc",
            "data": {"k": "v"}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"success": false, "error": "Invalid JSON response: not json"})
    );
}

#[tokio::test]
async fn malformed_json_body_keeps_error_shape() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/vault/secrets")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn cors_preflight_allows_vault_headers() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/vault/secrets")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-vault-token")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    let allowed = response.headers()["access-control-allow-headers"]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed.contains("x-vault-token"));
    assert!(allowed.contains("x-vault-namespace"));
}

fn json_request(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn concurrency_limit_is_shared_across_routes() {
    let delay = Duration::from_millis(500);
    let vault = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {}}))
                .set_delay(delay),
        )
        .mount(&vault)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/kv/data/app/svc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(delay),
        )
        .mount(&vault)
        .await;

    let gateway = VaultGateway::new(DEFAULT_TIMEOUT).expect("client");
    let app = build_router(Arc::new(AppState::new(gateway)), 1);

    let test = json_request(
        "/api/vault/test",
        &json!({"url": vault.uri(), "token": "t1"}),
    );
    let write = json_request(
        "/api/vault/secrets",
        &json!({
            "url": vault.uri(),
            "token": "t1",
            "path": "kv/data/app",
            "secretName": "svc",
            "data": {"k": "v"}
        }),
    );

    let started = Instant::now();
    let (first, second) = tokio::join!(app.clone().oneshot(test), app.oneshot(write));
    let elapsed = started.elapsed();

    assert_eq!(first.unwrap().status(), StatusCode::OK);
    assert_eq!(second.unwrap().status(), StatusCode::OK);
    assert!(
        elapsed >= delay * 2 - Duration::from_millis(50),
        "calls to different routes overlapped: {elapsed:?}"
    );
}
