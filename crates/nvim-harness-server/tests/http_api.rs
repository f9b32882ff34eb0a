// Test module - relaxed lint rules
#![allow(clippy::indexing_slicing)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(missing_docs)]

//! Router tests driven through `tower::ServiceExt::oneshot`.
//!
//! `/bin/sh` stands in for the editor: it prints the opened file, which for
//! the initial file is the readiness sentinel, then echoes input via `cat`.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use nvim_harness::bootstrap::BootstrapService;
use nvim_harness::fixtures::{FixtureKey, READY_SENTINEL};
use nvim_harness_fixtures::{test_environment, ConfigBuilder};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app(env: &tempfile::TempDir) -> Router {
    let config = ConfigBuilder::new(env.path())
        .with_editor("/bin/sh")
        .with_args(vec!["-c".to_string(), "cat \"$0\"; exec cat".to_string()])
        .with_readiness_timeout_ms(5_000)
        .build();
    let service = BootstrapService::new(config).unwrap();
    nvim_harness_server::router(Arc::new(service))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn call_raw(app: &Router, method: Method, uri: &str, body: &'static str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// =============================================================================
// Basics
// =============================================================================

#[tokio::test]
async fn health_reports_ok() {
    let env = test_environment("http-health");
    let (status, body) = call(&app(&env), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn no_session_reports_terminated() {
    let env = test_environment("http-idle");
    let app = app(&env);

    let (status, body) = call(&app, Method::GET, "/sessions/current", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "terminated");

    let (status, body) = call(&app, Method::GET, "/sessions/current/screen", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "SessionTerminated");
    assert_eq!(body["code"], "E_SESSION_TERMINATED");
}

// =============================================================================
// Test directories
// =============================================================================

#[tokio::test]
async fn creating_a_test_directory_returns_its_contents() {
    let env = test_environment("http-provision");
    let (status, body) = call(
        &app(&env),
        Method::POST,
        "/test-directories",
        Some(json!({ "filename": "subdirectory/sub.txt" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let root = body["rootPath"].as_str().unwrap();
    assert!(std::path::Path::new(root).join("subdirectory/sub.txt").is_file());
    assert!(body["rootPathRelativeToTestEnvironmentDir"]
        .as_str()
        .unwrap()
        .starts_with("testdirs"));
    let contents = body["contents"].as_object().unwrap();
    assert_eq!(contents["subdirectory/sub.txt"]["name"], "sub.txt");
    assert_eq!(contents["subdirectory/sub.txt"]["stem"], "sub");
    assert_eq!(contents["subdirectory/sub.txt"]["extension"], ".txt");
    assert!(contents.contains_key("subdirectory"));
    assert!(!contents.contains_key("file.txt"));
}

#[tokio::test]
async fn empty_body_provisions_the_full_catalog() {
    let env = test_environment("http-provision-all");
    let (status, body) = call(&app(&env), Method::POST, "/test-directories", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contents"].as_object().unwrap().len(), FixtureKey::ALL.len());
}

#[tokio::test]
async fn unknown_fixture_key_is_a_bad_request() {
    let env = test_environment("http-unknown-key");
    let (status, body) = call(
        &app(&env),
        Method::POST,
        "/sessions",
        Some(json!({ "filename": "does-not-exist.txt" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "UnknownFixtureKey");
    assert_eq!(body["context"]["received"], "does-not-exist.txt");
    assert!(!env.path().join("testdirs").exists());
}

#[tokio::test]
async fn unknown_modification_is_a_bad_request() {
    let env = test_environment("http-unknown-mod");
    let (status, body) = call(
        &app(&env),
        Method::POST,
        "/sessions",
        Some(json!({ "startupScriptModifications": ["make_it_fast.lua"] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "UnknownModification");
}

#[tokio::test]
async fn malformed_json_is_a_protocol_error() {
    let env = test_environment("http-malformed");
    let (status, body) = call_raw(&app(&env), Method::POST, "/sessions", "{ not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "Protocol");
    assert_eq!(body["code"], "E_PROTOCOL");
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn session_round_trip_over_http() {
    let env = test_environment("http-session");
    let app = app(&env);

    let (status, directory) = call(&app, Method::POST, "/sessions", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK, "{directory}");
    assert!(directory["contents"]
        .as_object()
        .unwrap()
        .contains_key("initial-file.txt"));

    let (status, body) = call(&app, Method::GET, "/sessions/current", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "ready");

    let (status, screen) = call(&app, Method::GET, "/sessions/current/screen", None).await;
    assert_eq!(status, StatusCode::OK);
    let lines = screen["lines"].as_array().unwrap();
    assert!(lines
        .iter()
        .any(|line| line.as_str().unwrap().contains(READY_SENTINEL)));

    let (status, body) = call(
        &app,
        Method::POST,
        "/sessions/current/input",
        Some(json!({ "keys": "hello over http{enter}" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], true);

    let (status, screen) = call(
        &app,
        Method::POST,
        "/sessions/current/wait",
        Some(json!({ "text": "hello over http", "timeoutMs": 5000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{screen}");

    let (status, body) = call(&app, Method::DELETE, "/sessions/current", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "terminated");

    let (status, body) = call(
        &app,
        Method::POST,
        "/sessions/current/input",
        Some(json!({ "keys": "late" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "SessionTerminated");
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_key_token_is_rejected() {
    let env = test_environment("http-bad-token");
    let app = app(&env);
    let (status, _) = call(&app, Method::POST, "/sessions", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        Method::POST,
        "/sessions/current/input",
        Some(json!({ "keys": "{notAKey}" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "UnknownKeyToken");

    call(&app, Method::DELETE, "/sessions/current", None).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn wait_that_expires_is_a_gateway_timeout() {
    let env = test_environment("http-wait-timeout");
    let app = app(&env);
    let (status, _) = call(&app, Method::POST, "/sessions", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        Method::POST,
        "/sessions/current/wait",
        Some(json!({ "text": "never shown", "timeoutMs": 200 })),
    )
    .await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["kind"], "Timeout");

    call(&app, Method::DELETE, "/sessions/current", None).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn in_directory_start_reuses_a_provisioned_directory() {
    let env = test_environment("http-in-dir");
    let app = app(&env);

    let (status, directory) = call(&app, Method::POST, "/test-directories", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, started) = call(
        &app,
        Method::POST,
        "/sessions/in-directory",
        Some(json!({ "directory": directory.clone() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{started}");
    assert_eq!(started["rootPath"], directory["rootPath"]);

    call(&app, Method::DELETE, "/sessions/current", None).await;
}

#[tokio::test]
async fn in_directory_start_rejects_unknown_directories() {
    let env = test_environment("http-in-dir-fabricated");
    let fabricated = env.path().join("testdirs").join("made-up");
    let (status, body) = call(
        &app(&env),
        Method::POST,
        "/sessions/in-directory",
        Some(json!({
            "directory": {
                "rootPath": fabricated,
                "rootPathRelativeToTestEnvironmentDir": "testdirs/made-up",
                "contents": {},
            }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "ProvisionFailed");
}
