//! HTTP routes over a [`BootstrapService`].
//!
//! Request bodies are decoded by hand so that malformed JSON and unknown
//! fixture names come back in the same `{ kind, code, message }` shape as
//! every other error.

mod error;

pub use error::{status_for, ApiError};

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use nvim_harness::bootstrap::BootstrapService;
use nvim_harness::model::{
    ScreenSnapshot, SessionState, StartNeovimArguments, StartNeovimRequest, TestDirectory,
};
use nvim_harness::HarnessError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// Route paths, shared with the HTTP client.
pub mod paths {
    pub const HEALTH: &str = "/health";
    pub const TEST_DIRECTORIES: &str = "/test-directories";
    pub const SESSIONS: &str = "/sessions";
    pub const SESSIONS_IN_DIRECTORY: &str = "/sessions/in-directory";
    pub const CURRENT: &str = "/sessions/current";
    pub const CURRENT_INPUT: &str = "/sessions/current/input";
    pub const CURRENT_SCREEN: &str = "/sessions/current/screen";
    pub const CURRENT_WAIT: &str = "/sessions/current/wait";
    pub const CURRENT_WS: &str = "/sessions/current/ws";
}

/// Wait used when a wait request names no timeout.
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 4_000;

pub type AppState = Arc<BootstrapService>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateResponse {
    pub state: SessionState,
}

/// Body of `POST /sessions/in-directory`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InDirectoryRequest {
    pub directory: TestDirectory,
    #[serde(flatten)]
    pub start: StartNeovimRequest,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputRequest {
    pub keys: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputAccepted {
    pub accepted: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Router with every harness route and request tracing.
pub fn router(service: AppState) -> Router {
    Router::new()
        .route(paths::HEALTH, get(health))
        .route(paths::TEST_DIRECTORIES, post(create_test_directory))
        .route(paths::SESSIONS, post(start_session))
        .route(paths::SESSIONS_IN_DIRECTORY, post(start_session_in_directory))
        .route(paths::CURRENT, get(current_session).delete(terminate_session))
        .route(paths::CURRENT_INPUT, post(send_input))
        .route(paths::CURRENT_SCREEN, get(screen))
        .route(paths::CURRENT_WAIT, post(wait_for_text))
        .route(paths::CURRENT_WS, get(crate::ws::stream_session))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Decode a JSON body; an empty body decodes as `{}`.
fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|err| {
        ApiError(HarnessError::protocol(
            "invalid request body",
            serde_json::json!({ "source": err.to_string() }),
        ))
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn create_test_directory(
    State(service): State<AppState>,
    body: Bytes,
) -> Result<Json<TestDirectory>, ApiError> {
    let request: StartNeovimRequest = decode(&body)?;
    let arguments = StartNeovimArguments::try_from(request)?;
    Ok(Json(service.provision(arguments.selection())?))
}

async fn start_session(
    State(service): State<AppState>,
    body: Bytes,
) -> Result<Json<TestDirectory>, ApiError> {
    let request: StartNeovimRequest = decode(&body)?;
    let arguments = StartNeovimArguments::try_from(request)?;
    let session = service.start(arguments).await?;
    Ok(Json(session.directory))
}

async fn start_session_in_directory(
    State(service): State<AppState>,
    body: Bytes,
) -> Result<Json<TestDirectory>, ApiError> {
    let request: InDirectoryRequest = decode(&body)?;
    let arguments = StartNeovimArguments::try_from(request.start)?;
    let session = service.start_in(&request.directory, arguments).await?;
    Ok(Json(session.directory))
}

async fn current_session(State(service): State<AppState>) -> Json<StateResponse> {
    Json(StateResponse {
        state: service.state(),
    })
}

async fn terminate_session(
    State(service): State<AppState>,
) -> Result<Json<StateResponse>, ApiError> {
    service.terminate().await?;
    Ok(Json(StateResponse {
        state: SessionState::Terminated,
    }))
}

async fn send_input(
    State(service): State<AppState>,
    body: Bytes,
) -> Result<Json<InputAccepted>, ApiError> {
    let request: InputRequest = decode(&body)?;
    let session = service.current().await?;
    session.bridge.send_keys(&request.keys).await?;
    Ok(Json(InputAccepted { accepted: true }))
}

async fn screen(State(service): State<AppState>) -> Result<Json<ScreenSnapshot>, ApiError> {
    let session = service.current().await?;
    Ok(Json(session.bridge.snapshot()))
}

async fn wait_for_text(
    State(service): State<AppState>,
    body: Bytes,
) -> Result<Json<ScreenSnapshot>, ApiError> {
    let request: WaitRequest = decode(&body)?;
    let timeout = Duration::from_millis(request.timeout_ms.unwrap_or(DEFAULT_WAIT_TIMEOUT_MS));
    let session = service.current().await?;
    Ok(Json(session.bridge.wait_for_text(&request.text, timeout).await?))
}
