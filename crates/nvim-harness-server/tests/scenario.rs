// Test module - relaxed lint rules
#![allow(clippy::indexing_slicing)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(missing_docs)]

//! End-to-end flows over a real socket: `HttpHarness` talks to the server,
//! which drives the fake editor fixture in a PTY.

use nvim_harness::bootstrap::BootstrapService;
use nvim_harness::error::ErrorKind;
use nvim_harness::fixtures::{FixtureKey, READY_SENTINEL};
use nvim_harness::model::{FileSelection, SessionState, StartNeovimArguments};
use nvim_harness::TerminalHarness;
use nvim_harness_fixtures::{fixture_path, test_environment, ConfigBuilder, FAKE_EDITOR};
use nvim_harness_server::HttpHarness;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

fn config(env: &tempfile::TempDir) -> ConfigBuilder {
    ConfigBuilder::new(env.path()).with_editor(fixture_path(FAKE_EDITOR))
}

async fn serve(env: &tempfile::TempDir) -> HttpHarness {
    serve_with(config(env)).await
}

/// Serve a fresh harness on an ephemeral port.
async fn serve_with(config: ConfigBuilder) -> HttpHarness {
    let service = Arc::new(BootstrapService::new(config.build()).unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, nvim_harness_server::router(service))
            .await
            .unwrap();
    });
    HttpHarness::new(format!("http://{address}"))
}

#[tokio::test(flavor = "multi_thread")]
async fn server_answers_health_checks() {
    let env = test_environment("scenario-health");
    let harness = serve(&env).await;
    assert!(harness.health().await.unwrap());
    assert_eq!(harness.state().await.unwrap().state, SessionState::Terminated);
}

#[tokio::test(flavor = "multi_thread")]
async fn search_and_replace_opens_on_the_browsed_directory() {
    let env = test_environment("scenario-grug");
    let harness = serve(&env).await;

    let dir = harness
        .start_neovim(StartNeovimArguments::new())
        .await
        .unwrap();
    harness.wait_for_text(READY_SENTINEL, WAIT).await.unwrap();
    assert_eq!(harness.state().await.unwrap().state, SessionState::Ready);

    // Open the file browser and move into routes/.
    harness.type_into_terminal("{upArrow}").await.unwrap();
    harness.wait_for_text("routes/", WAIT).await.unwrap();
    harness
        .type_into_terminal("/routes{enter}")
        .await
        .unwrap();
    harness.type_into_terminal("{rightArrow}").await.unwrap();
    let adjacent = dir.entry(FixtureKey::RoutesPostIdAdjacentFile).unwrap();
    harness.wait_for_text(&adjacent.name, WAIT).await.unwrap();

    harness.type_into_terminal("{control+g}").await.unwrap();
    harness.wait_for_text("Grug FAR", WAIT).await.unwrap();
    harness.wait_for_text("testdirs", WAIT).await.unwrap();
    let routes = dir
        .root_path_relative_to_test_environment_dir
        .join("routes");
    harness
        .wait_for_text(&routes.display().to_string(), WAIT)
        .await
        .unwrap();

    harness.type_into_terminal("ithis").await.unwrap();
    let screen = harness.wait_for_text("Search: this", WAIT).await.unwrap();
    assert!(screen.contains("-- INSERT --"));

    harness.terminate().await.unwrap();
    assert_eq!(harness.state().await.unwrap().state, SessionState::Terminated);
}

#[tokio::test(flavor = "multi_thread")]
async fn file_without_the_sentinel_fails_to_launch() {
    let env = test_environment("scenario-file");
    let harness = serve_with(config(&env).with_readiness_timeout_ms(1_000)).await;

    let err = harness
        .start_neovim(StartNeovimArguments::new().with_file(FixtureKey::File))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::LaunchFailed);
    let context = err.context.unwrap();
    assert_eq!(context["cause"]["kind"], "Timeout");
    let screen = context["screen"].as_array().unwrap();
    assert!(screen.iter().any(|line| line.as_str().unwrap().contains("Hello")));

    let err = harness.screen().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::SessionTerminated);
}

#[tokio::test(flavor = "multi_thread")]
async fn provisioned_directory_can_be_started_later() {
    let env = test_environment("scenario-in-dir");
    let harness = serve(&env).await;

    let dir = harness.provision(FileSelection::All).await.unwrap();
    assert!(dir.path_of(FixtureKey::File).is_file());

    harness
        .start_neovim_in(&dir, StartNeovimArguments::new())
        .await
        .unwrap();
    harness.type_into_terminal("{upArrow}").await.unwrap();
    harness.wait_for_text("file.txt", WAIT).await.unwrap();
    harness
        .wait_for_text(&dir.root_path_relative_to_test_environment_dir.display().to_string(), WAIT)
        .await
        .unwrap();

    harness.terminate().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn typed_text_reaches_the_editor() {
    let env = test_environment("scenario-typing");
    let harness = serve(&env).await;

    harness
        .start_neovim(StartNeovimArguments::new())
        .await
        .unwrap();
    harness.type_into_terminal("hello {{braces}").await.unwrap();
    let screen = harness.wait_for_text("hello {braces}", WAIT).await.unwrap();
    assert!(screen.contains(READY_SENTINEL));

    let err = harness
        .type_into_terminal("{notAKey}")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownKeyToken);

    harness.terminate().await.unwrap();
    let err = harness.type_into_terminal("late").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::SessionTerminated);
}
