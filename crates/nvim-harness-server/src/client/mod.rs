//! [`TerminalHarness`] over the HTTP API.
//!
//! # Example
//!
//! ```no_run
//! use nvim_harness::model::StartNeovimArguments;
//! use nvim_harness::TerminalHarness;
//! use nvim_harness_server::client::HttpHarness;
//!
//! # async fn example() -> nvim_harness::HarnessResult<()> {
//! let harness = HttpHarness::new("http://127.0.0.1:5173");
//! let dir = harness.start_neovim(StartNeovimArguments::new()).await?;
//! harness.type_into_terminal("{upArrow}").await?;
//! harness.terminate().await?;
//! # Ok(())
//! # }
//! ```

use crate::api::{
    paths, InDirectoryRequest, InputAccepted, InputRequest, StateResponse, WaitRequest,
};
use nvim_harness::error::ErrorInfo;
use nvim_harness::model::{
    FileSelection, ScreenSnapshot, StartNeovimArguments, StartNeovimRequest, TestDirectory,
};
use nvim_harness::{HarnessError, HarnessResult, TerminalHarness};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// HTTP client for a running harness server.
#[derive(Clone, Debug)]
pub struct HttpHarness {
    base_url: String,
    http: reqwest::Client,
}

impl HttpHarness {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:5173`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the server answers its health check.
    pub async fn health(&self) -> HarnessResult<bool> {
        let response = self.send(self.http.get(self.url(paths::HEALTH))).await?;
        Ok(response.status().is_success())
    }

    /// State of the server's current session.
    pub async fn state(&self) -> HarnessResult<StateResponse> {
        let request = self.http.get(self.url(paths::CURRENT));
        read(self.send(request).await?).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> HarnessResult<reqwest::Response> {
        request
            .send()
            .await
            .map_err(|err| HarnessError::io("harness server request failed", err))
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> HarnessResult<T> {
        let request = self.http.post(self.url(path)).json(body);
        read(self.send(request).await?).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> HarnessResult<T> {
        read(self.send(self.http.get(self.url(path))).await?).await
    }
}

/// Decode a success body, or turn an error body back into a [`HarnessError`].
async fn read<T: DeserializeOwned>(response: reqwest::Response) -> HarnessResult<T> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|err| HarnessError::io("failed to read harness server response", err))?;

    if status.is_success() {
        return serde_json::from_slice(&body).map_err(|err| {
            HarnessError::protocol(
                "unexpected harness server response",
                serde_json::json!({ "status": status.as_u16(), "source": err.to_string() }),
            )
        });
    }
    match serde_json::from_slice::<ErrorInfo>(&body) {
        Ok(info) => Err(HarnessError::from(info)),
        Err(_) => Err(HarnessError::protocol(
            format!("harness server returned {status}"),
            serde_json::json!({
                "status": status.as_u16(),
                "body": String::from_utf8_lossy(&body),
            }),
        )),
    }
}

impl TerminalHarness for HttpHarness {
    async fn provision(&self, selection: FileSelection) -> HarnessResult<TestDirectory> {
        let request = StartNeovimRequest {
            filename: Some(selection.to_string()),
            startup_script_modifications: None,
        };
        self.post(paths::TEST_DIRECTORIES, &request).await
    }

    async fn start_neovim(&self, arguments: StartNeovimArguments) -> HarnessResult<TestDirectory> {
        self.post(paths::SESSIONS, &StartNeovimRequest::from(&arguments))
            .await
    }

    async fn start_neovim_in(
        &self,
        directory: &TestDirectory,
        arguments: StartNeovimArguments,
    ) -> HarnessResult<()> {
        let request = InDirectoryRequest {
            directory: directory.clone(),
            start: StartNeovimRequest::from(&arguments),
        };
        let _: TestDirectory = self.post(paths::SESSIONS_IN_DIRECTORY, &request).await?;
        Ok(())
    }

    async fn type_into_terminal(&self, text: &str) -> HarnessResult<()> {
        let request = InputRequest {
            keys: text.to_string(),
        };
        let _: InputAccepted = self.post(paths::CURRENT_INPUT, &request).await?;
        Ok(())
    }

    async fn screen(&self) -> HarnessResult<ScreenSnapshot> {
        self.get(paths::CURRENT_SCREEN).await
    }

    async fn wait_for_text(&self, text: &str, timeout: Duration) -> HarnessResult<ScreenSnapshot> {
        let request = WaitRequest {
            text: text.to_string(),
            timeout_ms: Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)),
        };
        self.post(paths::CURRENT_WAIT, &request).await
    }

    async fn terminate(&self) -> HarnessResult<()> {
        let request = self.http.delete(self.url(paths::CURRENT));
        let _: StateResponse = read(self.send(request).await?).await?;
        Ok(())
    }
}
