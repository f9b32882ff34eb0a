//! The interface tests use to drive the editor.
//!
//! Tests take a [`TerminalHarness`] instead of reaching for globals, so the
//! same test body runs against [`LocalHarness`] in-process or against a
//! remote harness server.

use crate::bootstrap::BootstrapService;
use crate::config::HarnessConfig;
use crate::error::HarnessResult;
use crate::model::{FileSelection, ScreenSnapshot, StartNeovimArguments, TestDirectory};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Operations available to a test.
pub trait TerminalHarness: Send + Sync {
    /// Provision a directory without starting the editor.
    fn provision(
        &self,
        selection: FileSelection,
    ) -> impl Future<Output = HarnessResult<TestDirectory>> + Send;

    /// Provision a fresh directory and start the editor in it. Resolves once
    /// the editor is ready.
    fn start_neovim(
        &self,
        arguments: StartNeovimArguments,
    ) -> impl Future<Output = HarnessResult<TestDirectory>> + Send;

    /// Start the editor in a directory returned by [`provision`](Self::provision).
    fn start_neovim_in(
        &self,
        directory: &TestDirectory,
        arguments: StartNeovimArguments,
    ) -> impl Future<Output = HarnessResult<()>> + Send;

    /// Send text and `{token}` keys. Resolves once the input was accepted.
    fn type_into_terminal(&self, text: &str) -> impl Future<Output = HarnessResult<()>> + Send;

    fn screen(&self) -> impl Future<Output = HarnessResult<ScreenSnapshot>> + Send;

    /// Wait until `text` is visible on screen.
    fn wait_for_text(
        &self,
        text: &str,
        timeout: Duration,
    ) -> impl Future<Output = HarnessResult<ScreenSnapshot>> + Send;

    /// End the current session. Idempotent.
    fn terminate(&self) -> impl Future<Output = HarnessResult<()>> + Send;
}

/// In-process harness over a [`BootstrapService`].
#[derive(Clone, Debug)]
pub struct LocalHarness {
    service: Arc<BootstrapService>,
}

impl LocalHarness {
    /// Harness over a fresh [`BootstrapService`].
    ///
    /// # Errors
    /// `Config` if `config` fails validation.
    pub fn new(config: HarnessConfig) -> HarnessResult<Self> {
        Ok(Self::from_service(Arc::new(BootstrapService::new(config)?)))
    }

    /// Harness sharing an existing service, e.g. with an HTTP server.
    pub fn from_service(service: Arc<BootstrapService>) -> Self {
        Self { service }
    }

    /// The underlying service.
    pub fn service(&self) -> &Arc<BootstrapService> {
        &self.service
    }
}

impl TerminalHarness for LocalHarness {
    async fn provision(&self, selection: FileSelection) -> HarnessResult<TestDirectory> {
        self.service.provision(selection)
    }

    async fn start_neovim(&self, arguments: StartNeovimArguments) -> HarnessResult<TestDirectory> {
        let session = self.service.start(arguments).await?;
        Ok(session.directory)
    }

    async fn start_neovim_in(
        &self,
        directory: &TestDirectory,
        arguments: StartNeovimArguments,
    ) -> HarnessResult<()> {
        self.service.start_in(directory, arguments).await?;
        Ok(())
    }

    async fn type_into_terminal(&self, text: &str) -> HarnessResult<()> {
        let session = self.service.current().await?;
        session.bridge.send_keys(text).await
    }

    async fn screen(&self) -> HarnessResult<ScreenSnapshot> {
        Ok(self.service.current().await?.bridge.snapshot())
    }

    async fn wait_for_text(&self, text: &str, timeout: Duration) -> HarnessResult<ScreenSnapshot> {
        let session = self.service.current().await?;
        session.bridge.wait_for_text(text, timeout).await
    }

    async fn terminate(&self) -> HarnessResult<()> {
        self.service.terminate().await
    }
}
