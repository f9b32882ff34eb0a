//! Session bootstrap: provision a directory, launch the editor in it and wait
//! until it is ready.
//!
//! Every session moves through
//! `Requested → Provisioning → Launching → Ready → Terminated`. The service
//! holds at most one session; starting another terminates the current one
//! first. Start and terminate are serialized on a single async mutex, but a
//! terminate also signals any launch still waiting for readiness so it does
//! not queue behind the readiness timeout.
//!
//! # Example
//!
//! ```no_run
//! use nvim_harness::bootstrap::BootstrapService;
//! use nvim_harness::config::HarnessConfig;
//! use nvim_harness::model::StartNeovimArguments;
//!
//! # async fn example() -> nvim_harness::HarnessResult<()> {
//! let service = BootstrapService::new(HarnessConfig::default())?;
//! let session = service.start(StartNeovimArguments::new()).await?;
//! session.bridge.send_keys("{upArrow}").await?;
//! service.terminate().await?;
//! # Ok(())
//! # }
//! ```

use crate::bridge::TerminalBridge;
use crate::config::HarnessConfig;
use crate::error::{ErrorKind, HarnessError, HarnessResult};
use crate::model::{
    FileSelection, SessionId, SessionState, StartNeovimArguments, StartNeovimServerArguments,
    TestDirectory,
};
use crate::provision::{config_home, Provisioner};
use crate::session::SpawnSpec;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// A session whose editor has shown the readiness sentinel.
#[derive(Clone, Debug)]
pub struct ReadySession {
    pub session_id: SessionId,
    pub directory: TestDirectory,
    pub arguments: StartNeovimServerArguments,
    pub bridge: Arc<TerminalBridge>,
}

/// Tracks one session's state and publishes every transition.
struct Lifecycle {
    session_id: SessionId,
    state: SessionState,
    published: Arc<watch::Sender<SessionState>>,
}

impl Lifecycle {
    fn begin(published: Arc<watch::Sender<SessionState>>) -> Self {
        let session_id = SessionId::new();
        published.send_replace(SessionState::Requested);
        tracing::info!(session_id = %session_id, state = %SessionState::Requested, "session requested");
        Self {
            session_id,
            state: SessionState::Requested,
            published,
        }
    }

    fn advance(&mut self, next: SessionState) -> HarnessResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(HarnessError::internal(format!(
                "illegal session transition {} -> {next}",
                self.state
            )));
        }
        tracing::info!(
            session_id = %self.session_id,
            from = %self.state,
            state = %next,
            "session state changed"
        );
        self.state = next;
        self.published.send_replace(next);
        Ok(())
    }

    /// Move to `Terminated` unless already there.
    fn finish(&mut self) {
        if !self.state.is_live() {
            return;
        }
        if let Err(err) = self.advance(SessionState::Terminated) {
            tracing::warn!(
                session_id = %self.session_id,
                error = %err,
                "failed to mark session terminated"
            );
        }
    }
}

// A start future dropped mid-flight must not leave a live state published.
impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.finish();
    }
}

struct ActiveSession {
    ready: ReadySession,
    lifecycle: Lifecycle,
}

/// Starts, tracks and terminates editor sessions.
pub struct BootstrapService {
    config: HarnessConfig,
    provisioner: Provisioner,
    active: Mutex<Option<ActiveSession>>,
    state: Arc<watch::Sender<SessionState>>,
    /// Bumped by `terminate`; launches subscribed earlier abort their readiness wait.
    cancel: watch::Sender<u64>,
}

impl std::fmt::Debug for BootstrapService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapService")
            .field("test_environment_dir", &self.config.test_environment_dir)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl BootstrapService {
    /// Validate `config` and build a service with no active session.
    pub fn new(config: HarnessConfig) -> HarnessResult<Self> {
        config.validate()?;
        let (state, _) = watch::channel(SessionState::Terminated);
        let (cancel, _) = watch::channel(0);
        Ok(Self {
            provisioner: Provisioner::new(config.test_environment_dir.clone()),
            config,
            active: Mutex::new(None),
            state: Arc::new(state),
            cancel,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn provisioner(&self) -> &Provisioner {
        &self.provisioner
    }

    /// Provision a directory without starting a session.
    pub fn provision(&self, selection: FileSelection) -> HarnessResult<TestDirectory> {
        self.provisioner.provision(selection)
    }

    /// Provision a fresh directory, launch the editor in it and wait for readiness.
    ///
    /// # Errors
    /// - `ProvisionFailed` if the directory cannot be created.
    /// - `LaunchFailed` if the editor does not show the sentinel in time.
    /// - `SessionTerminated` if [`BootstrapService::terminate`] is called
    ///   before the editor is ready.
    pub async fn start(&self, arguments: StartNeovimArguments) -> HarnessResult<ReadySession> {
        let mut cancelled = self.cancel.subscribe();
        let mut active = self.active.lock().await;
        self.shutdown(&mut active).await?;

        let mut lifecycle = Lifecycle::begin(Arc::clone(&self.state));
        let result = async {
            lifecycle.advance(SessionState::Provisioning)?;
            let directory = self.provisioner.provision(arguments.selection())?;
            self.launch_in(&mut lifecycle, directory, arguments, &mut cancelled)
                .await
        }
        .await;

        self.settle(&mut active, lifecycle, result)
    }

    /// Launch the editor in a directory this service provisioned earlier.
    ///
    /// Only `directory.root_path` is read; the contents come from the
    /// provisioner's own record of that root.
    ///
    /// # Errors
    /// - `ProvisionFailed` if `directory` was not issued by this service or
    ///   lacks the file to open.
    /// - `LaunchFailed` if the editor does not show the sentinel in time.
    /// - `SessionTerminated` if [`BootstrapService::terminate`] is called
    ///   before the editor is ready.
    pub async fn start_in(
        &self,
        directory: &TestDirectory,
        arguments: StartNeovimArguments,
    ) -> HarnessResult<ReadySession> {
        let mut cancelled = self.cancel.subscribe();
        let mut active = self.active.lock().await;
        self.shutdown(&mut active).await?;

        let mut lifecycle = Lifecycle::begin(Arc::clone(&self.state));
        let result = async {
            lifecycle.advance(SessionState::Provisioning)?;
            let recorded = self.provisioner.verify_issued(&directory.root_path)?;
            self.launch_in(&mut lifecycle, recorded, arguments, &mut cancelled)
                .await
        }
        .await;

        self.settle(&mut active, lifecycle, result)
    }

    /// The ready session, if one is running.
    ///
    /// # Errors
    /// `SessionTerminated` if there is no session or its editor has exited.
    pub async fn current(&self) -> HarnessResult<ReadySession> {
        let mut active = self.active.lock().await;
        match active.as_mut() {
            Some(session) if !session.ready.bridge.is_terminated() => Ok(session.ready.clone()),
            Some(session) => {
                session.lifecycle.finish();
                Err(HarnessError::new(
                    ErrorKind::SessionTerminated,
                    "the editor process has exited",
                    serde_json::json!({ "session_id": session.ready.session_id.to_string() }),
                ))
            }
            None => Err(HarnessError::session_terminated("no session has been started")),
        }
    }

    /// Terminate the current session. A no-op when there is none.
    ///
    /// A start still waiting for readiness is aborted first and fails with
    /// `SessionTerminated`.
    pub async fn terminate(&self) -> HarnessResult<()> {
        self.cancel
            .send_modify(|generation| *generation = generation.wrapping_add(1));
        let mut active = self.active.lock().await;
        self.shutdown(&mut active).await
    }

    /// State of the most recent session, `Terminated` when there is none.
    pub fn state(&self) -> SessionState {
        let published = *self.state.borrow();
        // A start or terminate in flight holds the lock; report what it published.
        match self.active.try_lock() {
            Ok(active) => match active.as_ref() {
                Some(session) if session.ready.bridge.is_terminated() => SessionState::Terminated,
                _ => published,
            },
            Err(_) => published,
        }
    }

    /// Apply modifications and launch. A failed launch removes its directory
    /// when `cleanup_on_terminate` is set.
    async fn launch_in(
        &self,
        lifecycle: &mut Lifecycle,
        directory: TestDirectory,
        arguments: StartNeovimArguments,
        cancelled: &mut watch::Receiver<u64>,
    ) -> HarnessResult<ReadySession> {
        let result = async {
            self.provisioner
                .apply_modifications(&directory, &arguments.startup_script_modifications)?;
            self.launch(lifecycle, &directory, arguments, cancelled).await
        }
        .await;

        if result.is_err() && self.config.session.cleanup_on_terminate {
            if let Err(err) = self.provisioner.remove(&directory) {
                tracing::warn!(
                    session_id = %lifecycle.session_id,
                    root = %directory.root_path.display(),
                    error = %err,
                    "failed to remove directory of failed launch"
                );
            }
        }
        result
    }

    async fn launch(
        &self,
        lifecycle: &mut Lifecycle,
        directory: &TestDirectory,
        arguments: StartNeovimArguments,
        cancelled: &mut watch::Receiver<u64>,
    ) -> HarnessResult<ReadySession> {
        lifecycle.advance(SessionState::Launching)?;
        let server_arguments = StartNeovimServerArguments::new(directory.root_path.clone(), arguments);
        let file = server_arguments.file_to_open();
        if !directory.contains(file) {
            return Err(HarnessError::new(
                ErrorKind::ProvisionFailed,
                format!("'{file}' is not part of the test directory"),
                serde_json::json!({ "root": directory.root_path.display().to_string() }),
            ));
        }

        let spec = self.spawn_spec(&server_arguments);
        tracing::debug!(
            session_id = %lifecycle.session_id,
            command = %spec.command,
            args = ?spec.args,
            root = %directory.root_path.display(),
            "launching editor"
        );
        let bridge = Arc::new(TerminalBridge::spawn(lifecycle.session_id, &spec)?);

        let readiness = &self.config.readiness;
        let waited = tokio::select! {
            waited = bridge.wait_for_text(&readiness.sentinel, readiness.timeout()) => Some(waited),
            () = cancellation(cancelled) => None,
        };
        let failure = match waited {
            Some(Ok(_)) => None,
            Some(Err(err)) => Some(HarnessError::launch_failed(
                "editor did not become ready",
                serde_json::json!({
                    "session_id": lifecycle.session_id.to_string(),
                    "cause": err.to_error_info(),
                    "timeout_ms": readiness.timeout_ms,
                    "screen": bridge.snapshot().lines,
                }),
            )),
            None => Some(HarnessError::new(
                ErrorKind::SessionTerminated,
                "session terminated while launching",
                serde_json::json!({ "session_id": lifecycle.session_id.to_string() }),
            )),
        };
        if let Some(err) = failure {
            if let Err(terminate_err) = bridge.terminate(self.config.session.termination_grace()).await {
                tracing::warn!(
                    session_id = %lifecycle.session_id,
                    error = %terminate_err,
                    "failed to stop editor after launch failure"
                );
            }
            return Err(err);
        }

        lifecycle.advance(SessionState::Ready)?;
        Ok(ReadySession {
            session_id: lifecycle.session_id,
            directory: directory.clone(),
            arguments: server_arguments,
            bridge,
        })
    }

    fn spawn_spec(&self, arguments: &StartNeovimServerArguments) -> SpawnSpec {
        let editor = &self.config.editor;
        let mut args = editor.args.clone();
        args.push(arguments.file_to_open().as_str().to_string());
        SpawnSpec {
            command: editor.command.clone(),
            args,
            cwd: Some(arguments.directory().to_path_buf()),
            size: self.config.terminal,
            env: editor.env.clone(),
            extra_env: vec![(
                "XDG_CONFIG_HOME".to_string(),
                config_home(arguments.directory()).display().to_string(),
            )],
        }
    }

    /// Record the outcome of a start attempt.
    fn settle(
        &self,
        active: &mut Option<ActiveSession>,
        mut lifecycle: Lifecycle,
        result: HarnessResult<ReadySession>,
    ) -> HarnessResult<ReadySession> {
        match result {
            Ok(ready) => {
                *active = Some(ActiveSession {
                    ready: ready.clone(),
                    lifecycle,
                });
                Ok(ready)
            }
            Err(err) => {
                tracing::warn!(
                    session_id = %lifecycle.session_id,
                    code = err.code(),
                    error = %err.message,
                    "session start failed"
                );
                lifecycle.finish();
                Err(err)
            }
        }
    }

    async fn shutdown(&self, active: &mut Option<ActiveSession>) -> HarnessResult<()> {
        let Some(mut session) = active.take() else {
            return Ok(());
        };
        let result = session
            .ready
            .bridge
            .terminate(self.config.session.termination_grace())
            .await;
        session.lifecycle.finish();
        if self.config.session.cleanup_on_terminate {
            self.provisioner.remove(&session.ready.directory)?;
        }
        result
    }
}

/// Resolves once the generation moves past what `cancelled` has seen.
async fn cancellation(cancelled: &mut watch::Receiver<u64>) {
    if cancelled.changed().await.is_err() {
        // The service owns the sender, so it outlives every launch.
        std::future::pending::<()>().await;
    }
}
