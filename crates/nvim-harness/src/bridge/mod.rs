//! Terminal I/O bridge between async callers and a PTY process.
//!
//! Two dedicated threads serve each bridge:
//!
//! - the reader feeds PTY output through the [`Terminal`] emulator and
//!   publishes a fresh [`ScreenSnapshot`] on a `watch` channel after every
//!   chunk; end of output marks the bridge exited;
//! - the writer drains an ordered `mpsc` queue of encoded keystrokes and
//!   acknowledges each chunk once it is written and flushed.
//!
//! Keystrokes are written in the order `send_keys` was called and are never
//! dropped while the process is alive.

use crate::error::{HarnessError, HarnessResult};
use crate::keys;
use crate::model::{ScreenSnapshot, SessionId, TerminalSize};
use crate::session::{PtyProcess, SpawnSpec};
use crate::terminal::Terminal;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

const READ_BUFFER_SIZE: usize = 4096;

struct WriteRequest {
    bytes: Vec<u8>,
    ack: oneshot::Sender<HarnessResult<()>>,
}

/// Live connection to one PTY process.
pub struct TerminalBridge {
    session_id: SessionId,
    process: Arc<Mutex<PtyProcess>>,
    input: Mutex<Option<mpsc::UnboundedSender<WriteRequest>>>,
    snapshots: watch::Receiver<ScreenSnapshot>,
    exited: watch::Receiver<bool>,
    terminated: AtomicBool,
}

impl std::fmt::Debug for TerminalBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalBridge")
            .field("session_id", &self.session_id)
            .field("terminated", &self.is_terminated())
            .finish_non_exhaustive()
    }
}

impl TerminalBridge {
    /// Spawn `spec` on a PTY and start the reader and writer threads.
    pub fn spawn(session_id: SessionId, spec: &SpawnSpec) -> HarnessResult<Self> {
        let mut process = PtyProcess::spawn(spec)?;
        let reader = process.take_reader()?;
        let writer = process.take_writer()?;

        let terminal = Terminal::new(spec.size);
        let (snapshot_tx, snapshots) = watch::channel(terminal.snapshot());
        let (exited_tx, exited) = watch::channel(false);
        let (input_tx, input_rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name(format!("pty-reader-{session_id}"))
            .spawn(move || pump_output(session_id, reader, terminal, &snapshot_tx, &exited_tx))
            .map_err(|err| HarnessError::io("failed to start pty reader thread", err))?;

        let writer_exited = exited.clone();
        std::thread::Builder::new()
            .name(format!("pty-writer-{session_id}"))
            .spawn(move || pump_input(session_id, writer, input_rx, &writer_exited))
            .map_err(|err| HarnessError::io("failed to start pty writer thread", err))?;

        Ok(Self {
            session_id,
            process: Arc::new(Mutex::new(process)),
            input: Mutex::new(Some(input_tx)),
            snapshots,
            exited,
            terminated: AtomicBool::new(false),
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Whether the bridge was terminated or the process stopped producing output.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst) || *self.exited.borrow()
    }

    /// Parse `text` as key input and write it to the PTY.
    ///
    /// Resolves once the writer thread has written and flushed the bytes.
    ///
    /// # Errors
    /// - `UnknownKeyToken` if `text` contains a bad token; nothing is written.
    /// - `SessionTerminated` once the session has ended.
    pub async fn send_keys(&self, text: &str) -> HarnessResult<()> {
        let bytes = keys::encode(&keys::parse_keys(text)?);
        if self.is_terminated() {
            return Err(terminated_error(self.session_id));
        }
        if bytes.is_empty() {
            return Ok(());
        }

        let sender = self
            .input
            .lock()
            .map_err(|_| HarnessError::internal("bridge input lock poisoned"))?
            .clone()
            .ok_or_else(|| terminated_error(self.session_id))?;

        let (ack, accepted) = oneshot::channel();
        let len = bytes.len();
        sender
            .send(WriteRequest { bytes, ack })
            .map_err(|_| terminated_error(self.session_id))?;
        accepted
            .await
            .map_err(|_| terminated_error(self.session_id))??;
        tracing::trace!(session_id = %self.session_id, bytes = len, "input accepted");
        Ok(())
    }

    /// Most recent screen state.
    pub fn snapshot(&self) -> ScreenSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that observes every published snapshot. It closes when the
    /// process stops producing output.
    pub fn subscribe(&self) -> watch::Receiver<ScreenSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until `needle` is visible on screen.
    ///
    /// # Errors
    /// - `Timeout` if `timeout` expires first.
    /// - `SessionTerminated` if the process ends without showing `needle`.
    pub async fn wait_for_text(
        &self,
        needle: &str,
        timeout: Duration,
    ) -> HarnessResult<ScreenSnapshot> {
        let mut snapshots = self.snapshots.clone();
        let mut exited = self.exited.clone();

        let wait = async {
            loop {
                {
                    let snapshot = snapshots.borrow_and_update();
                    if snapshot.contains(needle) {
                        return Ok(snapshot.clone());
                    }
                }
                if *exited.borrow_and_update() {
                    // The reader publishes its last snapshot before flagging exit.
                    let snapshot = snapshots.borrow();
                    if snapshot.contains(needle) {
                        return Ok(snapshot.clone());
                    }
                    return Err(terminated_error(self.session_id));
                }
                tokio::select! {
                    _ = snapshots.changed() => {}
                    _ = exited.changed() => {}
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => {
                let last = self.snapshot();
                Err(HarnessError::timeout(
                    format!("text '{needle}' did not appear within {}ms", timeout.as_millis()),
                    serde_json::json!({
                        "session_id": self.session_id.to_string(),
                        "needle": needle,
                        "timeout_ms": u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                        "screen": last.lines,
                    }),
                ))
            }
        }
    }

    /// Resize the PTY. The emulator follows once the application redraws.
    pub fn resize(&self, size: TerminalSize) -> HarnessResult<()> {
        self.process
            .lock()
            .map_err(|_| HarnessError::internal("bridge process lock poisoned"))?
            .resize(size)
    }

    /// Stop accepting input and end the process group.
    ///
    /// Idempotent: later calls return immediately.
    pub async fn terminate(&self, grace: Duration) -> HarnessResult<()> {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // Dropping the sender lets the writer thread drain and exit.
        self.input
            .lock()
            .map_err(|_| HarnessError::internal("bridge input lock poisoned"))?
            .take();

        let process = Arc::clone(&self.process);
        let status = tokio::task::spawn_blocking(move || {
            process
                .lock()
                .map_err(|_| HarnessError::internal("bridge process lock poisoned"))?
                .terminate_process_group(grace)
        })
        .await
        .map_err(|err| HarnessError::internal(format!("terminate task failed: {err}")))??;

        tracing::debug!(
            session_id = %self.session_id,
            exit_status = ?status,
            "terminated pty process"
        );
        Ok(())
    }
}

fn pump_output(
    session_id: SessionId,
    mut reader: Box<dyn Read + Send>,
    mut terminal: Terminal,
    snapshots: &watch::Sender<ScreenSnapshot>,
    exited: &watch::Sender<bool>,
) {
    let mut buffer = [0u8; READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(count) => {
                if let Some(chunk) = buffer.get(..count) {
                    terminal.process_bytes(chunk);
                    snapshots.send_replace(terminal.snapshot());
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
            // Linux reports EIO on the master once the last slave fd closes.
            Err(err) => {
                tracing::trace!(session_id = %session_id, error = %err, "pty read ended");
                break;
            }
        }
    }
    tracing::debug!(
        session_id = %session_id,
        sequence = terminal.sequence(),
        "pty output closed"
    );
    exited.send_replace(true);
}

fn pump_input(
    session_id: SessionId,
    mut writer: Box<dyn Write + Send>,
    mut requests: mpsc::UnboundedReceiver<WriteRequest>,
    exited: &watch::Receiver<bool>,
) {
    while let Some(request) = requests.blocking_recv() {
        let result = writer
            .write_all(&request.bytes)
            .and_then(|()| writer.flush())
            .map_err(|err| {
                if *exited.borrow() {
                    terminated_error(session_id)
                } else {
                    HarnessError::io("failed to write to pty", err)
                }
            });
        let _ = request.ack.send(result);
    }
    tracing::trace!(session_id = %session_id, "pty writer stopped");
}

fn terminated_error(session_id: SessionId) -> HarnessError {
    HarnessError::new(
        crate::error::ErrorKind::SessionTerminated,
        "session has terminated",
        serde_json::json!({ "session_id": session_id.to_string() }),
    )
}
