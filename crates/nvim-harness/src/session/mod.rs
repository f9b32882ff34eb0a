//! PTY process management.
//!
//! [`PtyProcess`] spawns a command on a fresh pseudo-terminal and owns the
//! child for its whole life. The blocking reader and writer halves are taken
//! out once by the bridge, which runs each on its own thread; signalling and
//! reaping stay here.
//!
//! # Example
//!
//! ```no_run
//! use nvim_harness::config::EnvConfig;
//! use nvim_harness::model::TerminalSize;
//! use nvim_harness::session::{PtyProcess, SpawnSpec};
//! use std::time::Duration;
//!
//! # fn example() -> nvim_harness::HarnessResult<()> {
//! let spec = SpawnSpec {
//!     command: "/bin/cat".to_string(),
//!     args: vec![],
//!     cwd: None,
//!     size: TerminalSize::default(),
//!     env: EnvConfig::default(),
//!     extra_env: vec![],
//! };
//! let mut process = PtyProcess::spawn(&spec)?;
//! process.terminate_process_group(Duration::from_millis(500))?;
//! # Ok(())
//! # }
//! ```

use crate::config::EnvConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::model::TerminalSize;
#[cfg(unix)]
use nix::sys::signal::{killpg, Signal};
#[cfg(unix)]
use nix::unistd::Pid;
use portable_pty::{native_pty_system, CommandBuilder, ExitStatus, MasterPty, PtySize};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// What to run and how.
#[derive(Clone, Debug)]
pub struct SpawnSpec {
    pub command: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub size: TerminalSize,
    pub env: EnvConfig,
    /// Variables set after `env` is applied; these win.
    pub extra_env: Vec<(String, String)>,
}

/// A child process attached to a PTY.
pub struct PtyProcess {
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn portable_pty::Child + Send + Sync>,
    reader: Option<Box<dyn Read + Send>>,
    writer: Option<Box<dyn Write + Send>>,
    exit_status: Option<ExitStatus>,
}

impl std::fmt::Debug for PtyProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyProcess")
            .field("pid", &self.child.process_id())
            .field("exit_status", &self.exit_status)
            .finish_non_exhaustive()
    }
}

impl PtyProcess {
    /// Open a PTY and spawn `spec.command` on it.
    ///
    /// # Errors
    /// `LaunchFailed` if the PTY cannot be opened or the command cannot start.
    pub fn spawn(spec: &SpawnSpec) -> HarnessResult<Self> {
        let pair = native_pty_system()
            .openpty(PtySize {
                rows: spec.size.rows,
                cols: spec.size.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|err| launch_error("failed to open pty", &spec.command, err))?;

        let mut cmd = CommandBuilder::new(&spec.command);
        cmd.args(&spec.args);
        if let Some(cwd) = &spec.cwd {
            cmd.cwd(cwd);
        }
        spec.env.apply(&mut cmd);
        for (key, value) in &spec.extra_env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|err| launch_error("failed to spawn command", &spec.command, err))?;
        // The slave end belongs to the child now.
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|err| HarnessError::io("failed to clone pty reader", err))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|err| HarnessError::io("failed to take pty writer", err))?;

        tracing::debug!(
            command = %spec.command,
            pid = ?child.process_id(),
            "spawned pty process"
        );

        Ok(Self {
            master: pair.master,
            child,
            reader: Some(reader),
            writer: Some(writer),
            exit_status: None,
        })
    }

    /// Blocking reader over the PTY output. Available once.
    pub fn take_reader(&mut self) -> HarnessResult<Box<dyn Read + Send>> {
        self.reader
            .take()
            .ok_or_else(|| HarnessError::internal("pty reader already taken"))
    }

    /// Writer into the PTY input. Available once.
    pub fn take_writer(&mut self) -> HarnessResult<Box<dyn Write + Send>> {
        self.writer
            .take()
            .ok_or_else(|| HarnessError::internal("pty writer already taken"))
    }

    /// Pid of the child, which also leads its process group.
    pub fn process_id(&self) -> Option<u32> {
        self.child.process_id()
    }

    /// Resize the PTY; the child sees `SIGWINCH`.
    pub fn resize(&self, size: TerminalSize) -> HarnessResult<()> {
        self.master
            .resize(PtySize {
                rows: size.rows,
                cols: size.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|err| HarnessError::io("failed to resize pty", err))
    }

    /// Exit status if the child has exited, without blocking.
    pub fn try_wait(&mut self) -> HarnessResult<Option<ExitStatus>> {
        if self.exit_status.is_some() {
            return Ok(self.exit_status.clone());
        }
        let status = self
            .child
            .try_wait()
            .map_err(|err| HarnessError::io("failed to poll child", err))?;
        self.exit_status.clone_from(&status);
        Ok(status)
    }

    /// Poll for exit until `timeout` expires.
    pub fn wait_for_exit(&mut self, timeout: Duration) -> HarnessResult<Option<ExitStatus>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    /// SIGTERM the process group, then SIGKILL if it is still alive after `grace`.
    pub fn terminate_process_group(&mut self, grace: Duration) -> HarnessResult<Option<ExitStatus>> {
        if let Some(status) = self.try_wait()? {
            return Ok(Some(status));
        }

        #[cfg(unix)]
        if let Some(pgid) = self.process_group() {
            signal_process_group(pgid, Signal::SIGTERM)?;
            if let Some(status) = self.wait_for_exit(grace)? {
                return Ok(Some(status));
            }
            tracing::debug!(pgid = %pgid, "process group ignored SIGTERM, sending SIGKILL");
            signal_process_group(pgid, Signal::SIGKILL)?;
            return self.wait_for_exit(Duration::from_millis(200));
        }

        self.child
            .kill()
            .map_err(|err| HarnessError::io("failed to kill child", err))?;
        self.wait_for_exit(grace)
    }

    #[cfg(unix)]
    fn process_group(&self) -> Option<Pid> {
        // portable-pty starts the child as a session leader, so pid == pgid.
        #[allow(clippy::cast_possible_wrap)]
        self.child.process_id().map(|pid| Pid::from_raw(pid as i32))
    }
}

impl Drop for PtyProcess {
    fn drop(&mut self) {
        if self.exit_status.is_some() {
            return;
        }
        #[cfg(unix)]
        if let Some(pgid) = self.process_group() {
            let _ = signal_process_group(pgid, Signal::SIGKILL);
            let _ = self.child.try_wait();
            return;
        }
        let _ = self.child.kill();
    }
}

#[cfg(unix)]
fn signal_process_group(pgid: Pid, signal: Signal) -> HarnessResult<()> {
    match killpg(pgid, signal) {
        // ESRCH: already gone
        Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(err) => Err(HarnessError::io("failed to signal process group", err)),
    }
}

fn launch_error(message: &str, command: &str, err: impl std::fmt::Display) -> HarnessError {
    HarnessError::launch_failed(
        message,
        serde_json::json!({ "command": command, "source": err.to_string() }),
    )
}
