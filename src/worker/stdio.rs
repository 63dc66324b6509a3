//! Transport for child-process workers.
//!
//! The child speaks the wire protocol over its stdio: one JSON request per
//! line on stdin, one JSON response per line on stdout. A reader task pumps
//! stdout into the channel's line stream. Child processes cannot poll the
//! shared interrupt byte, so [`Transport::notify_interrupt`] mirrors the
//! sentinel write as SIGINT, which cooperative harnesses surface as their
//! interpreter's interrupt exception.

use crate::channel::Transport;
use crate::error::BackendError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

pub struct StdioTransport {
    stdin: Mutex<Option<ChildStdin>>,
    child: Mutex<Option<Child>>,
    pid: Option<u32>,
    /// Working directory owned by this worker, removed on shutdown.
    scratch_dir: Option<PathBuf>,
}

impl StdioTransport {
    /// Spawn `command` and wire its stdio. stderr is inherited so harness
    /// crashes stay visible on the orchestrator's own stderr.
    pub fn spawn(
        mut command: Command,
        scratch_dir: Option<PathBuf>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<String>), BackendError> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BackendError::Transport("child stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BackendError::Transport("child stdout unavailable".into()))?;
        let pid = child.id();

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("worker stdout closed");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "worker stdout read failed");
                        break;
                    }
                }
            }
        });

        Ok((
            Self {
                stdin: Mutex::new(Some(stdin)),
                child: Mutex::new(Some(child)),
                pid,
                scratch_dir,
            },
            rx,
        ))
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send_line(&self, line: String) -> Result<(), BackendError> {
        let mut guard = self.stdin.lock().await;
        let stdin = guard
            .as_mut()
            .ok_or_else(|| BackendError::Transport("worker stdin closed".into()))?;
        let write = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        };
        write
            .await
            .map_err(|e| BackendError::Transport(format!("stdin write failed: {e}")))
    }

    #[cfg(unix)]
    fn notify_interrupt(&self) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = self.pid {
            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGINT) {
                warn!(pid, error = %e, "failed to signal worker");
            }
        }
    }

    #[cfg(not(unix))]
    fn notify_interrupt(&self) {
        warn!(pid = self.pid, "cooperative interrupt unsupported on this platform");
    }

    async fn shutdown(&self) {
        self.stdin.lock().await.take();
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "worker already exited");
            }
            let _ = child.wait().await;
        }
        if let Some(dir) = &self.scratch_dir {
            if let Err(e) = tokio::fs::remove_dir_all(dir).await {
                debug!(dir = %dir.display(), error = %e, "scratch dir not removed");
            }
        }
    }
}
