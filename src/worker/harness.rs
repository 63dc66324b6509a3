//! Interpreter harness scripts and their spawn specifications.
//!
//! Each harness is a small program embedded at compile time and written to
//! a scratch directory at spawn. It turns a stock interpreter into a wire
//! worker: read request lines from stdin, answer response lines on stdout,
//! keep interpreter state between `runCode` calls.

use crate::channel::Transport;
use crate::error::BackendError;
use crate::interrupt::InterruptBuffer;
use crate::worker::stdio::StdioTransport;
use crate::worker::WorkerSpawner;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

pub const PYTHON_HARNESS: &str = include_str!("../../assets/harness.py");
pub const RUBY_HARNESS: &str = include_str!("../../assets/harness.rb");
pub const NODE_HARNESS: &str = include_str!("../../assets/harness.js");

/// How to start one interpreter harness.
#[derive(Debug, Clone)]
pub struct HarnessSpec {
    program: String,
    file_name: &'static str,
    script: &'static str,
}

impl HarnessSpec {
    pub fn python() -> Self {
        Self {
            program: "python3".into(),
            file_name: "harness.py",
            script: PYTHON_HARNESS,
        }
    }

    pub fn ruby() -> Self {
        Self {
            program: "ruby".into(),
            file_name: "harness.rb",
            script: RUBY_HARNESS,
        }
    }

    /// Serves both javascript and typescript sessions; the harness itself
    /// strips types when the entry file calls for it.
    pub fn node() -> Self {
        Self {
            program: "node".into(),
            file_name: "harness.js",
            script: NODE_HARNESS,
        }
    }

    /// Override the interpreter binary (configuration hook).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Write the embedded script to the scratch directory. Concurrent
    /// sessions may race here; the content is identical so last write wins
    /// harmlessly.
    async fn materialize(&self) -> Result<PathBuf, BackendError> {
        let dir = std::env::temp_dir().join("replbox-harness");
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(self.file_name);
        tokio::fs::write(&path, self.script).await?;
        Ok(path)
    }
}

/// A fresh working directory for one worker. Each spawn gets its own so
/// project files never leak between backends; the transport removes it
/// again on shutdown.
fn scratch_dir() -> PathBuf {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    std::env::temp_dir().join(format!(
        "replbox-{}-{}",
        std::process::id(),
        SEQ.fetch_add(1, Ordering::Relaxed)
    ))
}

#[async_trait]
impl WorkerSpawner for HarnessSpec {
    async fn spawn(
        &self,
        _interrupt: InterruptBuffer,
    ) -> Result<(Arc<dyn Transport>, mpsc::UnboundedReceiver<String>), BackendError> {
        let script = self.materialize().await?;
        debug!(program = %self.program, script = %script.display(), "spawning worker");

        let work_dir = scratch_dir();
        tokio::fs::create_dir_all(&work_dir).await?;

        let mut command = Command::new(&self.program);
        command.arg(&script).current_dir(&work_dir);
        let (transport, rx) = StdioTransport::spawn(command, Some(work_dir))?;
        Ok((Arc::new(transport), rx))
    }
}
