//! Shared data model for command execution.
//!
//! Every backend, local or remote, reduces its work to an ordered stream of
//! [`Output`] records. The record shape is a stable boundary contract: the
//! rendering layer consumes `{type, message}` pairs and nothing else.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Classification of a single output record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Normal program output.
    Stdout,
    /// Program diagnostics that are not failures by themselves.
    Stderr,
    /// An execution failure (exception, compile error, not-ready backend).
    Error,
    /// The value of the evaluated expression, REPL style.
    Return,
    /// A filtered stack-trace frame.
    Trace,
    /// Orchestrator-level status (abnormal exit, interruption notices).
    System,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
            Self::Error => "error",
            Self::Return => "return",
            Self::Trace => "trace",
            Self::System => "system",
        };
        f.write_str(s)
    }
}

/// One record produced during command execution.
///
/// Ordering within a single command's execution is preserved end to end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    #[serde(rename = "type")]
    pub kind: OutputKind,
    pub message: String,
}

impl Output {
    pub fn new(kind: OutputKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn stdout(message: impl Into<String>) -> Self {
        Self::new(OutputKind::Stdout, message)
    }

    pub fn stderr(message: impl Into<String>) -> Self {
        Self::new(OutputKind::Stderr, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(OutputKind::Error, message)
    }

    pub fn ret(message: impl Into<String>) -> Self {
        Self::new(OutputKind::Return, message)
    }

    pub fn trace(message: impl Into<String>) -> Self {
        Self::new(OutputKind::Trace, message)
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(OutputKind::System, message)
    }

    /// True for the kinds that mark a failed execution.
    pub fn is_error(&self) -> bool {
        self.kind == OutputKind::Error
    }
}

/// Result of classifying accumulated REPL input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyntaxStatus {
    /// The buffer parses as a full statement and can be executed.
    Complete,
    /// The buffer is a valid prefix; wait for more input.
    Incomplete,
    /// The buffer can never become valid; reject it.
    Invalid,
}

/// A command together with the outputs its execution produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub command: String,
    pub output: Vec<Output>,
}

impl CommandRecord {
    pub fn new(command: impl Into<String>, output: Vec<Output>) -> Self {
        Self {
            command: command.into(),
            output,
        }
    }

    /// True when no output record marks a failure.
    pub fn succeeded(&self) -> bool {
        !self.output.iter().any(Output::is_error)
    }
}

/// The virtual file namespace visible to one backend.
///
/// BTreeMap keeps iteration deterministic, which keeps wire payloads and
/// test assertions stable.
pub type FileMap = BTreeMap<String, String>;
