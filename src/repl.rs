//! REPL input buffering.
//!
//! [`ReplSession`] accumulates lines until the language's classifier says
//! the buffer is a full statement. Classification is the caller's job
//! (it may involve a round trip to a worker); the session only holds the
//! buffer and decides submit-vs-continue from the result. Invalid input is
//! submitted too: the interpreter's own error message beats anything the
//! orchestrator could synthesize.

use crate::output::SyntaxStatus;
use crate::runtime::LanguageSpec;

/// Accumulated multi-line REPL input.
#[derive(Debug, Default)]
pub struct ReplSession {
    lines: Vec<String>,
}

impl ReplSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    /// The buffer as the source text handed to `checkSyntax`.
    pub fn source(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Resolve the buffer against a classification: a complete or invalid
    /// buffer is taken for execution, an incomplete one stays and waits
    /// for the next line.
    pub fn take_if_ready(&mut self, status: SyntaxStatus) -> Option<String> {
        match status {
            SyntaxStatus::Incomplete => None,
            SyntaxStatus::Complete | SyntaxStatus::Invalid => {
                let source = self.source();
                self.lines.clear();
                Some(source)
            }
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// The prompt to show before the next line.
    pub fn prompt(&self, spec: &LanguageSpec) -> &'static str {
        if self.is_empty() {
            spec.prompt.unwrap_or("")
        } else {
            spec.prompt_more.or(spec.prompt).unwrap_or("")
        }
    }
}
