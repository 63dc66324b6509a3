//! Stream event filtering.
//!
//! Turns the compile service's raw event stream into the shared
//! [`Output`] record stream. Event payloads are arbitrary chunks, so each
//! category accumulates text and emits only on complete lines; stderr
//! lines additionally pass through a per-language [`TraceFilter`] that
//! recognizes the instrumentation markers and rewrites raw stack traces
//! into `trace` records scoped to the user's own code.

use crate::output::Output;
use crate::remote::api::NdjsonEvent;
use tracing::debug;

/// Splits arbitrary text chunks into complete lines.
#[derive(Debug, Default)]
pub struct LineAccumulator {
    buf: String,
}

impl LineAccumulator {
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buf.push_str(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.find('\n') {
            let line: String = self.buf.drain(..=pos).collect();
            lines.push(line.trim_end_matches('\n').to_string());
        }
        lines
    }

    /// Hand back any trailing partial line.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}

/// Per-language stderr rewriting.
///
/// Receives every complete stderr line in order and decides what reaches
/// the user. Implementations are state machines keyed on the marker lines
/// their instrumentation emits.
pub trait TraceFilter: Send {
    fn feed(&mut self, line: &str) -> Vec<Output>;

    /// Flush state at end of stream.
    fn finish(&mut self) -> Vec<Output> {
        Vec::new()
    }
}

/// No instrumentation: stderr passes through untouched.
#[derive(Debug, Default)]
pub struct PassthroughTrace;

impl TraceFilter for PassthroughTrace {
    fn feed(&mut self, line: &str) -> Vec<Output> {
        vec![Output::stderr(line)]
    }
}

/// Reduces the ndjson event stream to output records.
pub struct EventFilter {
    compiler_out: LineAccumulator,
    compiler_err: LineAccumulator,
    stdout: LineAccumulator,
    stderr: LineAccumulator,
    trace: Box<dyn TraceFilter>,
    exit_code: String,
}

impl EventFilter {
    pub fn new(trace: Box<dyn TraceFilter>) -> Self {
        Self {
            compiler_out: LineAccumulator::default(),
            compiler_err: LineAccumulator::default(),
            stdout: LineAccumulator::default(),
            stderr: LineAccumulator::default(),
            trace,
            exit_code: String::new(),
        }
    }

    /// Map one stream event to zero or more output records.
    pub fn accept(&mut self, event: &NdjsonEvent) -> Vec<Output> {
        match event.kind.as_str() {
            "CompilerMessageS" => self
                .compiler_out
                .push(&event.data)
                .into_iter()
                .map(Output::stdout)
                .collect(),
            "CompilerMessageE" => self
                .compiler_err
                .push(&event.data)
                .into_iter()
                .map(Output::error)
                .collect(),
            "StdOut" => self
                .stdout
                .push(&event.data)
                .into_iter()
                .map(Output::stdout)
                .collect(),
            "StdErr" => {
                let mut outputs = Vec::new();
                for line in self.stderr.push(&event.data) {
                    outputs.extend(self.trace.feed(&line));
                }
                outputs
            }
            // Exit status may arrive split across events.
            "ExitCode" => {
                self.exit_code.push_str(&event.data);
                Vec::new()
            }
            "Signal" => vec![Output::system(format!(
                "program terminated by signal {}",
                event.data.trim()
            ))],
            "Control" => Vec::new(),
            other => {
                debug!(kind = other, "ignoring unknown stream event");
                Vec::new()
            }
        }
    }

    /// Flush partial lines and report an abnormal exit status.
    pub fn finish(&mut self) -> Vec<Output> {
        let mut outputs = Vec::new();
        if let Some(line) = self.compiler_out.finish() {
            outputs.push(Output::stdout(line));
        }
        if let Some(line) = self.compiler_err.finish() {
            outputs.push(Output::error(line));
        }
        if let Some(line) = self.stdout.finish() {
            outputs.push(Output::stdout(line));
        }
        if let Some(line) = self.stderr.finish() {
            outputs.extend(self.trace.feed(&line));
        }
        outputs.extend(self.trace.finish());

        let status = self.exit_code.trim();
        if !status.is_empty() && status != "0" {
            outputs.push(Output::system(format!(
                "program exited with status {status}"
            )));
        }
        outputs
    }
}
