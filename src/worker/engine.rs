//! In-process worker engines.
//!
//! An [`Engine`] is an interpreter hosted on a dedicated thread inside the
//! orchestrator process. It speaks the same wire protocol as a child
//! process, just without crossing a process boundary: the transport feeds
//! it encoded request lines and [`handle_request`] turns each into an
//! encoded response line.
//!
//! Engines are handed the session's [`InterruptBuffer`]
//! (crate::interrupt::InterruptBuffer) at construction and are expected to
//! poll it at safe points during evaluation.

use crate::output::{FileMap, Output, SyntaxStatus};
use crate::protocol::{
    CheckSyntaxResponse, ExecResponse, InitResponse, RequestBody, RequestEnvelope,
    ResponseEnvelope, RestoreStateResponse, WireCapabilities,
};

/// Result of one evaluation: the output stream plus any files the program
/// created or modified.
#[derive(Debug, Default)]
pub struct EvalOutcome {
    pub output: Vec<Output>,
    pub updated_files: FileMap,
}

impl EvalOutcome {
    pub fn with_output(output: Vec<Output>) -> Self {
        Self {
            output,
            updated_files: FileMap::new(),
        }
    }
}

/// A synchronous interpreter session. One engine instance backs one worker
/// lifetime; a restart constructs a fresh engine.
///
/// Operation failures are reported as strings and travel the wire as the
/// envelope's `error` field.
pub trait Engine: Send + 'static {
    fn init(&mut self) -> Result<WireCapabilities, String>;

    /// Evaluate REPL input against persistent session state.
    fn eval(&mut self, code: &str) -> Result<EvalOutcome, String>;

    /// Materialize `files` and execute the entry file `name`.
    fn run_file(&mut self, name: &str, files: FileMap) -> Result<EvalOutcome, String>;

    /// Classify accumulated input without mutating session state.
    fn check_syntax(&mut self, code: &str) -> Result<SyntaxStatus, String>;

    /// Re-execute previously successful commands, discarding their output.
    fn restore(&mut self, commands: Vec<String>) -> Result<(), String>;
}

/// Decode one request line, dispatch it and encode the response line.
pub fn handle_request(engine: &mut dyn Engine, line: &str) -> String {
    let envelope: RequestEnvelope = match serde_json::from_str(line) {
        Ok(env) => env,
        Err(e) => {
            // Without an envelope there is no id to answer under; answer
            // id 0 so the line is at least visible to the dispatcher log.
            return encode(ResponseEnvelope {
                id: 0,
                payload: None,
                error: Some(format!("malformed request: {e}")),
            });
        }
    };

    let result = match envelope.body {
        RequestBody::Init(_) => engine
            .init()
            .map(|capabilities| to_value(InitResponse { capabilities })),
        RequestBody::RunCode(req) => engine.eval(&req.code).map(outcome_to_value),
        RequestBody::RunFile(req) => engine.run_file(&req.name, req.files).map(outcome_to_value),
        RequestBody::CheckSyntax(req) => engine
            .check_syntax(&req.code)
            .map(|status| to_value(CheckSyntaxResponse { status })),
        RequestBody::RestoreState(req) => engine
            .restore(req.commands)
            .map(|()| to_value(RestoreStateResponse::default())),
    };

    let response = match result {
        Ok(payload) => ResponseEnvelope {
            id: envelope.id,
            payload: Some(payload),
            error: None,
        },
        Err(message) => ResponseEnvelope {
            id: envelope.id,
            payload: None,
            error: Some(message),
        },
    };
    encode(response)
}

fn outcome_to_value(outcome: EvalOutcome) -> serde_json::Value {
    to_value(ExecResponse {
        output: outcome.output,
        updated_files: outcome.updated_files,
    })
}

fn to_value<T: serde::Serialize>(value: T) -> serde_json::Value {
    // Response payloads are plain structs; serialization cannot fail.
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

fn encode(response: ResponseEnvelope) -> String {
    serde_json::to_string(&response)
        .unwrap_or_else(|_| format!(r#"{{"id":{},"error":"encoding failure"}}"#, response.id))
}
