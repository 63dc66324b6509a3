//! Backend wire protocol.
//!
//! Requests and responses are newline-delimited JSON envelopes correlated by
//! a per-channel monotonically increasing integer id:
//!
//! ```text
//! -> {"id":0,"type":"init","payload":{}}
//! <- {"id":0,"payload":{"capabilities":{"interrupt":"buffer","checkSyntax":true}}}
//! -> {"id":1,"type":"runCode","payload":{"code":"print(1)"}}
//! <- {"id":1,"payload":{"output":[{"type":"stdout","message":"1"}],"updatedFiles":{}}}
//! ```
//!
//! A failed operation answers `{"id":n,"error":"..."}` instead of a payload.
//! The [`WireRequest`] trait pairs each request payload type with its
//! response payload type so the channel can stay generic.

use crate::interrupt::InterruptStrategy;
use crate::output::{FileMap, Output, SyntaxStatus};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Capabilities a worker reports in its `init` response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WireCapabilities {
    /// Which cancellation strategy this worker supports.
    pub interrupt: InterruptStrategy,
    /// Whether the worker answers `checkSyntax` with its own parser.
    /// Workers without one leave this false and the orchestrator falls back
    /// to the built-in classifier for the language.
    #[serde(default, rename = "checkSyntax")]
    pub check_syntax: bool,
}

/// Request envelope: `{"id": n, "type": ..., "payload": ...}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub id: u64,
    #[serde(flatten)]
    pub body: RequestBody,
}

/// The typed operation carried by a request envelope.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum RequestBody {
    #[serde(rename = "init")]
    Init(InitRequest),
    #[serde(rename = "runCode")]
    RunCode(RunCodeRequest),
    #[serde(rename = "runFile")]
    RunFile(RunFileRequest),
    #[serde(rename = "checkSyntax")]
    CheckSyntax(CheckSyntaxRequest),
    #[serde(rename = "restoreState")]
    RestoreState(RestoreStateRequest),
}

/// Response envelope: success carries `payload`, failure carries `error`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Operation payloads
// ---------------------------------------------------------------------------

/// `init`: prepare the interpreter.
///
/// In-process workers receive the interrupt-buffer handle out of band at
/// spawn time; child processes cannot share the byte at all, so the wire
/// payload stays empty.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InitRequest {}

#[derive(Debug, Serialize, Deserialize)]
pub struct InitResponse {
    pub capabilities: WireCapabilities,
}

/// `runCode`: evaluate REPL input in the persistent session.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunCodeRequest {
    pub code: String,
}

/// `runFile`: write `files` into the worker's filesystem, then execute the
/// entry file named `name`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunFileRequest {
    pub name: String,
    pub files: FileMap,
}

/// Shared response shape of `runCode` and `runFile`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ExecResponse {
    pub output: Vec<Output>,
    /// Authoritative post-execution state of the worker's filesystem.
    #[serde(default, rename = "updatedFiles")]
    pub updated_files: FileMap,
}

/// `checkSyntax`: classify accumulated REPL input. Must not mutate worker
/// state.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckSyntaxRequest {
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckSyntaxResponse {
    pub status: SyntaxStatus,
}

/// `restoreState`: replay previously successful commands after a restart,
/// discarding their output.
#[derive(Debug, Serialize, Deserialize)]
pub struct RestoreStateRequest {
    pub commands: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RestoreStateResponse {}

// ---------------------------------------------------------------------------
// Typed request/response pairing
// ---------------------------------------------------------------------------

/// Pairs a request payload with its response payload for typed channel sends.
pub trait WireRequest {
    type Response: DeserializeOwned;

    fn into_body(self) -> RequestBody;
}

impl WireRequest for InitRequest {
    type Response = InitResponse;

    fn into_body(self) -> RequestBody {
        RequestBody::Init(self)
    }
}

impl WireRequest for RunCodeRequest {
    type Response = ExecResponse;

    fn into_body(self) -> RequestBody {
        RequestBody::RunCode(self)
    }
}

impl WireRequest for RunFileRequest {
    type Response = ExecResponse;

    fn into_body(self) -> RequestBody {
        RequestBody::RunFile(self)
    }
}

impl WireRequest for CheckSyntaxRequest {
    type Response = CheckSyntaxResponse;

    fn into_body(self) -> RequestBody {
        RequestBody::CheckSyntax(self)
    }
}

impl WireRequest for RestoreStateRequest {
    type Response = RestoreStateResponse;

    fn into_body(self) -> RequestBody {
        RequestBody::RestoreState(self)
    }
}
