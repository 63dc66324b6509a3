//! Remote compile service API.
//!
//! The service is a wandbox-style sandbox: `GET /api/list.json` describes
//! the available compilers and `POST /api/compile.ndjson` streams the
//! compile-and-run session back as newline-delimited `{type, data}` events.
//! Field names on the wire are kebab-case.

use crate::error::RemoteError;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One option inside a select switch.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectOption {
    pub name: String,
    #[serde(rename = "display-name")]
    pub display_name: String,
    #[serde(rename = "display-flags")]
    pub display_flags: String,
}

/// A compiler switch: an on/off flag or a one-of-N choice.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Switch {
    Single {
        name: String,
        #[serde(rename = "display-name")]
        display_name: String,
        #[serde(rename = "display-flags")]
        display_flags: String,
        default: bool,
    },
    Select {
        name: String,
        options: Vec<SelectOption>,
        default: String,
    },
}

/// One entry of the service's compiler list.
#[derive(Debug, Clone, Deserialize)]
pub struct CompilerInfo {
    pub name: String,
    pub version: String,
    pub language: String,
    #[serde(rename = "display-name")]
    pub display_name: String,
    #[serde(rename = "display-compile-command")]
    pub display_compile_command: String,
    #[serde(default)]
    pub switches: Vec<Switch>,
}

/// An additional source file shipped with a compile request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub file: String,
    pub code: String,
}

/// Body of `POST /api/compile.ndjson`.
///
/// `options` carries enabled switch names comma-joined; the raw option
/// fields carry newline-joined literal command-line arguments. Submissions
/// are never saved server-side.
#[derive(Debug, Clone, Serialize)]
pub struct CompileRequest {
    pub compiler: String,
    pub code: String,
    pub codes: Vec<SourceFile>,
    pub options: String,
    pub stdin: String,
    #[serde(rename = "compiler-option-raw")]
    pub compiler_option_raw: String,
    #[serde(rename = "runtime-option-raw")]
    pub runtime_option_raw: String,
    pub save: bool,
    pub is_private: bool,
}

impl CompileRequest {
    pub fn new(compiler: impl Into<String>) -> Self {
        Self {
            compiler: compiler.into(),
            code: String::new(),
            codes: Vec::new(),
            options: String::new(),
            stdin: String::new(),
            compiler_option_raw: String::new(),
            runtime_option_raw: String::new(),
            save: false,
            is_private: true,
        }
    }
}

/// One event of the ndjson compile stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NdjsonEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: String,
}

/// HTTP client for one remote compile service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the compiler list.
    pub async fn list(&self) -> Result<Vec<CompilerInfo>, RemoteError> {
        let url = format!("{}/api/list.json", self.base_url);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status(status, body));
        }
        let list = response
            .json::<Vec<CompilerInfo>>()
            .await
            .map_err(|e| RemoteError::Malformed(format!("compiler list: {e}")))?;
        debug!(compilers = list.len(), "fetched compiler list");
        Ok(list)
    }

    /// Compile and run, delivering each stream event to `on_event` as it
    /// arrives. Events are newline-delimited JSON; chunk boundaries need
    /// not align with lines.
    pub async fn compile_stream<F>(
        &self,
        request: &CompileRequest,
        mut on_event: F,
    ) -> Result<(), RemoteError>
    where
        F: FnMut(NdjsonEvent),
    {
        let url = format!("{}/api/compile.ndjson", self.base_url);
        let response = self.http.post(&url).json(request).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status(status, body));
        }

        let mut stream = response.bytes_stream();
        let mut buf = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buf.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(pos) = buf.find('\n') {
                let line: String = buf.drain(..=pos).collect();
                dispatch_line(line.trim_end_matches('\n'), &mut on_event);
            }
        }
        if !buf.trim().is_empty() {
            dispatch_line(&buf, &mut on_event);
        }
        Ok(())
    }
}

fn dispatch_line<F: FnMut(NdjsonEvent)>(line: &str, on_event: &mut F) {
    if line.trim().is_empty() {
        return;
    }
    match serde_json::from_str::<NdjsonEvent>(line) {
        Ok(event) => on_event(event),
        Err(e) => warn!(error = %e, "dropping malformed stream event"),
    }
}
