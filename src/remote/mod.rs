//! Remote compile-and-run backend.
//!
//! Compiled languages have no local interpreter to host; their programs go
//! to a wandbox-style sandbox service instead. The backend keeps the same
//! outward surface as a local worker — gate, file store, the output record
//! contract — but `runCode` is refused (there is no persistent session to
//! evaluate into) and interruption is unavailable once a run is in flight.

pub mod api;
pub mod cpp;
pub mod filter;
pub mod rustlang;

use crate::error::{BackendError, ReplboxError};
use crate::files::FileStore;
use crate::gate::{ExclusiveGate, GateGuard};
use crate::output::{Output, SyntaxStatus};
use crate::runtime::Language;
use api::ApiClient;
use filter::EventFilter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::info;

pub const DEFAULT_BASE_URL: &str = "https://wandbox.org";

const NOT_READY: &str = "remote backend is not ready yet";
const NO_REPL: &str = "interactive evaluation is not supported for compiled languages";

/// Which compiled language this backend serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteTarget {
    Cpp,
    Rust,
}

/// The compiler and switches chosen from the service's list.
#[derive(Debug, Clone)]
pub struct CompilerSelection {
    pub name: String,
    /// Enabled switch names, comma-joined on the wire.
    pub options: Vec<String>,
    /// Literal command-line arguments, newline-joined on the wire.
    pub raw_options: Vec<String>,
    /// Display form of the compile command.
    pub command_line: Vec<String>,
}

pub struct RemoteBackend {
    gate: ExclusiveGate,
    api: ApiClient,
    target: RemoteTarget,
    selection: Mutex<Option<CompilerSelection>>,
    ready: AtomicBool,
    store: FileStore,
}

impl RemoteBackend {
    pub fn new(api: ApiClient, target: RemoteTarget, store: FileStore) -> Self {
        Self {
            gate: ExclusiveGate::new(),
            api,
            target,
            selection: Mutex::new(None),
            ready: AtomicBool::new(false),
            store,
        }
    }

    pub fn gate(&self) -> &ExclusiveGate {
        &self.gate
    }

    pub fn files(&self) -> &FileStore {
        &self.store
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn target(&self) -> RemoteTarget {
        self.target
    }

    /// Fetch the compiler list and lock in the compiler selection.
    pub async fn init(&self) -> Result<(), ReplboxError> {
        let list = self.api.list().await?;
        let selection = match self.target {
            RemoteTarget::Cpp => cpp::select_compiler(&list)?,
            RemoteTarget::Rust => rustlang::select_compiler(&list)?,
        };
        info!(compiler = %selection.name, "remote compiler selected");
        *self.selection.lock().expect("selection poisoned") = Some(selection);
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn selection(&self) -> Option<CompilerSelection> {
        self.selection.lock().expect("selection poisoned").clone()
    }

    /// Compile and run the project with `entry` as the entry file,
    /// streaming the service's events through the per-language filter.
    pub async fn run_file(
        &self,
        guard: &GateGuard,
        entry: &str,
    ) -> Result<Vec<Output>, ReplboxError> {
        self.gate.verify(guard).map_err(ReplboxError::Backend)?;
        let Some(selection) = self.selection() else {
            return Ok(vec![Output::error(NOT_READY)]);
        };
        if !self.is_ready() {
            return Ok(vec![Output::error(NOT_READY)]);
        }

        let files = self.store.snapshot();
        let (request, trace): (_, Box<dyn filter::TraceFilter>) = match self.target {
            RemoteTarget::Cpp => {
                let sources = self.cpp_sources(entry);
                (
                    cpp::build_request(&selection, &files, &sources),
                    Box::new(cpp::CppTraceFilter::default()),
                )
            }
            RemoteTarget::Rust => (
                rustlang::build_request(&selection, &files, entry),
                Box::new(rustlang::RustTraceFilter::default()),
            ),
        };

        let mut event_filter = EventFilter::new(trace);
        let mut outputs = Vec::new();
        self.api
            .compile_stream(&request, |event| {
                outputs.extend(event_filter.accept(&event));
            })
            .await?;
        outputs.extend(event_filter.finish());
        Ok(outputs)
    }

    /// Compiled languages have no persistent session; REPL input is
    /// refused with a single error record.
    pub async fn run_command(
        &self,
        guard: &GateGuard,
        _code: &str,
    ) -> Result<Vec<Output>, ReplboxError> {
        self.gate.verify(guard).map_err(ReplboxError::Backend)?;
        Ok(vec![Output::error(NO_REPL)])
    }

    /// No REPL means no statement to continue: any buffer is final.
    pub fn check_syntax(&self, _code: &str) -> SyntaxStatus {
        SyntaxStatus::Invalid
    }

    /// A remote run cannot be cancelled once submitted.
    pub async fn interrupt(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Display form of the compile command this backend would run.
    pub fn command_line_hint(&self, entry: &str) -> Option<String> {
        let selection = self.selection()?;
        Some(match self.target {
            RemoteTarget::Cpp => cpp::command_line_hint(&selection, &self.cpp_sources(entry)),
            RemoteTarget::Rust => rustlang::command_line_hint(&selection, entry),
        })
    }

    /// Entry file first, then every other C++ source in the project.
    /// Headers and data files ship with the request but are not named on
    /// the compile command.
    fn cpp_sources(&self, entry: &str) -> Vec<String> {
        let spec = Language::Cpp.spec();
        let mut sources = vec![entry.to_string()];
        for name in self.store.snapshot().keys() {
            if name != entry && spec.is_source_file(name) {
                sources.push(name.clone());
            }
        }
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(target: RemoteTarget) -> RemoteBackend {
        RemoteBackend::new(ApiClient::new(DEFAULT_BASE_URL), target, FileStore::new())
    }

    #[tokio::test]
    async fn run_command_is_refused() {
        let backend = backend(RemoteTarget::Cpp);
        let guard = backend.gate().acquire().await;
        let output = backend.run_command(&guard, "1 + 1").await.unwrap();
        assert_eq!(output, vec![Output::error(NO_REPL)]);
    }

    #[tokio::test]
    async fn run_file_before_init_yields_error_output() {
        let backend = backend(RemoteTarget::Rust);
        let guard = backend.gate().acquire().await;
        let output = backend.run_file(&guard, "main.rs").await.unwrap();
        assert_eq!(output, vec![Output::error(NOT_READY)]);
    }

    #[test]
    fn check_syntax_is_always_invalid() {
        let backend = backend(RemoteTarget::Cpp);
        assert_eq!(backend.check_syntax("int main() {}"), SyntaxStatus::Invalid);
    }

    #[tokio::test]
    async fn cpp_sources_put_entry_first_and_skip_headers() {
        let backend = backend(RemoteTarget::Cpp);
        backend.files().write("zz.cpp", "");
        backend.files().write("impl.cc", "");
        backend.files().write("main.cpp", "");
        backend.files().write("util.hpp", "");
        backend.files().write("data.txt", "");
        assert_eq!(
            backend.cpp_sources("main.cpp"),
            vec!["main.cpp", "impl.cc", "zz.cpp"]
        );
    }
}
