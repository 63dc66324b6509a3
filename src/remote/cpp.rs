//! C++ support for the remote compile service.
//!
//! Compiler selection, request assembly and crash-trace filtering. Crash
//! traces come from an injected signal handler (`assets/stacktrace.cpp`)
//! that prints a `Stack trace:` marker followed by a boost::stacktrace
//! dump; the filter keeps only the frames that fall inside the user's own
//! sources.

use crate::error::RemoteError;
use crate::output::{FileMap, Output};
use crate::remote::api::{CompileRequest, CompilerInfo, SourceFile, Switch};
use crate::remote::filter::TraceFilter;
use crate::remote::CompilerSelection;
use tracing::warn;

pub const STACKTRACE_FILE: &str = "_stacktrace.cpp";
pub const STACKTRACE_HANDLER: &str = include_str!("../../assets/stacktrace.cpp");

/// Marker line the injected signal handler prints before the dump.
const TRACE_MARKER: &str = "Stack trace:";
/// Build directory of the sandbox; frames outside it belong to the
/// runtime, not the user.
const SANDBOX_HOME: &str = "/home/wandbox";

/// Pick the C++ compiler and its switches: the first non-head gcc, with
/// warnings on, the newest boost and the newest language standard, and
/// defaults for every other select switch.
pub fn select_compiler(list: &[CompilerInfo]) -> Result<CompilerSelection, RemoteError> {
    let compiler = list
        .iter()
        .filter(|c| c.language == "C++")
        .find(|c| c.name.contains("gcc") && !c.name.contains("head"))
        .ok_or_else(|| RemoteError::CompilerUnavailable("no stable gcc in compiler list".into()))?;

    let mut selection = CompilerSelection {
        name: compiler.name.clone(),
        options: Vec::new(),
        raw_options: vec!["-g".into()],
        command_line: vec!["g++".into()],
    };

    let mut warning_found = false;
    for switch in &compiler.switches {
        match switch {
            Switch::Single {
                name,
                display_flags,
                ..
            } if name == "warning" => {
                warning_found = true;
                selection.options.push(name.clone());
                selection.command_line.push(display_flags.clone());
            }
            Switch::Single { .. } => {}
            Switch::Select {
                name,
                options,
                default,
            } => {
                if name.contains("boost") {
                    let newest = options
                        .iter()
                        .filter(|o| !o.name.contains("nothing"))
                        .max_by(|a, b| a.name.cmp(&b.name));
                    match newest {
                        Some(option) => selection.options.push(option.name.clone()),
                        None => warn!("no boost option available"),
                    }
                } else if name.contains("std") {
                    let newest = options
                        .iter()
                        .filter(|o| o.name.starts_with("c++"))
                        .max_by(|a, b| a.name.cmp(&b.name));
                    match newest {
                        Some(option) => {
                            selection.options.push(option.name.clone());
                            selection.command_line.push(option.display_flags.clone());
                        }
                        None => warn!("no language standard option available"),
                    }
                } else {
                    selection.options.push(default.clone());
                    if let Some(option) = options.iter().find(|o| &o.name == default) {
                        selection.command_line.push(option.display_flags.clone());
                    }
                }
            }
        }
    }
    if !warning_found {
        warn!(compiler = %selection.name, "warning switch not found");
    }

    Ok(selection)
}

/// Assemble the compile request: every project file plus the injected
/// signal handler, with the source file names passed as raw compile
/// arguments since the main `code` slot stays empty.
pub fn build_request(
    selection: &CompilerSelection,
    files: &FileMap,
    sources: &[String],
) -> CompileRequest {
    let mut request = CompileRequest::new(&selection.name);
    request.options = selection.options.join(",");

    let mut raw = selection.raw_options.clone();
    raw.extend(sources.iter().cloned());
    raw.push(STACKTRACE_FILE.into());
    request.compiler_option_raw = raw.join("\n");

    request.codes = files
        .iter()
        .map(|(name, code)| SourceFile {
            file: name.clone(),
            code: code.clone(),
        })
        .collect();
    request.codes.push(SourceFile {
        file: STACKTRACE_FILE.into(),
        code: STACKTRACE_HANDLER.into(),
    });
    request
}

/// Display form of the effective compile command.
pub fn command_line_hint(selection: &CompilerSelection, sources: &[String]) -> String {
    let mut parts = selection.command_line.clone();
    parts.extend(sources.iter().cloned());
    parts.push("&&".into());
    parts.push("./a.out".into());
    parts.join(" ")
}

/// Stderr filter for the injected crash handler.
#[derive(Debug, Default)]
pub struct CppTraceFilter {
    tracing: bool,
}

impl TraceFilter for CppTraceFilter {
    fn feed(&mut self, line: &str) -> Vec<Output> {
        if self.tracing {
            // Keep only frames inside the user's sources.
            if line.contains(SANDBOX_HOME) {
                let cleaned = line.replace(&format!("{SANDBOX_HOME}/"), "");
                vec![Output::trace(cleaned)]
            } else {
                Vec::new()
            }
        } else if line == TRACE_MARKER {
            self.tracing = true;
            vec![Output::trace("Stack trace (filtered):")]
        } else {
            vec![Output::stderr(line)]
        }
    }
}
