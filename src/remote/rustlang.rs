//! Rust support for the remote compile service.
//!
//! The service compiles a single main file, so the user's program is
//! wrapped by a driver (`assets/prog.rs`) that installs a panic hook
//! before calling into the user's code. The driver's hook prints a marker
//! line and forces `RUST_BACKTRACE=1`; the filter uses the marker and the
//! `stack backtrace:` header to cut the raw backtrace down to frames in
//! the user's own files.

use crate::error::RemoteError;
use crate::output::{FileMap, Output};
use crate::remote::api::{CompileRequest, CompilerInfo, SourceFile};
use crate::remote::filter::TraceFilter;
use crate::remote::CompilerSelection;
use regex::Regex;
use std::sync::OnceLock;

pub const DRIVER: &str = include_str!("../../assets/prog.rs");

/// Placeholder the driver uses for the user's main module.
const MAIN_MODULE_SLOT: &str = "__user_main_module__";
/// Marker the driver's panic hook prints before the default hook runs.
const PANIC_MARKER: &str = "#!my_code_panic_hook:";
const TRACE_HEADER: &str = "stack backtrace:";

fn mod_decl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"mod\s+(\w+)\s*;").expect("mod decl pattern"))
}

fn fn_main_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:pub\s+)?(fn\s+main\s*\()").expect("fn main pattern"))
}

fn frame_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d+:").expect("frame pattern"))
}

fn frame_location_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*at \./").expect("frame location pattern"))
}

fn driver_location_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*at \./prog\.rs").expect("driver location pattern"))
}

/// Pick the first Rust compiler the service offers, with debug line info
/// so backtraces resolve to user source locations.
pub fn select_compiler(list: &[CompilerInfo]) -> Result<CompilerSelection, RemoteError> {
    let compiler = list
        .iter()
        .find(|c| c.language == "Rust")
        .ok_or_else(|| RemoteError::CompilerUnavailable("no Rust compiler in list".into()))?;
    Ok(CompilerSelection {
        name: compiler.name.clone(),
        options: Vec::new(),
        raw_options: vec!["-Cdebuginfo=1".into()],
        command_line: vec!["rustc".into(), "-Cdebuginfo=1".into()],
    })
}

/// Assemble the compile request. The driver becomes the compiled main
/// file; the user's entry file is demoted to a module: its `main` is
/// forced `pub` and its `mod` declarations are hoisted into the driver
/// and replaced with `use super::` imports.
pub fn build_request(
    selection: &CompilerSelection,
    files: &FileMap,
    entry: &str,
) -> CompileRequest {
    let main_module = entry.strip_suffix(".rs").unwrap_or(entry);
    let main_source = files.get(entry).cloned().unwrap_or_default();

    let hoisted: String = mod_decl_re()
        .find_iter(&main_source)
        .map(|m| format!("{}\n", m.as_str()))
        .collect();
    let rewritten = fn_main_re().replace_all(&main_source, "pub $1");
    let rewritten = mod_decl_re()
        .replace_all(&rewritten, "use super::$1;")
        .into_owned();

    let mut request = CompileRequest::new(&selection.name);
    request.code = hoisted + &DRIVER.replace(MAIN_MODULE_SLOT, main_module);
    request.compiler_option_raw = selection.raw_options.join("\n");
    request.codes = files
        .iter()
        .map(|(name, code)| SourceFile {
            file: name.clone(),
            code: if name == entry {
                rewritten.clone()
            } else {
                code.clone()
            },
        })
        .collect();
    request
}

/// Display form of the effective compile command.
pub fn command_line_hint(selection: &CompilerSelection, entry: &str) -> String {
    let stem = entry.strip_suffix(".rs").unwrap_or(entry);
    let mut parts = selection.command_line.clone();
    parts.push(entry.into());
    parts.push("&&".into());
    parts.push(format!("./{stem}"));
    parts.join(" ")
}

#[derive(Debug, Default, PartialEq, Eq)]
enum TraceState {
    #[default]
    Normal,
    /// Saw the panic-hook marker; panic message lines follow.
    Panicking,
    /// Inside the backtrace dump.
    Tracing,
}

/// Stderr filter for the driver's panic instrumentation.
///
/// Backtrace frames come in pairs: a numbered symbol line followed by an
/// `at ./file` location line. Only pairs whose location is a relative user
/// path outside the driver survive, with the driver's module prefix
/// stripped from the symbol.
#[derive(Debug, Default)]
pub struct RustTraceFilter {
    state: TraceState,
    pending_frame: Option<String>,
}

impl TraceFilter for RustTraceFilter {
    fn feed(&mut self, line: &str) -> Vec<Output> {
        match self.state {
            TraceState::Normal => {
                if line == PANIC_MARKER {
                    self.state = TraceState::Panicking;
                    Vec::new()
                } else {
                    vec![Output::stderr(line)]
                }
            }
            TraceState::Panicking => {
                if line == TRACE_HEADER {
                    self.state = TraceState::Tracing;
                    vec![Output::trace("Stack trace (filtered):")]
                } else {
                    vec![Output::error(line)]
                }
            }
            TraceState::Tracing => {
                if let Some(frame) = self.pending_frame.take() {
                    if frame_location_re().is_match(line) && !driver_location_re().is_match(line) {
                        // Only the leading driver-module prefix goes; inner
                        // path segments that happen to match stay.
                        return vec![
                            Output::trace(frame.replacen("prog::", "", 1)),
                            Output::trace(line),
                        ];
                    }
                }
                if frame_re().is_match(line) {
                    self.pending_frame = Some(line.to_string());
                }
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiler(name: &str, language: &str) -> CompilerInfo {
        CompilerInfo {
            name: name.into(),
            version: "1.0".into(),
            language: language.into(),
            display_name: name.into(),
            display_compile_command: String::new(),
            switches: vec![],
        }
    }

    #[test]
    fn picks_first_rust_compiler() {
        let list = vec![
            compiler("gcc-13.2.0", "C++"),
            compiler("rust-1.77.0", "Rust"),
            compiler("rust-1.70.0", "Rust"),
        ];
        let selection = select_compiler(&list).unwrap();
        assert_eq!(selection.name, "rust-1.77.0");
        assert_eq!(selection.raw_options, vec!["-Cdebuginfo=1"]);
    }

    #[test]
    fn rewrites_main_file_and_hoists_modules() {
        let selection = select_compiler(&[compiler("rust-1.77.0", "Rust")]).unwrap();
        let mut files = FileMap::new();
        files.insert(
            "main.rs".into(),
            "mod util;\n\nfn main() {\n    util::go();\n}\n".into(),
        );
        files.insert("util.rs".into(), "pub fn go() {}\n".into());

        let request = build_request(&selection, &files, "main.rs");

        assert!(request.code.starts_with("mod util;\n"));
        assert!(request.code.contains("mod main;"));
        assert!(request.code.contains("main::main();"));
        assert!(!request.code.contains(MAIN_MODULE_SLOT));

        let main = request.codes.iter().find(|c| c.file == "main.rs").unwrap();
        assert!(main.code.contains("use super::util;"));
        assert!(main.code.contains("pub fn main("));
        let util = request.codes.iter().find(|c| c.file == "util.rs").unwrap();
        assert_eq!(util.code, "pub fn go() {}\n");
    }

    #[test]
    fn trace_filter_passes_stderr_before_marker() {
        let mut filter = RustTraceFilter::default();
        assert_eq!(
            filter.feed("warning: unused variable"),
            vec![Output::stderr("warning: unused variable")]
        );
    }

    #[test]
    fn panic_message_becomes_error_then_frames_filtered() {
        let mut filter = RustTraceFilter::default();
        assert!(filter.feed(PANIC_MARKER).is_empty());
        assert_eq!(
            filter.feed("thread 'main' panicked at main.rs:3:5:"),
            vec![Output::error("thread 'main' panicked at main.rs:3:5:")]
        );
        assert_eq!(
            filter.feed(TRACE_HEADER),
            vec![Output::trace("Stack trace (filtered):")]
        );

        // Runtime frame with an absolute location: dropped.
        assert!(filter.feed("   0: rust_begin_unwind").is_empty());
        assert!(filter
            .feed("             at /rustc/abc/library/std/src/panicking.rs:645:5")
            .is_empty());

        // Driver frame: dropped.
        assert!(filter.feed("   4: prog::main").is_empty());
        assert!(filter.feed("             at ./prog.rs:13:5").is_empty());

        // User frame pair: kept, with the driver module prefix stripped.
        assert!(filter.feed("   3: prog::main::crash").is_empty());
        assert_eq!(
            filter.feed("             at ./main.rs:3:5"),
            vec![
                Output::trace("   3: main::crash"),
                Output::trace("             at ./main.rs:3:5"),
            ]
        );
    }

    #[test]
    fn driver_prefix_is_stripped_once() {
        let mut filter = RustTraceFilter::default();
        filter.feed(PANIC_MARKER);
        filter.feed(TRACE_HEADER);
        // A user module named prog keeps its own prefix.
        assert!(filter.feed("   2: prog::main::prog::go").is_empty());
        assert_eq!(
            filter.feed("             at ./main.rs:7:9"),
            vec![
                Output::trace("   2: main::prog::go"),
                Output::trace("             at ./main.rs:7:9"),
            ]
        );
    }
}
