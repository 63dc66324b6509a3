//! Language runtimes and their registry.
//!
//! A [`Runtime`] is the language-agnostic surface the REPL and CLI drive:
//! init, gated command/file execution, syntax classification and
//! interruption. Local interpreters and the remote compile service plug in
//! behind the same trait, and the [`RuntimeRegistry`] maps a [`Language`]
//! to its runtime instance. Registries are plain values constructed where
//! they are needed; there is no process-global instance.

use crate::config::Config;
use crate::error::ReplboxError;
use crate::files::FileStore;
use crate::gate::{ExclusiveGate, GateGuard};
use crate::output::{Output, SyntaxStatus};
use crate::remote::{api::ApiClient, RemoteBackend, RemoteTarget};
use crate::syntax::{JavaScriptClassifier, PythonClassifier, RubyClassifier};
use crate::worker::{harness::HarnessSpec, WorkerBackend};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Languages the orchestrator can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    Ruby,
    JavaScript,
    TypeScript,
    Cpp,
    Rust,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Python,
        Language::Ruby,
        Language::JavaScript,
        Language::TypeScript,
        Language::Cpp,
        Language::Rust,
    ];

    pub fn spec(self) -> LanguageSpec {
        match self {
            Language::Python => LanguageSpec {
                tab_size: 4,
                prompt: Some(">>> "),
                prompt_more: Some("... "),
                return_prefix: None,
                source_extensions: &[".py"],
            },
            Language::Ruby => LanguageSpec {
                tab_size: 2,
                prompt: Some("irb> "),
                prompt_more: Some("irb* "),
                return_prefix: Some("=> "),
                source_extensions: &[".rb"],
            },
            Language::JavaScript => LanguageSpec {
                tab_size: 2,
                prompt: Some("> "),
                prompt_more: Some("... "),
                return_prefix: None,
                source_extensions: &[".js", ".mjs"],
            },
            Language::TypeScript => LanguageSpec {
                tab_size: 2,
                prompt: Some("> "),
                prompt_more: Some("... "),
                return_prefix: None,
                source_extensions: &[".ts"],
            },
            Language::Cpp => LanguageSpec {
                tab_size: 4,
                prompt: None,
                prompt_more: None,
                return_prefix: None,
                source_extensions: &[".cpp", ".cc"],
            },
            Language::Rust => LanguageSpec {
                tab_size: 4,
                prompt: None,
                prompt_more: None,
                return_prefix: None,
                source_extensions: &[".rs"],
            },
        }
    }

    /// Whether this language offers an interactive session at all.
    pub fn supports_repl(self) -> bool {
        self.spec().prompt.is_some()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Language::Python => "python",
            Language::Ruby => "ruby",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Cpp => "cpp",
            Language::Rust => "rust",
        };
        f.write_str(s)
    }
}

impl FromStr for Language {
    type Err = ReplboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "ruby" | "rb" => Ok(Language::Ruby),
            "javascript" | "js" => Ok(Language::JavaScript),
            "typescript" | "ts" => Ok(Language::TypeScript),
            "cpp" | "c++" => Ok(Language::Cpp),
            "rust" | "rs" => Ok(Language::Rust),
            other => Err(ReplboxError::UnknownLanguage(other.into())),
        }
    }
}

/// Static display and editing constants for one language.
#[derive(Debug, Clone, Copy)]
pub struct LanguageSpec {
    pub tab_size: usize,
    /// REPL prompt; `None` means the language is file-execution only.
    pub prompt: Option<&'static str>,
    pub prompt_more: Option<&'static str>,
    /// Prefix printed before `return`-kind outputs, irb style.
    pub return_prefix: Option<&'static str>,
    /// Extensions of files handed to the compiler/interpreter; everything
    /// else ships as supporting data. Headers are supporting: they are
    /// included, never compiled on their own.
    pub source_extensions: &'static [&'static str],
}

impl LanguageSpec {
    /// Split a project file name into source vs supporting.
    pub fn is_source_file(&self, name: &str) -> bool {
        self.source_extensions.iter().any(|ext| name.ends_with(ext))
    }
}

/// The language-agnostic execution surface.
#[async_trait]
pub trait Runtime: Send + Sync {
    fn language(&self) -> Language;
    fn is_ready(&self) -> bool;
    fn gate(&self) -> &ExclusiveGate;
    fn files(&self) -> &FileStore;

    async fn init(&self) -> Result<(), ReplboxError>;
    async fn run_command(&self, guard: &GateGuard, code: &str)
        -> Result<Vec<Output>, ReplboxError>;
    async fn run_file(&self, guard: &GateGuard, entry: &str) -> Result<Vec<Output>, ReplboxError>;
    async fn check_syntax(&self, code: &str) -> SyntaxStatus;
    async fn interrupt(&self) -> Result<(), ReplboxError>;

    /// Display form of the command line this runtime stands in for.
    fn command_line_hint(&self, entry: &str) -> Option<String>;
}

/// A local interpreter worker as a [`Runtime`].
pub struct WorkerRuntime {
    language: Language,
    backend: WorkerBackend,
}

impl WorkerRuntime {
    pub fn new(language: Language, backend: WorkerBackend) -> Self {
        Self { language, backend }
    }

    pub fn backend(&self) -> &WorkerBackend {
        &self.backend
    }
}

#[async_trait]
impl Runtime for WorkerRuntime {
    fn language(&self) -> Language {
        self.language
    }

    fn is_ready(&self) -> bool {
        self.backend.is_ready()
    }

    fn gate(&self) -> &ExclusiveGate {
        self.backend.gate()
    }

    fn files(&self) -> &FileStore {
        self.backend.files()
    }

    async fn init(&self) -> Result<(), ReplboxError> {
        self.backend.init().await?;
        Ok(())
    }

    async fn run_command(
        &self,
        guard: &GateGuard,
        code: &str,
    ) -> Result<Vec<Output>, ReplboxError> {
        Ok(self.backend.run_command(guard, code).await?)
    }

    async fn run_file(&self, guard: &GateGuard, entry: &str) -> Result<Vec<Output>, ReplboxError> {
        Ok(self.backend.run_file(guard, entry).await?)
    }

    async fn check_syntax(&self, code: &str) -> SyntaxStatus {
        self.backend.check_syntax(code).await
    }

    async fn interrupt(&self) -> Result<(), ReplboxError> {
        Ok(self.backend.interrupt().await?)
    }

    fn command_line_hint(&self, entry: &str) -> Option<String> {
        match self.language {
            Language::Python => Some(format!("python {entry}")),
            Language::Ruby => Some(format!("ruby {entry}")),
            Language::JavaScript | Language::TypeScript => Some(format!("node {entry}")),
            _ => None,
        }
    }
}

/// The remote compile service as a [`Runtime`].
pub struct RemoteRuntime {
    language: Language,
    backend: RemoteBackend,
}

impl RemoteRuntime {
    pub fn new(language: Language, backend: RemoteBackend) -> Self {
        Self { language, backend }
    }
}

#[async_trait]
impl Runtime for RemoteRuntime {
    fn language(&self) -> Language {
        self.language
    }

    fn is_ready(&self) -> bool {
        self.backend.is_ready()
    }

    fn gate(&self) -> &ExclusiveGate {
        self.backend.gate()
    }

    fn files(&self) -> &FileStore {
        self.backend.files()
    }

    async fn init(&self) -> Result<(), ReplboxError> {
        self.backend.init().await
    }

    async fn run_command(
        &self,
        guard: &GateGuard,
        code: &str,
    ) -> Result<Vec<Output>, ReplboxError> {
        self.backend.run_command(guard, code).await
    }

    async fn run_file(&self, guard: &GateGuard, entry: &str) -> Result<Vec<Output>, ReplboxError> {
        self.backend.run_file(guard, entry).await
    }

    async fn check_syntax(&self, code: &str) -> SyntaxStatus {
        self.backend.check_syntax(code)
    }

    async fn interrupt(&self) -> Result<(), ReplboxError> {
        Ok(self.backend.interrupt().await?)
    }

    fn command_line_hint(&self, entry: &str) -> Option<String> {
        self.backend.command_line_hint(entry)
    }
}

/// Maps languages to runtime instances.
#[derive(Default)]
pub struct RuntimeRegistry {
    runtimes: HashMap<Language, Arc<dyn Runtime>>,
}

impl RuntimeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, runtime: Arc<dyn Runtime>) {
        self.runtimes.insert(runtime.language(), runtime);
    }

    pub fn get(&self, language: Language) -> Result<Arc<dyn Runtime>, ReplboxError> {
        self.runtimes
            .get(&language)
            .cloned()
            .ok_or_else(|| ReplboxError::UnknownLanguage(language.to_string()))
    }

    pub fn languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.runtimes.keys().copied().collect();
        languages.sort_by_key(|l| l.to_string());
        languages
    }

    /// The full standard runtime set: harness workers for the interpreted
    /// languages, the remote service for the compiled ones.
    pub fn standard(config: &Config) -> Self {
        let mut registry = Self::new();

        let python = HarnessSpec::python().with_program(&config.interpreters.python);
        registry.register(Arc::new(WorkerRuntime::new(
            Language::Python,
            WorkerBackend::new(
                Box::new(python),
                Some(Box::new(PythonClassifier)),
                FileStore::new(),
            ),
        )));

        let ruby = HarnessSpec::ruby().with_program(&config.interpreters.ruby);
        registry.register(Arc::new(WorkerRuntime::new(
            Language::Ruby,
            WorkerBackend::new(
                Box::new(ruby),
                Some(Box::new(RubyClassifier)),
                FileStore::new(),
            ),
        )));

        for language in [Language::JavaScript, Language::TypeScript] {
            let node = HarnessSpec::node().with_program(&config.interpreters.node);
            registry.register(Arc::new(WorkerRuntime::new(
                language,
                WorkerBackend::new(
                    Box::new(node),
                    Some(Box::new(JavaScriptClassifier)),
                    FileStore::new(),
                ),
            )));
        }

        for (language, target) in [(Language::Cpp, RemoteTarget::Cpp), (Language::Rust, RemoteTarget::Rust)] {
            registry.register(Arc::new(RemoteRuntime::new(
                language,
                RemoteBackend::new(
                    ApiClient::new(&config.remote.base_url),
                    target,
                    FileStore::new(),
                ),
            )));
        }

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_parsing_accepts_aliases() {
        assert_eq!("py".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("c++".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!("TS".parse::<Language>().unwrap(), Language::TypeScript);
        assert!(matches!(
            "fortran".parse::<Language>(),
            Err(ReplboxError::UnknownLanguage(_))
        ));
    }

    #[test]
    fn repl_support_follows_prompt() {
        assert!(Language::Python.supports_repl());
        assert!(Language::Ruby.supports_repl());
        assert!(!Language::Cpp.supports_repl());
        assert!(!Language::Rust.supports_repl());
    }

    #[test]
    fn source_file_split() {
        let spec = Language::Cpp.spec();
        assert!(spec.is_source_file("main.cpp"));
        assert!(spec.is_source_file("impl.cc"));
        assert!(!spec.is_source_file("util.hpp"));
        assert!(!spec.is_source_file("data.txt"));
        assert!(Language::Python.spec().is_source_file("main.py"));
    }

    #[test]
    fn standard_registry_covers_all_languages() {
        let registry = RuntimeRegistry::standard(&Config::default());
        for language in Language::ALL {
            assert!(registry.get(language).is_ok(), "missing {language}");
        }
        assert_eq!(registry.languages().len(), Language::ALL.len());
    }

    #[test]
    fn missing_language_is_an_error() {
        let registry = RuntimeRegistry::new();
        assert!(matches!(
            registry.get(Language::Python),
            Err(ReplboxError::UnknownLanguage(_))
        ));
    }
}
