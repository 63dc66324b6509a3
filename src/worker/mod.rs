//! Local worker backends.
//!
//! A [`WorkerBackend`] owns one isolated interpreter — an in-process
//! [`engine::Engine`] on its own thread or a child process speaking the
//! wire protocol over stdio — plus the orchestration state around it: the
//! exclusive gate, the interrupt buffer, the command history and the
//! project file store. All command execution flows through the gate;
//! interruption follows the strategy the worker declared at init.

pub mod engine;
pub mod harness;
pub mod stdio;
pub mod transport;

use crate::channel::{Channel, Transport};
use crate::error::BackendError;
use crate::files::{FileSink, FileStore};
use crate::gate::{ExclusiveGate, GateGuard};
use crate::history::CommandHistory;
use crate::interrupt::{InterruptBuffer, InterruptStrategy};
use crate::output::{CommandRecord, Output, SyntaxStatus};
use crate::protocol::{
    CheckSyntaxRequest, InitRequest, RestoreStateRequest, RunCodeRequest, RunFileRequest,
    WireCapabilities,
};
use crate::syntax::StatementClassifier;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const NOT_READY: &str = "worker is not ready yet";

/// Creates the transport side of a worker. One spawner serves one backend
/// for its whole life: restarts call it again.
#[async_trait]
pub trait WorkerSpawner: Send + Sync {
    async fn spawn(
        &self,
        interrupt: InterruptBuffer,
    ) -> Result<(Arc<dyn Transport>, mpsc::UnboundedReceiver<String>), BackendError>;
}

/// Spawner for in-process engines.
pub struct EngineSpawner {
    factory: Box<dyn Fn(InterruptBuffer) -> Box<dyn engine::Engine> + Send + Sync>,
}

impl EngineSpawner {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(InterruptBuffer) -> Box<dyn engine::Engine> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
        }
    }
}

#[async_trait]
impl WorkerSpawner for EngineSpawner {
    async fn spawn(
        &self,
        interrupt: InterruptBuffer,
    ) -> Result<(Arc<dyn Transport>, mpsc::UnboundedReceiver<String>), BackendError> {
        let engine = (self.factory)(interrupt);
        let (transport, rx) = transport::LocalTransport::spawn(engine);
        Ok((Arc::new(transport), rx))
    }
}

/// One isolated interpreter and its orchestration state.
pub struct WorkerBackend {
    gate: ExclusiveGate,
    channel: Mutex<Option<Arc<Channel>>>,
    ready: AtomicBool,
    capabilities: Mutex<Option<WireCapabilities>>,
    interrupt: InterruptBuffer,
    history: Mutex<CommandHistory>,
    store: FileStore,
    spawner: Box<dyn WorkerSpawner>,
    classifier: Option<Box<dyn StatementClassifier>>,
}

impl WorkerBackend {
    pub fn new(
        spawner: Box<dyn WorkerSpawner>,
        classifier: Option<Box<dyn StatementClassifier>>,
        store: FileStore,
    ) -> Self {
        Self {
            gate: ExclusiveGate::new(),
            channel: Mutex::new(None),
            ready: AtomicBool::new(false),
            capabilities: Mutex::new(None),
            interrupt: InterruptBuffer::new(),
            history: Mutex::new(CommandHistory::new()),
            store,
            spawner,
            classifier,
        }
    }

    pub fn gate(&self) -> &ExclusiveGate {
        &self.gate
    }

    pub fn files(&self) -> &FileStore {
        &self.store
    }

    pub fn interrupt_buffer(&self) -> InterruptBuffer {
        self.interrupt.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn capabilities(&self) -> Option<WireCapabilities> {
        *self.capabilities.lock().expect("capabilities poisoned")
    }

    pub fn strategy(&self) -> Option<InterruptStrategy> {
        self.capabilities().map(|c| c.interrupt)
    }

    fn channel(&self) -> Option<Arc<Channel>> {
        self.channel.lock().expect("channel slot poisoned").clone()
    }

    /// Spawn the worker and perform the `init` handshake.
    pub async fn init(&self) -> Result<WireCapabilities, BackendError> {
        let capabilities = self.connect().await?;
        self.ready.store(true, Ordering::SeqCst);
        info!(strategy = ?capabilities.interrupt, "worker initialized");
        Ok(capabilities)
    }

    async fn connect(&self) -> Result<WireCapabilities, BackendError> {
        let (transport, rx) = self.spawner.spawn(self.interrupt.clone()).await?;
        let channel = Arc::new(Channel::new(transport, rx));
        let init = channel.send(InitRequest::default()).await?;
        *self.channel.lock().expect("channel slot poisoned") = Some(channel);
        *self.capabilities.lock().expect("capabilities poisoned") = Some(init.capabilities);
        Ok(init.capabilities)
    }

    /// Execute REPL input. The caller must hold this backend's gate.
    ///
    /// Per-command failures come back as `error`-kind outputs, not `Err`:
    /// the session survives them. `Err` is reserved for gate misuse and a
    /// broken transport.
    pub async fn run_command(
        &self,
        guard: &GateGuard,
        code: &str,
    ) -> Result<Vec<Output>, BackendError> {
        self.gate.verify(guard)?;
        if !self.is_ready() {
            return Ok(vec![Output::error(NOT_READY)]);
        }
        let Some(channel) = self.channel() else {
            return Ok(vec![Output::error(NOT_READY)]);
        };

        self.interrupt.reset();
        match channel.send(RunCodeRequest { code: code.into() }).await {
            Ok(resp) => {
                self.store.apply_updates(resp.updated_files);
                if self.strategy() == Some(InterruptStrategy::Restart) {
                    let record = CommandRecord::new(code, resp.output.clone());
                    self.history.lock().expect("history poisoned").record(record);
                }
                Ok(resp.output)
            }
            Err(BackendError::Interrupted) => Ok(vec![Output::system("execution interrupted")]),
            Err(BackendError::Worker(message)) => Ok(vec![Output::error(message)]),
            Err(e) => Err(e),
        }
    }

    /// Ship the current file snapshot and execute the entry file `name`.
    /// File programs are one-shot: they never enter the command history.
    pub async fn run_file(
        &self,
        guard: &GateGuard,
        name: &str,
    ) -> Result<Vec<Output>, BackendError> {
        self.gate.verify(guard)?;
        if !self.is_ready() {
            return Ok(vec![Output::error(NOT_READY)]);
        }
        let Some(channel) = self.channel() else {
            return Ok(vec![Output::error(NOT_READY)]);
        };

        self.interrupt.reset();
        let request = RunFileRequest {
            name: name.into(),
            files: self.store.snapshot(),
        };
        match channel.send(request).await {
            Ok(resp) => {
                self.store.apply_updates(resp.updated_files);
                Ok(resp.output)
            }
            Err(BackendError::Interrupted) => Ok(vec![Output::system("execution interrupted")]),
            Err(BackendError::Worker(message)) => Ok(vec![Output::error(message)]),
            Err(e) => Err(e),
        }
    }

    /// Classify accumulated REPL input. Prefers the worker's own parser
    /// when it advertised one; falls back to the built-in classifier.
    /// Never requires the gate: classification is read-only.
    pub async fn check_syntax(&self, code: &str) -> SyntaxStatus {
        let wire_capable = self.is_ready() && self.capabilities().is_some_and(|c| c.check_syntax);
        if wire_capable {
            if let Some(channel) = self.channel() {
                match channel.send(CheckSyntaxRequest { code: code.into() }).await {
                    Ok(resp) => return resp.status,
                    Err(e) => warn!(error = %e, "wire checkSyntax failed, using built-in"),
                }
            }
        }
        match &self.classifier {
            Some(classifier) => classifier.classify(code),
            None => SyntaxStatus::Complete,
        }
    }

    /// Cancel the in-flight command using the worker's declared strategy.
    pub async fn interrupt(&self) -> Result<(), BackendError> {
        match self.strategy() {
            Some(InterruptStrategy::Buffer) => {
                self.interrupt.request_interrupt();
                if let Some(channel) = self.channel() {
                    channel.notify_interrupt();
                }
                Ok(())
            }
            Some(InterruptStrategy::Restart) => self.restart().await,
            None => {
                debug!("interrupt before init ignored");
                Ok(())
            }
        }
    }

    /// Forced restart: reject pending work, terminate the worker, spawn a
    /// fresh one and replay the command history.
    async fn restart(&self) -> Result<(), BackendError> {
        self.ready.store(false, Ordering::SeqCst);

        // Pending requests must fail before the gate is taken: the running
        // command holds the gate until its response resolves.
        let old = self.channel.lock().expect("channel slot poisoned").take();
        if let Some(old) = old {
            old.fail_all_interrupted();
            old.shutdown().await;
        }

        let _guard = self.gate.acquire().await;
        self.connect().await?;

        let commands = self.history.lock().expect("history poisoned").commands();
        if !commands.is_empty() {
            if let Some(channel) = self.channel() {
                channel.send(RestoreStateRequest { commands }).await?;
            }
        }
        self.ready.store(true, Ordering::SeqCst);
        info!("worker restarted and state replayed");
        Ok(())
    }

    /// Terminate the worker for good.
    pub async fn shutdown(&self) {
        self.ready.store(false, Ordering::SeqCst);
        let channel = self.channel.lock().expect("channel slot poisoned").take();
        if let Some(channel) = channel {
            channel.fail_all_interrupted();
            channel.shutdown().await;
        }
    }

    #[cfg(test)]
    pub(crate) fn history_len(&self) -> usize {
        self.history.lock().expect("history poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::FileMap;
    use crate::worker::engine::{Engine, EvalOutcome};

    /// Engine with observable restore calls and scripted failures.
    struct ScriptedEngine {
        strategy: InterruptStrategy,
        restored: Arc<Mutex<Vec<String>>>,
    }

    impl Engine for ScriptedEngine {
        fn init(&mut self) -> Result<WireCapabilities, String> {
            Ok(WireCapabilities {
                interrupt: self.strategy,
                check_syntax: false,
            })
        }

        fn eval(&mut self, code: &str) -> Result<EvalOutcome, String> {
            if code == "boom" {
                return Err("RuntimeError: boom".into());
            }
            Ok(EvalOutcome::with_output(vec![Output::ret(code)]))
        }

        fn run_file(&mut self, name: &str, files: FileMap) -> Result<EvalOutcome, String> {
            let mut outcome = EvalOutcome::with_output(vec![Output::stdout(format!(
                "ran {name} with {} files",
                files.len()
            ))]);
            outcome
                .updated_files
                .insert("out.txt".into(), "written".into());
            Ok(outcome)
        }

        fn check_syntax(&mut self, _code: &str) -> Result<SyntaxStatus, String> {
            Ok(SyntaxStatus::Complete)
        }

        fn restore(&mut self, commands: Vec<String>) -> Result<(), String> {
            self.restored.lock().unwrap().extend(commands);
            Ok(())
        }
    }

    fn backend(strategy: InterruptStrategy, restored: Arc<Mutex<Vec<String>>>) -> WorkerBackend {
        let spawner = EngineSpawner::new(move |_interrupt| {
            Box::new(ScriptedEngine {
                strategy,
                restored: Arc::clone(&restored),
            }) as Box<dyn Engine>
        });
        WorkerBackend::new(Box::new(spawner), None, FileStore::new())
    }

    #[tokio::test]
    async fn command_before_init_yields_error_output() {
        let backend = backend(InterruptStrategy::Buffer, Arc::default());
        let guard = backend.gate().acquire().await;
        let output = backend.run_command(&guard, "1 + 1").await.unwrap();
        assert_eq!(output, vec![Output::error(NOT_READY)]);
    }

    #[tokio::test]
    async fn foreign_gate_guard_is_rejected() {
        let backend_a = backend(InterruptStrategy::Buffer, Arc::default());
        let backend_b = backend(InterruptStrategy::Buffer, Arc::default());
        backend_a.init().await.unwrap();
        let guard_b = backend_b.gate().acquire().await;
        let err = backend_a.run_command(&guard_b, "1").await.unwrap_err();
        assert!(matches!(err, BackendError::GateNotHeld));
    }

    #[tokio::test]
    async fn successful_commands_enter_restart_history() {
        let backend = backend(InterruptStrategy::Restart, Arc::default());
        backend.init().await.unwrap();
        let guard = backend.gate().acquire().await;
        backend.run_command(&guard, "a = 1").await.unwrap();
        backend.run_command(&guard, "boom").await.unwrap();
        backend.run_command(&guard, "b = 2").await.unwrap();
        assert_eq!(backend.history_len(), 2);
    }

    #[tokio::test]
    async fn buffer_strategy_commands_skip_history() {
        let backend = backend(InterruptStrategy::Buffer, Arc::default());
        backend.init().await.unwrap();
        let guard = backend.gate().acquire().await;
        backend.run_command(&guard, "a = 1").await.unwrap();
        assert_eq!(backend.history_len(), 0);
    }

    #[tokio::test]
    async fn restart_replays_only_successful_commands() {
        let restored = Arc::new(Mutex::new(Vec::new()));
        let backend = backend(InterruptStrategy::Restart, Arc::clone(&restored));
        backend.init().await.unwrap();
        {
            let guard = backend.gate().acquire().await;
            backend.run_command(&guard, "a = 1").await.unwrap();
            backend.run_command(&guard, "boom").await.unwrap();
            backend.run_command(&guard, "b = 2").await.unwrap();
        }

        backend.interrupt().await.unwrap();
        assert!(backend.is_ready());
        assert_eq!(*restored.lock().unwrap(), vec!["a = 1", "b = 2"]);
    }

    #[tokio::test]
    async fn buffer_interrupt_sets_sentinel_and_next_command_clears_it() {
        let backend = backend(InterruptStrategy::Buffer, Arc::default());
        backend.init().await.unwrap();
        backend.interrupt().await.unwrap();
        assert!(backend.interrupt_buffer().is_interrupt_requested());

        let guard = backend.gate().acquire().await;
        backend.run_command(&guard, "1").await.unwrap();
        assert!(!backend.interrupt_buffer().is_interrupt_requested());
    }

    #[tokio::test]
    async fn worker_failure_becomes_error_output() {
        let backend = backend(InterruptStrategy::Buffer, Arc::default());
        backend.init().await.unwrap();
        let guard = backend.gate().acquire().await;
        let output = backend.run_command(&guard, "boom").await.unwrap();
        assert_eq!(output, vec![Output::error("RuntimeError: boom")]);
    }

    #[tokio::test]
    async fn run_file_ships_snapshot_and_applies_updates() {
        let backend = backend(InterruptStrategy::Buffer, Arc::default());
        backend.init().await.unwrap();
        backend.files().write("main.py", "print(1)");
        backend.files().write("util.py", "x = 1");

        let guard = backend.gate().acquire().await;
        let output = backend.run_file(&guard, "main.py").await.unwrap();
        assert_eq!(output, vec![Output::stdout("ran main.py with 2 files")]);
        assert_eq!(backend.files().read("out.txt").as_deref(), Some("written"));
    }

    #[tokio::test]
    async fn check_syntax_falls_back_to_builtin_classifier() {
        let spawner = EngineSpawner::new(|_| {
            Box::new(ScriptedEngine {
                strategy: InterruptStrategy::Restart,
                restored: Arc::default(),
            }) as Box<dyn Engine>
        });
        let backend = WorkerBackend::new(
            Box::new(spawner),
            Some(Box::new(crate::syntax::RubyClassifier)),
            FileStore::new(),
        );
        backend.init().await.unwrap();
        // The scripted engine never advertises checkSyntax.
        assert_eq!(
            backend.check_syntax("def greet(name)").await,
            SyntaxStatus::Incomplete
        );
        assert_eq!(backend.check_syntax("puts 1").await, SyntaxStatus::Complete);
    }
}
