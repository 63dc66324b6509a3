//! End-to-end orchestration tests against deterministic in-process engines.

use replbox::files::FileStore;
use replbox::interrupt::{InterruptBuffer, InterruptStrategy};
use replbox::output::{FileMap, Output, SyntaxStatus};
use replbox::protocol::WireCapabilities;
use replbox::runtime::{Language, Runtime, WorkerRuntime};
use replbox::worker::engine::{Engine, EvalOutcome};
use replbox::worker::{EngineSpawner, WorkerBackend};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Engine that logs every evaluated command into a shared journal.
struct JournalEngine {
    strategy: InterruptStrategy,
    journal: Arc<Mutex<Vec<String>>>,
}

impl Engine for JournalEngine {
    fn init(&mut self) -> Result<WireCapabilities, String> {
        Ok(WireCapabilities {
            interrupt: self.strategy,
            check_syntax: false,
        })
    }

    fn eval(&mut self, code: &str) -> Result<EvalOutcome, String> {
        self.journal.lock().unwrap().push(code.to_string());
        std::thread::sleep(Duration::from_millis(5));
        Ok(EvalOutcome::with_output(vec![Output::ret(code)]))
    }

    fn run_file(&mut self, name: &str, files: FileMap) -> Result<EvalOutcome, String> {
        let mut outcome = EvalOutcome::with_output(vec![Output::stdout(name)]);
        outcome.updated_files = files;
        outcome
            .updated_files
            .insert("result.txt".into(), "done".into());
        Ok(outcome)
    }

    fn check_syntax(&mut self, _code: &str) -> Result<SyntaxStatus, String> {
        Ok(SyntaxStatus::Complete)
    }

    fn restore(&mut self, commands: Vec<String>) -> Result<(), String> {
        let mut journal = self.journal.lock().unwrap();
        for command in commands {
            journal.push(format!("replay:{command}"));
        }
        Ok(())
    }
}

fn journal_backend(
    strategy: InterruptStrategy,
    journal: Arc<Mutex<Vec<String>>>,
) -> Arc<WorkerBackend> {
    let spawner = EngineSpawner::new(move |_| {
        Box::new(JournalEngine {
            strategy,
            journal: Arc::clone(&journal),
        }) as Box<dyn Engine>
    });
    Arc::new(WorkerBackend::new(Box::new(spawner), None, FileStore::new()))
}

#[tokio::test]
async fn gate_serializes_concurrent_command_batches() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let backend = journal_backend(InterruptStrategy::Buffer, Arc::clone(&journal));
    backend.init().await.unwrap();

    let mut tasks = Vec::new();
    for batch in ["a", "b", "c"] {
        let backend = Arc::clone(&backend);
        tasks.push(tokio::spawn(async move {
            let guard = backend.gate().acquire().await;
            for step in 1..=3 {
                backend
                    .run_command(&guard, &format!("{batch}{step}"))
                    .await
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // Holding the gate for a batch means its commands are never
    // interleaved with another batch's.
    let journal = journal.lock().unwrap();
    assert_eq!(journal.len(), 9);
    for chunk in journal.chunks(3) {
        let batch = &chunk[0][..1];
        assert!(chunk.iter().all(|entry| entry.starts_with(batch)));
    }
}

/// Engine whose `spin` command only returns once the shared interrupt
/// byte is set, mimicking a cooperative interpreter.
struct SpinEngine {
    interrupt: InterruptBuffer,
}

impl Engine for SpinEngine {
    fn init(&mut self) -> Result<WireCapabilities, String> {
        Ok(WireCapabilities {
            interrupt: InterruptStrategy::Buffer,
            check_syntax: false,
        })
    }

    fn eval(&mut self, code: &str) -> Result<EvalOutcome, String> {
        if code == "spin" {
            while !self.interrupt.is_interrupt_requested() {
                std::thread::sleep(Duration::from_millis(2));
            }
            return Err("KeyboardInterrupt".into());
        }
        Ok(EvalOutcome::with_output(vec![Output::ret(code)]))
    }

    fn run_file(&mut self, _name: &str, _files: FileMap) -> Result<EvalOutcome, String> {
        Ok(EvalOutcome::default())
    }

    fn check_syntax(&mut self, _code: &str) -> Result<SyntaxStatus, String> {
        Ok(SyntaxStatus::Complete)
    }

    fn restore(&mut self, _commands: Vec<String>) -> Result<(), String> {
        Ok(())
    }
}

#[tokio::test]
async fn buffer_interrupt_cancels_command_and_session_survives() {
    let spawner =
        EngineSpawner::new(|interrupt| Box::new(SpinEngine { interrupt }) as Box<dyn Engine>);
    let backend = Arc::new(WorkerBackend::new(
        Box::new(spawner),
        None,
        FileStore::new(),
    ));
    backend.init().await.unwrap();

    let guard = backend.gate().acquire().await;
    let interruptor = {
        let backend = Arc::clone(&backend);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            backend.interrupt().await
        })
    };

    let output = backend.run_command(&guard, "spin").await.unwrap();
    assert_eq!(output, vec![Output::error("KeyboardInterrupt")]);
    interruptor.await.unwrap().unwrap();

    // The same worker keeps serving; no restart happened.
    let output = backend.run_command(&guard, "1 + 1").await.unwrap();
    assert_eq!(output, vec![Output::ret("1 + 1")]);
}

#[tokio::test]
async fn pinned_command_future_releases_gate_after_interrupt() {
    let spawner =
        EngineSpawner::new(|interrupt| Box::new(SpinEngine { interrupt }) as Box<dyn Engine>);
    let backend = Arc::new(WorkerBackend::new(
        Box::new(spawner),
        None,
        FileStore::new(),
    ));
    backend.init().await.unwrap();

    // Same shape as the interactive loop: the pinned run future borrows
    // the guard inside its own scope, so the guard can be dropped and the
    // gate re-acquired once the command resolves.
    let guard = backend.gate().acquire().await;
    let output = {
        let run = backend.run_command(&guard, "spin");
        tokio::pin!(run);
        loop {
            tokio::select! {
                result = &mut run => break result.unwrap(),
                _ = tokio::time::sleep(Duration::from_millis(25)) => {
                    let backend = Arc::clone(&backend);
                    tokio::spawn(async move { backend.interrupt().await });
                }
            }
        }
    };
    drop(guard);
    assert_eq!(output, vec![Output::error("KeyboardInterrupt")]);

    let guard = backend.gate().acquire().await;
    let output = backend.run_command(&guard, "2").await.unwrap();
    assert_eq!(output, vec![Output::ret("2")]);
}

/// Engine whose `block` command parks until released, for exercising the
/// restart path while a command is in flight.
struct BlockEngine {
    release: Arc<AtomicBool>,
    restored: Arc<Mutex<Vec<String>>>,
}

impl Engine for BlockEngine {
    fn init(&mut self) -> Result<WireCapabilities, String> {
        Ok(WireCapabilities {
            interrupt: InterruptStrategy::Restart,
            check_syntax: false,
        })
    }

    fn eval(&mut self, code: &str) -> Result<EvalOutcome, String> {
        if code == "block" {
            while !self.release.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(2));
            }
            return Err("released after restart".into());
        }
        Ok(EvalOutcome::with_output(vec![Output::ret(code)]))
    }

    fn run_file(&mut self, _name: &str, _files: FileMap) -> Result<EvalOutcome, String> {
        Ok(EvalOutcome::default())
    }

    fn check_syntax(&mut self, _code: &str) -> Result<SyntaxStatus, String> {
        Ok(SyntaxStatus::Complete)
    }

    fn restore(&mut self, commands: Vec<String>) -> Result<(), String> {
        self.restored.lock().unwrap().extend(commands);
        Ok(())
    }
}

#[tokio::test]
async fn restart_interrupt_rejects_pending_command_and_replays_history() {
    let release = Arc::new(AtomicBool::new(false));
    let restored = Arc::new(Mutex::new(Vec::new()));
    let spawner = {
        let release = Arc::clone(&release);
        let restored = Arc::clone(&restored);
        EngineSpawner::new(move |_| {
            Box::new(BlockEngine {
                release: Arc::clone(&release),
                restored: Arc::clone(&restored),
            }) as Box<dyn Engine>
        })
    };
    let backend = Arc::new(WorkerBackend::new(
        Box::new(spawner),
        None,
        FileStore::new(),
    ));
    backend.init().await.unwrap();

    let guard = backend.gate().acquire().await;
    backend.run_command(&guard, "x = 1").await.unwrap();

    // The restart has to wait for the gate this command is holding, so it
    // runs beside the blocked command, not instead of it.
    let interruptor = {
        let backend = Arc::clone(&backend);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            backend.interrupt().await
        })
    };
    let output = backend.run_command(&guard, "block").await.unwrap();
    assert_eq!(output, vec![Output::system("execution interrupted")]);
    drop(guard);

    interruptor.await.unwrap().unwrap();
    assert!(backend.is_ready());
    assert_eq!(*restored.lock().unwrap(), vec!["x = 1"]);

    // Fresh worker, history intact, and the interrupted command is gone.
    let guard = backend.gate().acquire().await;
    let output = backend.run_command(&guard, "x").await.unwrap();
    assert_eq!(output, vec![Output::ret("x")]);

    // Let the abandoned first engine thread finish.
    release.store(true, Ordering::SeqCst);
}

#[tokio::test]
async fn runtime_surface_round_trips_project_files() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let spawner = EngineSpawner::new(move |_| {
        Box::new(JournalEngine {
            strategy: InterruptStrategy::Buffer,
            journal: Arc::clone(&journal),
        }) as Box<dyn Engine>
    });
    let backend = WorkerBackend::new(Box::new(spawner), None, FileStore::new());
    let runtime: Arc<dyn Runtime> = Arc::new(WorkerRuntime::new(Language::Python, backend));

    runtime.init().await.unwrap();
    runtime.files().write("main.py", "print('hi')");
    runtime.files().write("data.txt", "payload");

    let guard = runtime.gate().acquire().await;
    let output = runtime.run_file(&guard, "main.py").await.unwrap();
    assert_eq!(output, vec![Output::stdout("main.py")]);
    drop(guard);

    // Updates flow back into the shared store.
    assert_eq!(runtime.files().read("result.txt").as_deref(), Some("done"));
    assert_eq!(runtime.files().read("data.txt").as_deref(), Some("payload"));
    assert_eq!(
        runtime.command_line_hint("main.py").as_deref(),
        Some("python main.py")
    );
}
