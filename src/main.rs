//! CLI entry point for replbox.

mod cli;

use clap::Parser;
use replbox::build_info;
use replbox::config::load_config;
use replbox::error::{BackendError, ReplboxError};
use replbox::render::Renderer;
use replbox::repl::ReplSession;
use replbox::runtime::{Language, LanguageSpec, Runtime, RuntimeRegistry};
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("REPLBOX_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();

    let mut config = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    if let Some(url) = &args.remote_url {
        config.remote.base_url = url.clone();
    }

    let language: Language = match args.language.parse() {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };
    let spec = language.spec();
    let renderer = Renderer::new(!args.no_color, spec.return_prefix);

    let registry = RuntimeRegistry::standard(&config);
    let runtime = match registry.get(language) {
        Ok(r) => r,
        Err(e) => {
            renderer.error(&e.to_string());
            std::process::exit(2);
        }
    };

    renderer.system(&format!("replbox {}", build_info::startup_metadata_line()));

    if let Err(e) = runtime.init().await {
        renderer.error(&format!("failed to initialize {language}: {e}"));
        std::process::exit(1);
    }

    let result = if args.run.is_empty() {
        if !language.supports_repl() {
            renderer.error(&format!(
                "{language} has no interactive session; use --run <FILE>"
            ));
            std::process::exit(2);
        }
        run_repl(Arc::clone(&runtime), &renderer, &spec).await
    } else {
        run_files(runtime.as_ref(), &renderer, &args.run).await
    };
    if let Err(e) = result {
        renderer.error(&e.to_string());
        std::process::exit(1);
    }
}

/// Load the project files into the runtime and execute the entry file.
async fn run_files(
    runtime: &dyn Runtime,
    renderer: &Renderer,
    paths: &[String],
) -> Result<(), ReplboxError> {
    let mut entry = None;
    for path in paths {
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                renderer.error(&format!("cannot read {path}: {e}"));
                std::process::exit(2);
            }
        };
        runtime.files().write(&name, content);
        if entry.is_none() {
            entry = Some(name);
        }
    }
    let Some(entry) = entry else {
        return Ok(());
    };

    if let Some(hint) = runtime.command_line_hint(&entry) {
        renderer.system(&format!("$ {hint}"));
    }
    let guard = runtime.gate().acquire().await;
    let outputs = runtime.run_file(&guard, &entry).await?;
    renderer.outputs(&outputs);
    Ok(())
}

/// Interactive session: accumulate lines, submit complete statements,
/// translate Ctrl-C into the backend's interrupt strategy.
async fn run_repl(
    runtime: Arc<dyn Runtime>,
    renderer: &Renderer,
    spec: &LanguageSpec,
) -> Result<(), ReplboxError> {
    let mut session = ReplSession::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}", session.prompt(spec));
        let _ = std::io::stdout().flush();

        let line = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                // EOF ends the session.
                Ok(None) => break,
                Err(e) => {
                    return Err(ReplboxError::Backend(BackendError::Transport(format!(
                        "stdin read failed: {e}"
                    ))))
                }
            },
            _ = tokio::signal::ctrl_c() => {
                session.clear();
                println!();
                continue;
            }
        };

        session.push_line(&line);
        let status = runtime.check_syntax(&session.source()).await;
        let Some(command) = session.take_if_ready(status) else {
            continue;
        };
        if command.trim().is_empty() {
            continue;
        }

        let guard = runtime.gate().acquire().await;
        // The run future borrows the guard; it must die before the guard
        // is released for a pending restart.
        let outputs = {
            let run = runtime.run_command(&guard, &command);
            tokio::pin!(run);
            loop {
                tokio::select! {
                    result = &mut run => break result?,
                    _ = tokio::signal::ctrl_c() => {
                        // Interruption must not block this loop: a restart
                        // waits for the gate the running command still holds.
                        let runtime = Arc::clone(&runtime);
                        tokio::spawn(async move {
                            if let Err(e) = runtime.interrupt().await {
                                tracing::warn!(error = %e, "interrupt failed");
                            }
                        });
                    }
                }
            }
        };
        drop(guard);
        renderer.outputs(&outputs);
    }
    Ok(())
}
