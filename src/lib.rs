//! Replbox — a multi-language REPL and sandboxed program runner.
//!
//! The crate orchestrates isolated language backends behind one execution
//! surface: interpreted languages run in local workers speaking an
//! id-correlated JSON line protocol, compiled languages go to a remote
//! compile service. Execution is serialized per backend by an exclusive
//! gate; cancellation uses a cooperative interrupt buffer or a
//! restart-and-replay of the command history, whichever the worker
//! supports.
//!
//! # Quick start
//!
//! ```no_run
//! use replbox::config::load_config;
//! use replbox::runtime::{Language, RuntimeRegistry};
//!
//! # async fn example() {
//! let config = load_config(None).unwrap();
//! let registry = RuntimeRegistry::standard(&config);
//! let runtime = registry.get(Language::Python).unwrap();
//! runtime.init().await.unwrap();
//! let guard = runtime.gate().acquire().await;
//! let output = runtime.run_command(&guard, "print(1 + 1)").await.unwrap();
//! println!("{output:?}");
//! # }
//! ```

pub mod build_info;
pub mod channel;
pub mod config;
pub mod error;
pub mod files;
pub mod gate;
pub mod history;
pub mod interrupt;
pub mod output;
pub mod protocol;
pub mod remote;
pub mod render;
pub mod repl;
pub mod runtime;
pub mod syntax;
pub mod worker;
