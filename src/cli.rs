//! CLI argument parsing via clap.

use clap::Parser;

/// Multi-language REPL and sandboxed program runner.
#[derive(Debug, Parser)]
#[command(name = "replbox", version)]
pub struct Args {
    /// Language to run (python, ruby, javascript, typescript, cpp, rust).
    #[arg(default_value = "python")]
    pub language: String,

    /// Execute a file program instead of starting an interactive session.
    /// The first file is the entry point; the rest ship alongside it.
    #[arg(long = "run", value_name = "FILE", num_args = 1..)]
    pub run: Vec<String>,

    /// Path to config file (default: ./replbox.toml or
    /// ~/.config/replbox/replbox.toml).
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// Override the remote compile service URL.
    #[arg(long = "remote-url")]
    pub remote_url: Option<String>,

    /// Disable color output.
    #[arg(long = "no-color")]
    pub no_color: bool,
}
