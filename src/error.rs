//! Unified error types for the orchestrator.

use std::fmt;

// ---------------------------------------------------------------------------
// BackendError
// ---------------------------------------------------------------------------

/// Errors arising from local backend orchestration.
///
/// Most of these never reach the caller as `Err`: per-command failures are
/// absorbed into `error`-kind [`crate::output::Output`] records so a REPL
/// session can continue. The exceptions are programming errors
/// (`GateNotHeld`) and spawn/transport failures during initialization.
#[derive(Debug)]
pub enum BackendError {
    /// A command was issued to a backend whose `ready` flag is false.
    NotReady,
    /// A gated entry point was invoked without holding this backend's gate.
    GateNotHeld,
    /// Pending work was rejected because the backend was force-restarted.
    Interrupted,
    /// The worker reported an operation failure (`{"id":n,"error":...}`).
    Worker(String),
    /// Malformed or unexpected wire traffic.
    Protocol(String),
    /// The transport to the worker failed (closed channel, dead child).
    Transport(String),
    /// The worker process/task could not be created.
    Spawn(std::io::Error),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "backend is not ready"),
            Self::GateNotHeld => write!(f, "backend gate is not held by the caller"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::Worker(msg) => f.write_str(msg),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Spawn(e) => write!(f, "spawn: {e}"),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        Self::Spawn(e)
    }
}

// ---------------------------------------------------------------------------
// RemoteError
// ---------------------------------------------------------------------------

/// Errors from the remote compile-and-run service.
///
/// This is the only category allowed to propagate to the caller as `Err`:
/// there is no local recovery for a dead service.
#[derive(Debug)]
pub enum RemoteError {
    /// Network / reqwest-level failure.
    Http(reqwest::Error),
    /// Non-2xx status from the service.
    Status(u16, String),
    /// The service answered with something we could not parse.
    Malformed(String),
    /// No usable compiler was found in the service's compiler list.
    CompilerUnavailable(String),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "http: {e}"),
            Self::Status(code, body) => write!(f, "status {code}: {body}"),
            Self::Malformed(msg) => write!(f, "malformed response: {msg}"),
            Self::CompilerUnavailable(msg) => write!(f, "compiler unavailable: {msg}"),
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or parsing configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

// ---------------------------------------------------------------------------
// ReplboxError — top-level
// ---------------------------------------------------------------------------

/// Top-level error type.
#[derive(Debug)]
pub enum ReplboxError {
    Backend(BackendError),
    Remote(RemoteError),
    Config(ConfigError),
    /// The requested language has no registered backend.
    UnknownLanguage(String),
}

impl fmt::Display for ReplboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(e) => write!(f, "backend: {e}"),
            Self::Remote(e) => write!(f, "remote: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::UnknownLanguage(lang) => write!(f, "no backend registered for `{lang}`"),
        }
    }
}

impl std::error::Error for ReplboxError {}

impl From<BackendError> for ReplboxError {
    fn from(e: BackendError) -> Self {
        Self::Backend(e)
    }
}

impl From<RemoteError> for ReplboxError {
    fn from(e: RemoteError) -> Self {
        Self::Remote(e)
    }
}

impl From<ConfigError> for ReplboxError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
