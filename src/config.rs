//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. Environment variables (`REPLBOX_REMOTE_URL`, `REPLBOX_PYTHON`,
//!    `REPLBOX_RUBY`, `REPLBOX_NODE`)
//! 2. TOML file specified via --config CLI flag
//! 3. ./replbox.toml in the current directory
//! 4. $XDG_CONFIG_HOME/replbox/replbox.toml (or ~/.config/replbox/replbox.toml)
//! 5. Built-in defaults

use crate::error::ConfigError;
use crate::remote;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub interpreters: InterpreterConfig,
}

/// Remote compile service settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: remote::DEFAULT_BASE_URL.into(),
        }
    }
}

/// Interpreter binaries for the local worker harnesses.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    pub python: String,
    pub ruby: String,
    pub node: String,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            python: "python3".into(),
            ruby: "ruby".into(),
            node: "node".into(),
        }
    }
}

/// Load configuration following the precedence order above.
pub fn load_config(path_override: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match find_config_file(path_override) {
        Some(path) => parse_file(&path)?,
        None => Config::default(),
    };
    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

fn parse_file(path: &Path) -> Result<Config, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&raw)?)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(url) = std::env::var("REPLBOX_REMOTE_URL") {
        config.remote.base_url = url;
    }
    if let Ok(python) = std::env::var("REPLBOX_PYTHON") {
        config.interpreters.python = python;
    }
    if let Ok(ruby) = std::env::var("REPLBOX_RUBY") {
        config.interpreters.ruby = ruby;
    }
    if let Ok(node) = std::env::var("REPLBOX_NODE") {
        config.interpreters.node = node;
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.remote.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("remote.base_url is empty".into()));
    }
    if !config.remote.base_url.starts_with("http") {
        return Err(ConfigError::Invalid(format!(
            "remote.base_url must be an http(s) URL, got `{}`",
            config.remote.base_url
        )));
    }
    Ok(())
}

fn find_config_file(path_override: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = path_override {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from("replbox.toml");
    if local.is_file() {
        return Some(local);
    }
    config_home()
        .map(|dir| dir.join("replbox").join("replbox.toml"))
        .filter(|p| p.is_file())
}

fn config_home() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".config"))
        .or_else(dirs::config_dir)
}
