// src/errors.rs

//! Crate-wide error types.
//!
//! [`StepError`] is what a step reports through its [`StepResult`]; the engine
//! is the only place that interprets it. [`TaskchainError`] covers everything
//! around the engine (configuration, registry validation, watcher setup).
//!
//! [`StepResult`]: crate::engine::StepResult

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// The process could not be started.
    #[error("failed to spawn '{program}': {message}")]
    Spawn { program: String, message: String },

    /// The process exited unsuccessfully, or waiting on it failed.
    #[error("'{program}' exited with {}", describe_exit(.code))]
    Exit { program: String, code: Option<i32> },

    /// Filesystem access failed.
    #[error("{}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    /// Malformed duration string.
    #[error("invalid duration \"{input}\": {message}")]
    Parse { input: String, message: String },

    /// Unknown task name.
    #[error("task \"{0}\" does not exist")]
    Lookup(String),

    /// Chdir target missing or not a directory, malformed Env entry, ...
    #[error("{0}")]
    Validation(String),

    /// Explicit error returned from a Catch handler.
    #[error("{0}")]
    User(String),

    /// One or more Parallel branches failed; text is `name -> error` joined.
    #[error("{0}")]
    Parallel(String),

    /// A branch future panicked or was cancelled by the runtime.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StepError {
    /// Convenience constructor for Catch handlers.
    pub fn user(message: impl Into<String>) -> Self {
        StepError::User(message.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        StepError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit status {c}"),
        None => "no exit status (terminated by signal)".to_string(),
    }
}

#[derive(Error, Debug)]
pub enum TaskchainError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cycle detected between tasks: {0}")]
    TaskCycle(String),

    #[error("File watcher failed: {0}")]
    WatchError(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskchainError>;
