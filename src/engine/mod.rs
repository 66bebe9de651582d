// src/engine/mod.rs

//! Task execution engine.
//!
//! This module ties together:
//! - the per-task [`ExecutionContext`] and its [`KillRegistry`]
//! - the compiled program of a task (catch attachment, branch graph)
//! - step dispatch and the sequential/branching state machine
//! - the Parallel coordinator
//! - the run loop that re-drives a task on watch triggers and signals
//!
//! [`Engine`] is the entry point; [`Engine::run_task`] runs a task once and
//! [`Engine::execute`] runs it under its watch lifecycle.

use crate::errors::StepError;
use crate::types::Payload;

/// What a step (or a whole run) produced.
#[derive(Debug, Clone, Default)]
pub struct StepResult {
    pub payload: Payload,
    pub error: Option<StepError>,
}

impl StepResult {
    /// No payload, no error.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn ok(payload: Payload) -> Self {
        Self {
            payload,
            error: None,
        }
    }

    pub fn failed(error: StepError) -> Self {
        Self {
            payload: Payload::None,
            error: Some(error),
        }
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    pub fn into_result(self) -> Result<Payload, StepError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.payload),
        }
    }
}

impl From<Result<Payload, StepError>> for StepResult {
    fn from(value: Result<Payload, StepError>) -> Self {
        match value {
            Ok(payload) => StepResult::ok(payload),
            Err(err) => StepResult::failed(err),
        }
    }
}

pub mod context;
pub mod core;
pub mod kill;
pub(crate) mod parallel;
pub(crate) mod program;
pub mod runtime;
pub(crate) mod steps;
pub mod task;

pub use context::ExecutionContext;
pub use self::core::Engine;
pub use kill::{KillGuard, KillRegistry};
pub use runtime::Execution;
pub use task::Task;
