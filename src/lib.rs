// src/lib.rs

//! Embeddable task orchestration.
//!
//! A host program declares named tasks made of ordered steps (run a command,
//! invoke another task, fan out in parallel, branch on a yes/no prompt,
//! recover from errors, scope environment and working directory, watch files
//! and re-run), registers them, and hands the registry to [`go`] or drives an
//! [`Engine`] directly.

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod registry;
pub mod runner;
pub mod signal;
pub mod step;
pub mod types;
pub mod watch;

pub use config::EngineConfig;
pub use engine::{Engine, Execution, ExecutionContext, StepResult, Task};
pub use errors::{StepError, TaskchainError};
pub use registry::Registry;
pub use runner::go;
pub use step::{CaughtError, Step, TaskBuilder};
pub use types::{BranchOutcome, FileInfo, Payload, SignalName, TaskName};
