// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `ProcessSpawner` trait and the concrete
//!   `TokioSpawner` used in production, which tests replace with a fake.
//! - [`runner`] runs a single Exec step, racing process completion against
//!   a kill request from the task's kill registry.

pub mod backend;
pub mod runner;

pub use backend::{CommandSpec, ProcessFuture, ProcessSpawner, RunningProcess, TokioSpawner};
pub use runner::run_exec;
