// src/engine/context.rs

//! Per-task mutable state shared by the steps of one run.

use std::ops::{Deref, DerefMut};
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::engine::KillRegistry;
use crate::errors::StepError;

/// Working directory, environment additions and live kill channels of a task.
///
/// Only one step of a task runs at a time, so steps get `&mut` access.
#[derive(Debug)]
pub struct ExecutionContext {
    working_dir: PathBuf,
    env: Vec<String>,
    kills: KillRegistry,
}

impl ExecutionContext {
    pub fn new(working_dir: impl Into<PathBuf>, kills: KillRegistry) -> Self {
        Self {
            working_dir: working_dir.into(),
            env: Vec::new(),
            kills,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn set_working_dir(&mut self, dir: impl Into<PathBuf>) {
        self.working_dir = dir.into();
    }

    /// Resolve `path` against the current working directory, lexically
    /// removing `.` and `..` components.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        normalize(&self.working_dir.join(path))
    }

    /// `KEY=VALUE` strings added by Env steps, in order.
    pub fn env_additions(&self) -> &[String] {
        &self.env
    }

    /// Append `KEY=VALUE` entries. Entries without `=` or with an empty key
    /// are rejected and nothing is added.
    pub fn add_env(&mut self, vars: &[String]) -> Result<(), StepError> {
        for var in vars {
            match var.split_once('=') {
                Some((key, _)) if !key.is_empty() => {}
                _ => {
                    return Err(StepError::Validation(format!(
                        "environment entry \"{var}\" is not of the form KEY=VALUE"
                    )));
                }
            }
        }
        self.env.extend(vars.iter().cloned());
        Ok(())
    }

    /// Environment additions split into pairs; later entries win when the
    /// process environment is built.
    pub fn env_pairs(&self) -> Vec<(String, String)> {
        self.env
            .iter()
            .filter_map(|v| v.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub fn kills(&self) -> &KillRegistry {
        &self.kills
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Scope of one run over a context.
///
/// Entering sets the working directory to the run's start directory and clears
/// environment additions; dropping restores the start directory, so the
/// context is left as it was found on every exit path.
pub(crate) struct RunScope<'a> {
    ctx: &'a mut ExecutionContext,
    start_dir: PathBuf,
}

impl<'a> RunScope<'a> {
    pub(crate) fn enter(ctx: &'a mut ExecutionContext, start_dir: PathBuf) -> Self {
        ctx.working_dir = start_dir.clone();
        ctx.env.clear();
        Self { ctx, start_dir }
    }
}

impl Deref for RunScope<'_> {
    type Target = ExecutionContext;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl DerefMut for RunScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl Drop for RunScope<'_> {
    fn drop(&mut self) {
        if self.ctx.working_dir != self.start_dir {
            debug!(
                from = %self.ctx.working_dir.display(),
                to = %self.start_dir.display(),
                "restoring working directory"
            );
        }
        self.ctx.working_dir = std::mem::take(&mut self.start_dir);
    }
}
