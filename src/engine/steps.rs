// src/engine/steps.rs

//! What each step kind does when it runs.

use std::path::Path;

use tracing::{debug, info};

use crate::engine::parallel::run_parallel;
use crate::engine::{Engine, ExecutionContext, StepResult, Task};
use crate::errors::StepError;
use crate::exec::{CommandSpec, run_exec};
use crate::fs::root_cause_message;
use crate::step::{Step, parse_duration};
use crate::types::{Payload, TaskName};

impl Engine {
    pub(crate) async fn run_step(
        &self,
        task: &Task,
        step: &Step,
        prev: &StepResult,
        ctx: &mut ExecutionContext,
        chain: &[TaskName],
    ) -> StepResult {
        match step {
            // Watch patterns are resolved when the task's watch loop is set up.
            Step::Watch(_) => StepResult::empty(),

            // Compiled into the step it guards.
            Step::Catch(_) => StepResult::empty(),

            Step::Exec(argv) => {
                let spec = CommandSpec {
                    argv: argv.clone(),
                    cwd: ctx.working_dir().to_path_buf(),
                    env: ctx.env_pairs(),
                    capture_output: self.config.capture_output,
                };
                run_exec(self.spawner.as_ref(), spec, ctx.kills()).await
            }

            Step::Run(name) => {
                debug!(task = %task.name(), child = %name, "running child task");
                self.run_invoked(name, chain).await
            }

            Step::Parallel(names) => run_parallel(self, names, chain).await,

            Step::Result(callback) => {
                callback(&prev.payload);
                StepResult::empty()
            }

            Step::Env(vars) => match ctx.add_env(vars) {
                Ok(()) => StepResult::empty(),
                Err(err) => StepResult::failed(err),
            },

            Step::Chdir(path) => self.chdir(path, ctx).into(),

            Step::Exists(path) => {
                let target = ctx.resolve(path);
                match self.fs.stat(&target) {
                    Ok(info) => StepResult::ok(Payload::File(info)),
                    Err(err) => StepResult::failed(StepError::io(target, root_cause_message(&err))),
                }
            }

            Step::Sleep(input) => match parse_duration(input) {
                Ok(duration) => {
                    tokio::time::sleep(duration).await;
                    StepResult::ok(Payload::Text(input.clone()))
                }
                Err(err) => StepResult::failed(err),
            },

            Step::Print(args) => {
                if args.is_empty() {
                    println!("{}", prev.payload);
                } else {
                    println!("{}", args.join(" "));
                }
                StepResult::empty()
            }

            Step::Prompt(message) => {
                let question = if message.is_empty() {
                    prev.payload.to_string()
                } else {
                    message.clone()
                };
                self.prompter.ask(&question).await.map(Payload::Bool).into()
            }

            Step::Yes => StepResult::ok(Payload::Bool(true)),
            Step::No => StepResult::ok(Payload::Bool(false)),
            Step::End => StepResult::empty(),
        }
    }

    fn chdir(&self, path: &Path, ctx: &mut ExecutionContext) -> Result<Payload, StepError> {
        let target = ctx.resolve(path);
        if !self.fs.exists(&target) {
            return Err(StepError::Validation(format!(
                "{} does not exist",
                target.display()
            )));
        }
        if !self.fs.is_dir(&target) {
            return Err(StepError::Validation(format!(
                "{} is not a directory",
                target.display()
            )));
        }

        let dir = self.fs.canonicalize(&target).unwrap_or(target);
        info!(from = %ctx.working_dir().display(), to = %dir.display(), "changing directory");
        ctx.set_working_dir(dir.clone());
        Ok(Payload::Path(dir))
    }
}
