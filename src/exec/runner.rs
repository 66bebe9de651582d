// src/exec/runner.rs

//! Runs one Exec step: completion raced against a kill request.

use tracing::{debug, info, warn};

use crate::engine::{KillRegistry, StepResult};
use crate::errors::StepError;
use crate::exec::backend::{CommandSpec, ProcessSpawner};
use crate::types::Payload;

/// Spawn `spec` and wait for it, unless a kill request arrives first.
///
/// - A kill channel is registered in `kills` before the process starts and is
///   deregistered when this function returns, on every path.
/// - A killed process yields a non-error [`Payload::Killed`] result.
pub async fn run_exec(
    spawner: &dyn ProcessSpawner,
    spec: CommandSpec,
    kills: &KillRegistry,
) -> StepResult {
    if spec.argv.is_empty() {
        return StepResult::failed(StepError::Validation(
            "exec step has no command".to_string(),
        ));
    }

    let (_guard, mut kill_rx) = kills.register();

    let mut process = match spawner.spawn(&spec) {
        Ok(p) => p,
        Err(err) => {
            warn!(program = %spec.program(), error = %err, "failed to spawn process");
            return StepResult::failed(err);
        }
    };

    // Either the process exits on its own (normal case), or we receive a kill
    // request from a watcher re-trigger or a signal.
    tokio::select! {
        outcome = process.wait() => match outcome {
            Ok(payload) => {
                debug!(program = %spec.program(), "process completed");
                StepResult::ok(payload)
            }
            Err(err) => {
                info!(program = %spec.program(), error = %err, "process failed");
                StepResult::failed(err)
            }
        },

        Ok(()) = &mut kill_rx => {
            info!(program = %spec.program(), "kill requested; killing process");
            match process.kill().await {
                Ok(()) => StepResult::ok(Payload::Killed),
                Err(err) => {
                    warn!(program = %spec.program(), error = %err, "failed to kill process");
                    StepResult::failed(err)
                }
            }
        }
    }
}
