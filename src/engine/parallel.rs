// src/engine/parallel.rs

//! Parallel coordinator: fan out named tasks, join them in declaration order.

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::{Engine, StepResult};
use crate::errors::StepError;
use crate::types::{BranchOutcome, Payload, TaskName};

pub(crate) async fn run_parallel(engine: &Engine, names: &[TaskName], chain: &[TaskName]) -> StepResult {
    debug!(tasks = ?names, "starting parallel branches");

    let branches: Vec<(TaskName, JoinHandle<StepResult>)> = names
        .iter()
        .map(|name| {
            let engine = engine.clone();
            let branch = name.clone();
            let callers = chain.to_vec();
            let handle = tokio::spawn(async move { engine.run_invoked(&branch, &callers).await });
            (name.clone(), handle)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(branches.len());
    for (name, handle) in branches {
        let result = match handle.await {
            Ok(result) => result,
            Err(err) => {
                warn!(task = %name, error = %err, "parallel branch did not complete");
                StepResult::failed(StepError::Internal(format!(
                    "branch \"{name}\" did not complete: {err}"
                )))
            }
        };
        outcomes.push(BranchOutcome { name, result });
    }

    let failures: Vec<String> = outcomes
        .iter()
        .filter_map(|o| o.result.error.as_ref().map(|e| format!("{} -> {e}", o.name)))
        .collect();

    let payload = Payload::Branches(outcomes);
    if failures.is_empty() {
        StepResult::ok(payload)
    } else {
        StepResult {
            payload,
            error: Some(StepError::Parallel(failures.join(", "))),
        }
    }
}
