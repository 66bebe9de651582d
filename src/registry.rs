// src/registry.rs

//! Name → task mapping shared by the engine and the host entry point.

use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::warn;

use crate::engine::Task;
use crate::errors::{Result, TaskchainError};

/// Ordered collection of tasks keyed by unique name.
///
/// Registering a name that already exists replaces the earlier task in its
/// original position and logs a warning.
#[derive(Debug, Default)]
pub struct Registry {
    tasks: Vec<Arc<Task>>,
    replaced: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task: Task) -> &mut Self {
        let task = Arc::new(task);
        match self.tasks.iter_mut().find(|t| t.name() == task.name()) {
            Some(slot) => {
                warn!(task = %task.name(), "task registered twice; replacing the earlier definition");
                *slot = task;
                self.replaced += 1;
            }
            None => self.tasks.push(task),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<Task>> {
        self.tasks.iter().find(|t| t.name() == name).cloned()
    }

    /// Task names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Arc<Task>> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// How many registrations replaced an existing task.
    pub fn replaced_count(&self) -> usize {
        self.replaced
    }

    /// Check Run/Parallel references between tasks.
    ///
    /// - References to unknown tasks are logged; they fail at run time with a
    ///   lookup error.
    /// - Reference cycles (including a task invoking itself) are rejected.
    ///   Without this check they still fail, but only when the cycle is
    ///   reached at run time.
    pub fn validate(&self) -> Result<()> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for task in &self.tasks {
            graph.add_node(task.name());
        }

        for task in &self.tasks {
            for target in task.invoked_tasks() {
                if target == task.name() {
                    return Err(TaskchainError::TaskCycle(format!(
                        "task '{}' invokes itself",
                        task.name()
                    )));
                }
                if !graph.contains_node(target) {
                    warn!(task = %task.name(), target = %target, "task invokes an unknown task");
                    continue;
                }
                graph.add_edge(task.name(), target, ());
            }
        }

        // A topological sort fails if there is a cycle.
        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(TaskchainError::TaskCycle(format!(
                "Run/Parallel references form a cycle involving task '{}'",
                cycle.node_id()
            ))),
        }
    }
}
