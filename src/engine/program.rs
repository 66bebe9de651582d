// src/engine/program.rs

//! Compiling a step list into an executable program.
//!
//! Two things are resolved once, when a task is built:
//!
//! - Catch steps are attached to the step immediately before them. A Catch
//!   with nothing to guard (first step, or right after another Catch) is
//!   dropped with a warning.
//! - Prompt / Yes / No / End become a small forward-only branch graph. Targets
//!   are found by nearest forward match, without nesting: a Prompt jumps to
//!   the next Yes (or No), falling back to the next End, falling back to the
//!   following node. A Yes/No arm reached while a branch is already being
//!   taken jumps to the next End, so one arm never falls through into the
//!   other. A Prompt inside an open Prompt block is accepted but shares the
//!   same markers; this is logged at build time.
//!
//! A Prompt whose failure is recovered by its Catch still branches: the
//! recovered payload is not `true`, so the No arm is taken.

use tracing::warn;

use crate::step::{CatchFn, Step};
use crate::types::TaskName;

/// Control-flow role of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Branch {
    /// Advance to the next node.
    Next,
    /// Conditional jump on the node's boolean payload.
    Prompt { on_yes: usize, on_no: usize },
    /// Yes/No marker; `end` is where to go if a branch was already taken.
    Arm { end: usize },
    /// Closes the current prompt block.
    End,
}

pub(crate) struct Node {
    pub(crate) step: Step,
    pub(crate) catch: Option<CatchFn>,
    pub(crate) branch: Branch,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("step", &self.step)
            .field("catch", &self.catch.is_some())
            .field("branch", &self.branch)
            .finish()
    }
}

#[derive(Debug, Default)]
pub(crate) struct Program {
    nodes: Vec<Node>,
    watch_patterns: Vec<String>,
}

impl Program {
    pub(crate) fn compile(task: &str, steps: Vec<Step>) -> Self {
        let mut nodes: Vec<Node> = Vec::with_capacity(steps.len());
        let mut watch_patterns = Vec::new();
        let mut previous_was_catch = false;

        for step in steps {
            if let Step::Watch(patterns) = &step {
                watch_patterns.extend(patterns.iter().cloned());
            }
            if let Step::Catch(handler) = step {
                match nodes.last_mut() {
                    Some(node) if !previous_was_catch && node.catch.is_none() => {
                        node.catch = Some(handler);
                    }
                    _ => warn!(task = %task, "catch step has no preceding step to guard; ignoring it"),
                }
                previous_was_catch = true;
                continue;
            }
            previous_was_catch = false;
            nodes.push(Node {
                step,
                catch: None,
                branch: Branch::Next,
            });
        }

        resolve_branches(task, &mut nodes);

        Self {
            nodes,
            watch_patterns,
        }
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn watch_patterns(&self) -> &[String] {
        &self.watch_patterns
    }

    /// Every task named by a Run or Parallel step, in step order.
    pub(crate) fn invoked_tasks(&self) -> impl Iterator<Item = &TaskName> {
        self.nodes.iter().flat_map(|n| n.step.invoked_tasks())
    }
}

fn resolve_branches(task: &str, nodes: &mut [Node]) {
    let find_next = |from: usize, want: fn(&Step) -> bool, nodes: &[Node]| {
        nodes[from + 1..]
            .iter()
            .position(|n| want(&n.step))
            .map(|offset| from + 1 + offset)
    };
    let is_yes: fn(&Step) -> bool = |s| matches!(s, Step::Yes);
    let is_no: fn(&Step) -> bool = |s| matches!(s, Step::No);
    let is_end: fn(&Step) -> bool = |s| matches!(s, Step::End);

    let mut open_prompt: Option<usize> = None;
    for i in 0..nodes.len() {
        let branch = match nodes[i].step {
            Step::Prompt(_) => {
                if let Some(outer) = open_prompt {
                    warn!(
                        task = %task,
                        outer_step = outer,
                        inner_step = i,
                        "prompt inside an open prompt block; branches are not nested and share the nearest yes/no/end"
                    );
                }
                open_prompt = Some(i);
                let end = find_next(i, is_end, nodes).unwrap_or(i + 1);
                Branch::Prompt {
                    on_yes: find_next(i, is_yes, nodes).unwrap_or(end),
                    on_no: find_next(i, is_no, nodes).unwrap_or(end),
                }
            }
            Step::Yes | Step::No => Branch::Arm {
                end: find_next(i, is_end, nodes).unwrap_or(i + 1),
            },
            Step::End => {
                open_prompt = None;
                Branch::End
            }
            _ => Branch::Next,
        };
        nodes[i].branch = branch;
    }
}
