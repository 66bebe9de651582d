// src/types.rs

//! Plain data shared across the engine: step payloads, file metadata and
//! the signal names the Signal Bridge understands.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::SystemTime;

use serde::Deserialize;

use crate::engine::StepResult;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Value carried from one step to the next.
///
/// The set of variants is closed: every step kind produces one of these.
#[derive(Debug, Clone, Default)]
pub enum Payload {
    #[default]
    None,
    /// Free-form text (captured stdout, echoed durations, ...).
    Text(String),
    /// Answer of a Prompt, or the marker value of a Yes/No step.
    Bool(bool),
    /// A directory produced by Chdir.
    Path(PathBuf),
    /// Metadata produced by Exists.
    File(FileInfo),
    /// An Exec step whose process was killed on request.
    Killed,
    /// Per-branch outcomes of a Parallel step, in declaration order.
    Branches(Vec<BranchOutcome>),
}

impl Payload {
    pub fn is_none(&self) -> bool {
        matches!(self, Payload::None)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Payload::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::None => write!(f, "<none>"),
            Payload::Text(s) => write!(f, "{s}"),
            Payload::Bool(b) => write!(f, "{b}"),
            Payload::Path(p) => write!(f, "{}", p.display()),
            Payload::File(info) => write!(f, "{info}"),
            Payload::Killed => write!(f, "killed"),
            Payload::Branches(branches) => {
                let parts: Vec<String> = branches.iter().map(|b| b.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

/// Outcome of one named branch of a Parallel step.
#[derive(Debug, Clone)]
pub struct BranchOutcome {
    pub name: TaskName,
    pub result: StepResult,
}

impl BranchOutcome {
    pub fn succeeded(&self) -> bool {
        !self.result.is_err()
    }
}

impl fmt::Display for BranchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result.error {
            Some(err) => write!(f, "{}: failed ({err})", self.name),
            None => write!(f, "{}: ok", self.name),
        }
    }
}

/// Filesystem metadata snapshot, independent of `std::fs::Metadata` so the
/// in-memory filesystem can produce it too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: PathBuf,
    pub is_dir: bool,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl fmt::Display for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_dir { "dir" } else { "file" };
        write!(f, "{} ({kind}, {} bytes)", self.path.display(), self.len)
    }
}

/// OS signals that can be routed into the Signal Bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalName {
    Interrupt,
    Quit,
    Terminate,
    Hangup,
}

impl FromStr for SignalName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "interrupt" | "int" | "sigint" => Ok(SignalName::Interrupt),
            "quit" | "sigquit" => Ok(SignalName::Quit),
            "terminate" | "term" | "sigterm" => Ok(SignalName::Terminate),
            "hangup" | "hup" | "sighup" => Ok(SignalName::Hangup),
            other => Err(format!(
                "invalid signal name: {other} (expected interrupt, quit, terminate or hangup)"
            )),
        }
    }
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalName::Interrupt => "interrupt",
            SignalName::Quit => "quit",
            SignalName::Terminate => "terminate",
            SignalName::Hangup => "hangup",
        };
        f.write_str(name)
    }
}
