use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use taskchain::errors::StepError;
use taskchain::exec::{CommandSpec, ProcessFuture, ProcessSpawner, RunningProcess};
use taskchain::types::Payload;

/// What a fake process does once spawned.
#[derive(Debug, Clone)]
pub enum FakeBehaviour {
    /// Exit 0 after `delay`, printing `stdout`.
    Succeed { stdout: String, delay: Duration },
    /// Exit with a non-zero code.
    Fail { code: i32 },
    /// Fail to start.
    SpawnError(String),
    /// Never exit on its own; only a kill ends it.
    HangUntilKilled,
}

impl FakeBehaviour {
    pub fn prints(stdout: impl Into<String>) -> Self {
        FakeBehaviour::Succeed {
            stdout: stdout.into(),
            delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    scripts: HashMap<String, FakeBehaviour>,
    spawned: Vec<CommandSpec>,
    killed: Vec<String>,
}

/// A `ProcessSpawner` that records every spawn and never starts a real
/// process.
///
/// Unscripted programs succeed. Two programs have built-in output:
/// - `env` prints the command's environment additions as `KEY=VALUE` lines,
/// - `echo` prints its arguments joined by spaces.
#[derive(Debug, Clone, Default)]
pub struct FakeSpawner {
    state: Arc<Mutex<State>>,
}

impl FakeSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Script the behaviour of every process whose argv[0] is `program`.
    pub fn script(&self, program: &str, behaviour: FakeBehaviour) -> &Self {
        self.lock().scripts.insert(program.to_string(), behaviour);
        self
    }

    /// Every spec passed to `spawn`, in order.
    pub fn spawned(&self) -> Vec<CommandSpec> {
        self.lock().spawned.clone()
    }

    /// argv[0] of every spawned process, in order.
    pub fn programs(&self) -> Vec<String> {
        self.lock()
            .spawned
            .iter()
            .map(|s| s.program().to_string())
            .collect()
    }

    /// argv[0] of every process that was killed.
    pub fn killed(&self) -> Vec<String> {
        self.lock().killed.clone()
    }
}

impl ProcessSpawner for FakeSpawner {
    fn spawn(&self, spec: &CommandSpec) -> Result<Box<dyn RunningProcess>, StepError> {
        let mut state = self.lock();
        state.spawned.push(spec.clone());

        let program = spec.program().to_string();
        let behaviour = match state.scripts.get(&program) {
            Some(b) => b.clone(),
            None => FakeBehaviour::prints(builtin_output(spec)),
        };

        if let FakeBehaviour::SpawnError(message) = behaviour {
            return Err(StepError::Spawn { program, message });
        }

        Ok(Box::new(FakeProcess {
            program,
            behaviour,
            capture_output: spec.capture_output,
            state: Arc::clone(&self.state),
        }))
    }
}

fn builtin_output(spec: &CommandSpec) -> String {
    match spec.program() {
        "env" => spec
            .env
            .iter()
            .map(|(k, v)| format!("{k}={v}\n"))
            .collect(),
        "echo" => format!("{}\n", spec.argv[1..].join(" ")),
        _ => String::new(),
    }
}

struct FakeProcess {
    program: String,
    behaviour: FakeBehaviour,
    capture_output: bool,
    state: Arc<Mutex<State>>,
}

impl RunningProcess for FakeProcess {
    fn wait(&mut self) -> ProcessFuture<'_, Payload> {
        Box::pin(async move {
            match &self.behaviour {
                FakeBehaviour::Succeed { stdout, delay } => {
                    if !delay.is_zero() {
                        tokio::time::sleep(*delay).await;
                    }
                    if self.capture_output {
                        Ok(Payload::Text(stdout.clone()))
                    } else {
                        Ok(Payload::None)
                    }
                }
                FakeBehaviour::Fail { code } => Err(StepError::Exit {
                    program: self.program.clone(),
                    code: Some(*code),
                }),
                FakeBehaviour::HangUntilKilled => std::future::pending().await,
                FakeBehaviour::SpawnError(_) => unreachable!("spawn errors never start"),
            }
        })
    }

    fn kill(&mut self) -> ProcessFuture<'_, ()> {
        Box::pin(async move {
            self.state.lock().unwrap().killed.push(self.program.clone());
            Ok(())
        })
    }
}
