// src/exec/backend.rs

//! Pluggable process spawning.
//!
//! Exec steps talk to a [`ProcessSpawner`] instead of `tokio::process`
//! directly, so tests can swap in a fake that records what would have been
//! run and scripts its output.
//!
//! - [`TokioSpawner`] is the production implementation. Captured stdout is
//!   echoed to the host's stdout as it arrives; stderr is inherited.

use std::fmt::Debug;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::StepError;
use crate::types::Payload;

pub type ProcessFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StepError>> + Send + 'a>>;

/// Everything needed to start one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub argv: Vec<String>,
    pub cwd: PathBuf,
    /// Added on top of the inherited process environment.
    pub env: Vec<(String, String)>,
    /// Whether stdout should be captured into the step payload.
    pub capture_output: bool,
}

impl CommandSpec {
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }
}

/// Trait abstracting how Exec steps start processes.
pub trait ProcessSpawner: Send + Sync + Debug {
    /// Start the process described by `spec`.
    ///
    /// Failing to start is a [`StepError::Spawn`].
    fn spawn(&self, spec: &CommandSpec) -> Result<Box<dyn RunningProcess>, StepError>;
}

/// A started process.
pub trait RunningProcess: Send {
    /// Wait for exit. Success yields the captured stdout (or
    /// [`Payload::None`] when capture is off); a non-zero exit is a
    /// [`StepError::Exit`].
    fn wait(&mut self) -> ProcessFuture<'_, Payload>;

    /// Kill the process and reap it.
    fn kill(&mut self) -> ProcessFuture<'_, ()>;
}

/// Real spawner used in production.
#[derive(Debug, Clone, Default)]
pub struct TokioSpawner;

impl ProcessSpawner for TokioSpawner {
    fn spawn(&self, spec: &CommandSpec) -> Result<Box<dyn RunningProcess>, StepError> {
        let program = spec.program().to_string();
        let mut cmd = Command::new(&program);
        cmd.args(spec.argv.iter().skip(1))
            .current_dir(&spec.cwd)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if spec.capture_output {
            cmd.stdout(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit());
        }

        let mut child = cmd.spawn().map_err(|e| StepError::Spawn {
            program: program.clone(),
            message: e.to_string(),
        })?;

        info!(
            program = %program,
            pid = child.id(),
            cwd = %spec.cwd.display(),
            "spawned process"
        );

        // Raw bytes: output need not be UTF-8, and the pipe must be drained
        // to EOF or the child gets SIGPIPE.
        let stdout_reader = child.stdout.take().map(|mut stdout| {
            let program = program.clone();
            tokio::spawn(async move {
                let mut captured = Vec::new();
                let mut buf = [0u8; 8192];
                let mut echo = tokio::io::stdout();
                loop {
                    match stdout.read(&mut buf).await {
                        Ok(0) => break,
                        Ok(n) => {
                            let _ = echo.write_all(&buf[..n]).await;
                            captured.extend_from_slice(&buf[..n]);
                        }
                        Err(e) => {
                            warn!(program = %program, error = %e, "error reading process stdout");
                            break;
                        }
                    }
                }
                let _ = echo.flush().await;
                captured
            })
        });

        Ok(Box::new(TokioProcess {
            program,
            child,
            stdout_reader,
        }))
    }
}

struct TokioProcess {
    program: String,
    child: Child,
    stdout_reader: Option<JoinHandle<Vec<u8>>>,
}

impl TokioProcess {
    async fn captured(&mut self) -> Payload {
        match self.stdout_reader.take() {
            Some(reader) => match reader.await {
                Ok(bytes) => Payload::Text(String::from_utf8_lossy(&bytes).into_owned()),
                Err(e) => {
                    warn!(program = %self.program, error = %e, "stdout reader did not finish");
                    Payload::Text(String::new())
                }
            },
            None => Payload::None,
        }
    }

    fn check_status(&self, status: ExitStatus) -> Result<(), StepError> {
        debug!(program = %self.program, ?status, "process exited");
        if status.success() {
            Ok(())
        } else {
            Err(StepError::Exit {
                program: self.program.clone(),
                code: status.code(),
            })
        }
    }
}

impl RunningProcess for TokioProcess {
    fn wait(&mut self) -> ProcessFuture<'_, Payload> {
        Box::pin(async move {
            let status = self.child.wait().await.map_err(|e| {
                warn!(program = %self.program, error = %e, "waiting for process failed");
                StepError::Exit {
                    program: self.program.clone(),
                    code: None,
                }
            })?;
            let payload = self.captured().await;
            self.check_status(status)?;
            Ok(payload)
        })
    }

    fn kill(&mut self) -> ProcessFuture<'_, ()> {
        Box::pin(async move {
            self.child.kill().await.map_err(|e| StepError::Internal(format!(
                "failed to kill '{}': {e}",
                self.program
            )))?;
            if let Some(reader) = self.stdout_reader.take() {
                reader.abort();
            }
            Ok(())
        })
    }
}
