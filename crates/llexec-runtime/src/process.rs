//! Process-based launcher implementation
//!
//! Runs the inference binary as a direct OS child process with an explicit
//! argument vector. Nothing goes through a shell, so prompts containing
//! quotes, `$` or newlines reach the binary verbatim.

use async_trait::async_trait;
use llexec_core::{render_float, GenerationRequest, LlexecError, LlexecResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::traits::{ProcessEvent, ProcessLauncher};

/// Buffered events between the reader task and the consumer
const EVENT_BUFFER: usize = 64;

/// Program plus arguments for one child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Arguments for a llama-cli style generation run
    pub fn for_generation(executable: &Path, model: &Path, request: &GenerationRequest) -> Self {
        let args = vec![
            "-m".to_string(),
            model.to_string_lossy().into_owned(),
            "-p".to_string(),
            request.prompt.clone(),
            "-n".to_string(),
            request.max_tokens.to_string(),
            "--temp".to_string(),
            render_float(request.temperature),
            "--top-k".to_string(),
            request.top_k.to_string(),
            "--top-p".to_string(),
            render_float(request.top_p),
        ];
        Self::new(executable, args)
    }

    /// Full argument vector, program first
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Captured result of a finished child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if the child was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::Output> for ProcessOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Launches children with `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioLauncher;

impl TokioLauncher {
    pub fn new() -> Self {
        Self
    }

    /// Build the command for an invocation
    fn build_command(&self, invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);

        // Configure process I/O
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        // Timeouts and dropped streams rely on this to reap the child
        cmd.kill_on_drop(true);

        cmd
    }

    fn spawn(&self, invocation: &Invocation) -> LlexecResult<Child> {
        let mut cmd = self.build_command(invocation);
        cmd.spawn().map_err(|e| {
            error!(
                program = %invocation.program.display(),
                error = %e,
                "Failed to spawn inference process"
            );
            LlexecError::Spawn(format!("{}: {}", invocation.program.display(), e))
        })
    }
}

#[async_trait]
impl ProcessLauncher for TokioLauncher {
    async fn run(
        &self,
        invocation: &Invocation,
        timeout: Option<Duration>,
    ) -> LlexecResult<ProcessOutput> {
        let child = self.spawn(invocation)?;
        debug!(pid = child.id().unwrap_or(0), "Inference process spawned");

        let output = match timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| LlexecError::Timeout(limit))??,
            None => child.wait_with_output().await?,
        };

        Ok(output.into())
    }

    async fn spawn_lines(
        &self,
        invocation: &Invocation,
        timeout: Option<Duration>,
    ) -> LlexecResult<mpsc::Receiver<LlexecResult<ProcessEvent>>> {
        let child = self.spawn(invocation)?;
        debug!(pid = child.id().unwrap_or(0), "Streaming inference process spawned");

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(async move {
            let pump = pump_lines(child, tx.clone());
            let result = match timeout {
                Some(limit) => tokio::time::timeout(limit, pump)
                    .await
                    .unwrap_or(Err(LlexecError::Timeout(limit))),
                None => pump.await,
            };
            if let Err(e) = result {
                let _ = tx.send(Err(e)).await;
            }
        });

        Ok(rx)
    }

    fn name(&self) -> &'static str {
        "process"
    }
}

/// Forward stdout lines, then the exit status.
///
/// Returns early without error when the receiver is gone; the child is
/// dropped and therefore killed.
async fn pump_lines(
    mut child: Child,
    tx: mpsc::Sender<LlexecResult<ProcessEvent>>,
) -> LlexecResult<()> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| LlexecError::Spawn("stdout was not captured".to_string()))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| LlexecError::Spawn("stderr was not captured".to_string()))?;

    // Drain stderr concurrently so a chatty child never blocks on a full pipe
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf).await;
        String::from_utf8_lossy(&buf).into_owned()
    });

    // A dropped receiver ends the pump even while the child is silent
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = tokio::select! {
            read = reader.read_until(b'\n', &mut buf) => read?,
            _ = tx.closed() => return Ok(()),
        };
        if read == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']).to_string();
        if tx.send(Ok(ProcessEvent::Stdout(line))).await.is_err() {
            return Ok(());
        }
    }

    let status = tokio::select! {
        status = child.wait() => status?,
        _ = tx.closed() => return Ok(()),
    };
    let stderr = stderr_task.await.unwrap_or_default();
    let _ = tx
        .send(Ok(ProcessEvent::Exit {
            code: status.code(),
            stderr,
        }))
        .await;
    Ok(())
}
