//! In-memory stand-ins for the filesystem and child processes

use async_trait::async_trait;
use llexec_core::{LlexecError, LlexecResult};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::process::{Invocation, ProcessOutput};
use crate::traits::{FileProbe, ProcessEvent, ProcessLauncher};

/// Knows about a fixed set of files
#[derive(Debug, Default)]
pub struct FakeProbe {
    files: HashSet<PathBuf>,
    links: HashMap<PathBuf, PathBuf>,
    broken_canonicalize: bool,
}

impl FakeProbe {
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            links: HashMap::new(),
            broken_canonicalize: false,
        }
    }

    pub fn with_link(mut self, from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        self.links.insert(from.into(), to.into());
        self
    }

    /// Make every canonicalize call fail, as on a dangling link race
    pub fn with_broken_canonicalize(mut self) -> Self {
        self.broken_canonicalize = true;
        self
    }
}

impl FileProbe for FakeProbe {
    fn is_file(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    fn canonicalize(&self, path: &Path) -> std::io::Result<PathBuf> {
        if self.broken_canonicalize {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "link target vanished",
            ));
        }
        Ok(self
            .links
            .get(path)
            .cloned()
            .unwrap_or_else(|| path.to_path_buf()))
    }
}

/// Replays a canned process result and records every invocation
#[derive(Debug)]
pub struct FakeLauncher {
    output: ProcessOutput,
    timed_out: bool,
    pub calls: Mutex<Vec<(Invocation, Option<Duration>)>>,
}

impl FakeLauncher {
    pub fn succeeding(stdout: &str) -> Self {
        Self::with_output(ProcessOutput {
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    }

    pub fn failing(code: i32, stdout: &str, stderr: &str) -> Self {
        Self::with_output(ProcessOutput {
            code: Some(code),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        })
    }

    pub fn timing_out() -> Self {
        let mut launcher = Self::succeeding("");
        launcher.timed_out = true;
        launcher
    }

    fn with_output(output: ProcessOutput) -> Self {
        Self {
            output,
            timed_out: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded(&self) -> Vec<(Invocation, Option<Duration>)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, invocation: &Invocation, timeout: Option<Duration>) {
        self.calls
            .lock()
            .unwrap()
            .push((invocation.clone(), timeout));
    }
}

#[async_trait]
impl ProcessLauncher for FakeLauncher {
    async fn run(
        &self,
        invocation: &Invocation,
        timeout: Option<Duration>,
    ) -> LlexecResult<ProcessOutput> {
        self.record(invocation, timeout);
        if self.timed_out {
            return Err(LlexecError::Timeout(timeout.unwrap_or_default()));
        }
        Ok(self.output.clone())
    }

    async fn spawn_lines(
        &self,
        invocation: &Invocation,
        timeout: Option<Duration>,
    ) -> LlexecResult<mpsc::Receiver<LlexecResult<ProcessEvent>>> {
        self.record(invocation, timeout);
        let (tx, rx) = mpsc::channel(64);
        let output = self.output.clone();
        let timed_out = self.timed_out;
        tokio::spawn(async move {
            for line in output.stdout.lines() {
                if tx.send(Ok(ProcessEvent::Stdout(line.to_string()))).await.is_err() {
                    return;
                }
            }
            let last = if timed_out {
                Err(LlexecError::Timeout(timeout.unwrap_or_default()))
            } else {
                Ok(ProcessEvent::Exit {
                    code: output.code,
                    stderr: output.stderr,
                })
            };
            let _ = tx.send(last).await;
        });
        Ok(rx)
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
