//! Seams between the adapter and the operating system

use async_trait::async_trait;
use llexec_core::LlexecResult;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::process::{Invocation, ProcessOutput};

/// Filesystem checks made while constructing an adapter
pub trait FileProbe: Send + Sync {
    /// Whether `path` names an existing regular file (symlinks followed)
    fn is_file(&self, path: &Path) -> bool;

    /// Absolute path with symlinks expanded
    fn canonicalize(&self, path: &Path) -> std::io::Result<PathBuf>;
}

/// The real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl FileProbe for FsProbe {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn canonicalize(&self, path: &Path) -> std::io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }
}

/// Event emitted by a streaming child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// One line of standard output, without its terminator
    Stdout(String),
    /// The child exited; always the last event
    Exit {
        code: Option<i32>,
        stderr: String,
    },
}

/// Runs inference child processes
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Run to completion and capture both output streams
    async fn run(
        &self,
        invocation: &Invocation,
        timeout: Option<Duration>,
    ) -> LlexecResult<ProcessOutput>;

    /// Start the process and deliver stdout line by line.
    ///
    /// Dropping the receiver kills the child.
    async fn spawn_lines(
        &self,
        invocation: &Invocation,
        timeout: Option<Duration>,
    ) -> LlexecResult<mpsc::Receiver<LlexecResult<ProcessEvent>>>;

    /// Get the launcher name
    fn name(&self) -> &'static str;
}
