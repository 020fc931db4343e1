//! Error types for llexec

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for llexec
#[derive(Error, Debug)]
pub enum LlexecError {
    /// Model file missing at adapter construction
    #[error("Model file not found at {}", .0.display())]
    ArtifactNotFound(PathBuf),

    /// Inference executable missing at adapter construction
    #[error("Inference executable not found at {}", .0.display())]
    ExecutableNotFound(PathBuf),

    /// Request rejected before spawning anything
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Child process exited with a non-zero status
    #[error("Inference process failed (rc={}): {}", display_code(.code), .stderr.trim())]
    InferenceProcessFailed {
        /// Exit code, `None` when the process was terminated by a signal
        code: Option<i32>,
        /// Full captured standard error
        stderr: String,
    },

    /// No blank line separated the header block from the generated text
    #[error("Could not locate generated text in inference output")]
    OutputExtractionAmbiguous,

    /// Child process exceeded its time budget and was killed
    #[error("Inference process timed out after {0:?}")]
    Timeout(Duration),

    /// The executable could not be started
    #[error("Failed to spawn inference process: {0}")]
    Spawn(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LlexecError {
    /// Whether the error came from validating paths at construction time.
    ///
    /// These call for fixing configuration; everything else is a failure of
    /// a single generation call.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            LlexecError::ArtifactNotFound(_) | LlexecError::ExecutableNotFound(_)
        )
    }
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

/// Result type for llexec operations
pub type LlexecResult<T> = Result<T, LlexecError>;

impl From<toml::de::Error> for LlexecError {
    fn from(err: toml::de::Error) -> Self {
        LlexecError::Config(format!("Failed to parse config: {}", err))
    }
}
