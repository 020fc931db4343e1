//! llexec-runtime: Child-process inference adapter
//!
//! This crate runs an external inference binary (llama.cpp `llama-cli` or
//! anything with the same flags) once per request:
//! - Path resolution and eager validation of model and executable
//! - Shell-free argument vectors
//! - One-shot and streaming execution on tokio child processes

pub mod adapter;
pub mod paths;
pub mod process;
pub mod stream;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{AdapterConfig, ProcessInferenceAdapter};
pub use process::{Invocation, ProcessOutput, TokioLauncher};
pub use stream::GenerationStream;
pub use traits::{FileProbe, FsProbe, ProcessEvent, ProcessLauncher};
