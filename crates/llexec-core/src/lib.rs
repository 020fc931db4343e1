//! llexec-core: Core types for llexec
//!
//! This crate provides the pieces shared by the runtime and the CLI:
//! - Generation requests, results and path handles
//! - Transcript extraction for inference binary output
//! - Configuration types
//! - Error handling
//! - Study-note helpers (chunking, prompt templates, answer parsing)

pub mod config;
pub mod error;
pub mod model;
pub mod notes;
pub mod transcript;

pub use config::*;
pub use error::*;
pub use model::*;
pub use transcript::{extract_generated_text, render_float};
