//! Request, result and path handle type definitions

use crate::{LlexecError, LlexecResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Conventional location of the inference binary when none is configured
pub const DEFAULT_EXECUTABLE_PATH: &str = "~/llama.cpp/build/bin/llama-cli";

/// Default number of tokens to predict
pub const DEFAULT_MAX_TOKENS: u32 = 128;
/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.8;
/// Default top-k sampling cutoff
pub const DEFAULT_TOP_K: u32 = 40;
/// Default nucleus sampling threshold
pub const DEFAULT_TOP_P: f32 = 0.95;

/// A validated model weights file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifact(PathBuf);

impl ModelArtifact {
    /// Wrap an already resolved, existing path
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// A validated inference executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableHandle(PathBuf);

impl ExecutableHandle {
    /// Wrap an already resolved, existing path
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// Parameters for a single generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Prompt text passed with `-p`
    pub prompt: String,
    /// Tokens to predict (`-n`)
    pub max_tokens: u32,
    /// Sampling temperature (`--temp`)
    pub temperature: f32,
    /// Top-k cutoff (`--top-k`)
    pub top_k: u32,
    /// Nucleus threshold (`--top-p`)
    pub top_p: f32,
}

impl GenerationRequest {
    /// Create a request with default generation controls
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_k: DEFAULT_TOP_K,
            top_p: DEFAULT_TOP_P,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    /// Check the prompt and integer controls.
    ///
    /// Float controls are forwarded to the binary as given.
    pub fn validate(&self) -> LlexecResult<()> {
        if self.prompt.trim().is_empty() {
            return Err(LlexecError::InvalidRequest(
                "prompt must not be empty".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(LlexecError::InvalidRequest(
                "max_tokens must be positive".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(LlexecError::InvalidRequest(
                "top_k must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// How the generated text was located in the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Extraction {
    /// Text followed the first blank line
    HeaderSplit,
    /// No blank line; the whole transcript was returned
    Fallback,
}

/// Generated text extracted from a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub extraction: Extraction,
}

impl GenerationResult {
    pub fn new(text: String, extraction: Extraction) -> Self {
        Self { text, extraction }
    }

    /// Whether the best-effort fallback path was taken
    pub fn is_fallback(&self) -> bool {
        self.extraction == Extraction::Fallback
    }

    /// Return the text only if it was cleanly separated from the header
    pub fn into_strict(self) -> LlexecResult<String> {
        match self.extraction {
            Extraction::HeaderSplit => Ok(self.text),
            Extraction::Fallback => Err(LlexecError::OutputExtractionAmbiguous),
        }
    }
}

impl std::fmt::Display for GenerationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
