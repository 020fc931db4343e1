//! Configuration types for llexec

use crate::model::{
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_K, DEFAULT_TOP_P,
};
use crate::GenerationRequest;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LlexecConfig {
    /// Adapter paths and limits
    pub adapter: AdapterSettings,
    /// Defaults applied to every generation request
    pub generation: GenerationDefaults,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl LlexecConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, crate::LlexecError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::LlexecError::Config(format!("Failed to read config file: {}", e))
        })?;
        Ok(toml::from_str(&content)?)
    }
}

/// Adapter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterSettings {
    /// Path to the model weights file
    pub model_path: Option<PathBuf>,
    /// Path to the inference binary (falls back to the conventional default)
    pub executable_path: Option<PathBuf>,
    /// Kill the child after this many seconds
    pub timeout_secs: Option<u64>,
}

/// Generation defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationDefaults {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_k: DEFAULT_TOP_K,
            top_p: DEFAULT_TOP_P,
        }
    }
}

impl GenerationDefaults {
    /// Build a request for `prompt` using these defaults
    pub fn request(&self, prompt: impl Into<String>) -> GenerationRequest {
        GenerationRequest::new(prompt)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
            .with_top_k(self.top_k)
            .with_top_p(self.top_p)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}
