//! The process inference adapter
//!
//! Resolves and validates the model and executable once, then runs one
//! child process per generation request. Calls share no mutable state, so
//! an adapter can sit behind an `Arc` and serve concurrent callers.

use llexec_core::{
    extract_generated_text, AdapterSettings, ExecutableHandle, GenerationRequest,
    GenerationResult, LlexecError, LlexecResult, ModelArtifact, DEFAULT_EXECUTABLE_PATH,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::paths::{home_dir, resolve_file};
use crate::process::{Invocation, TokioLauncher};
use crate::stream::GenerationStream;
use crate::traits::{FileProbe, FsProbe, ProcessLauncher};

/// Adapter configuration
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Path to the model weights file
    pub model_path: PathBuf,
    /// Path to the inference binary; [`DEFAULT_EXECUTABLE_PATH`] when unset
    pub executable_path: Option<PathBuf>,
    /// Kill children that run longer than this
    pub timeout: Option<Duration>,
    /// Directory substituted for a leading `~`; the user's home when unset
    pub home_dir: Option<PathBuf>,
}

impl AdapterConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            executable_path: None,
            timeout: None,
            home_dir: None,
        }
    }

    pub fn with_executable(mut self, executable_path: impl Into<PathBuf>) -> Self {
        self.executable_path = Some(executable_path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_home_dir(mut self, home_dir: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(home_dir.into());
        self
    }

    /// Build from the `[adapter]` section of a config file
    pub fn from_settings(settings: &AdapterSettings) -> LlexecResult<Self> {
        let model_path = settings.model_path.clone().ok_or_else(|| {
            LlexecError::Config("no model path configured".to_string())
        })?;
        Ok(Self {
            model_path,
            executable_path: settings.executable_path.clone(),
            timeout: settings.timeout_secs.map(Duration::from_secs),
            home_dir: None,
        })
    }
}

/// Runs an external inference binary against a fixed model
pub struct ProcessInferenceAdapter {
    model: ModelArtifact,
    executable: ExecutableHandle,
    timeout: Option<Duration>,
    launcher: Arc<dyn ProcessLauncher>,
}

impl std::fmt::Debug for ProcessInferenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessInferenceAdapter")
            .field("model", &self.model)
            .field("executable", &self.executable)
            .field("timeout", &self.timeout)
            .field("launcher", &self.launcher.name())
            .finish()
    }
}

impl ProcessInferenceAdapter {
    /// Create an adapter on the real filesystem and tokio processes
    pub fn new(config: AdapterConfig) -> LlexecResult<Self> {
        Self::with_components(config, &FsProbe, Arc::new(TokioLauncher::new()))
    }

    /// Create an adapter with explicit filesystem and launcher seams.
    ///
    /// The model is validated before the executable, so a missing model is
    /// always reported as [`LlexecError::ArtifactNotFound`].
    pub fn with_components(
        config: AdapterConfig,
        probe: &dyn FileProbe,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> LlexecResult<Self> {
        let home = config.home_dir.clone().or_else(home_dir);

        let model = resolve_file(&config.model_path, home.as_deref(), probe)
            .map_err(LlexecError::ArtifactNotFound)?;

        let executable_path = config
            .executable_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EXECUTABLE_PATH));
        let executable = resolve_file(&executable_path, home.as_deref(), probe)
            .map_err(LlexecError::ExecutableNotFound)?;

        info!(
            model = %model.display(),
            executable = %executable.display(),
            launcher = launcher.name(),
            "Inference adapter ready"
        );

        Ok(Self {
            model: ModelArtifact::new(model),
            executable: ExecutableHandle::new(executable),
            timeout: config.timeout,
            launcher,
        })
    }

    pub fn model(&self) -> &ModelArtifact {
        &self.model
    }

    pub fn executable(&self) -> &ExecutableHandle {
        &self.executable
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Argument vector for `request`
    pub fn invocation(&self, request: &GenerationRequest) -> Invocation {
        Invocation::for_generation(self.executable.path(), self.model.path(), request)
    }

    /// Run the binary once and extract the generated text.
    ///
    /// Completes only after the child has exited. Dropping the future kills
    /// the child.
    pub async fn generate(&self, request: &GenerationRequest) -> LlexecResult<GenerationResult> {
        request.validate()?;
        let invocation = self.invocation(request);
        let invocation_id = Uuid::new_v4();

        debug!(
            invocation_id = %invocation_id,
            args = invocation.args.len(),
            max_tokens = request.max_tokens,
            "Running inference process"
        );

        let output = self
            .launcher
            .run(&invocation, self.timeout)
            .await
            .inspect_err(|e| {
                warn!(invocation_id = %invocation_id, error = %e, "Inference run aborted")
            })?;

        if !output.success() {
            warn!(
                invocation_id = %invocation_id,
                code = ?output.code,
                "Inference process exited with failure"
            );
            return Err(LlexecError::InferenceProcessFailed {
                code: output.code,
                stderr: output.stderr,
            });
        }

        let result = extract_generated_text(&output.stdout);
        if result.is_fallback() {
            warn!(
                invocation_id = %invocation_id,
                "No blank line in inference output, returning full transcript"
            );
        }

        debug!(
            invocation_id = %invocation_id,
            chars = result.text.len(),
            "Inference process completed"
        );

        Ok(result)
    }

    /// [`generate`](Self::generate) for callers without an async runtime.
    ///
    /// Builds a current-thread runtime per call; must not be called from
    /// inside a tokio runtime.
    pub fn generate_blocking(&self, request: &GenerationRequest) -> LlexecResult<GenerationResult> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.generate(request))
    }

    /// Run the binary and yield generated lines as they are printed
    pub async fn generate_stream(
        &self,
        request: &GenerationRequest,
    ) -> LlexecResult<GenerationStream> {
        request.validate()?;
        let invocation = self.invocation(request);
        let invocation_id = Uuid::new_v4();

        debug!(
            invocation_id = %invocation_id,
            args = invocation.args.len(),
            max_tokens = request.max_tokens,
            "Streaming inference process"
        );

        let events = self
            .launcher
            .spawn_lines(&invocation, self.timeout)
            .await
            .inspect_err(|e| {
                warn!(invocation_id = %invocation_id, error = %e, "Inference stream aborted")
            })?;
        Ok(GenerationStream::new(events))
    }
}
