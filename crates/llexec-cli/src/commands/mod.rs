//! CLI commands implementation

use anyhow::{Context, Result};
use clap::Args;
use llexec_core::notes::{
    chunk_text, parse_quiz, quiz_prompt, summary_prompt, Quiz, Summary, SummaryCollector,
    DEFAULT_CHUNK_CHARS, QUIZ_MAX_TOKENS, SUMMARY_MAX_TOKENS,
};
use llexec_core::{
    Extraction, GenerationDefaults, GenerationRequest, GenerationResult, LlexecConfig,
    LlexecError, LlexecResult,
};
use llexec_runtime::{AdapterConfig, GenerationStream, ProcessInferenceAdapter};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Path and limit flags that take precedence over the config file
#[derive(Debug, Default)]
pub struct Overrides {
    pub model: Option<PathBuf>,
    pub executable: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

/// Sampling flags shared by generation commands
#[derive(Args, Debug, Default)]
pub struct SamplingArgs {
    /// Number of tokens to predict
    #[arg(short = 'n', long = "n-predict")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[arg(long = "temp")]
    pub temperature: Option<f32>,

    /// Top-k sampling cutoff
    #[arg(long)]
    pub top_k: Option<u32>,

    /// Nucleus sampling threshold
    #[arg(long)]
    pub top_p: Option<f32>,
}

impl SamplingArgs {
    /// Apply the flags that were given on top of `request`
    pub fn apply(&self, mut request: GenerationRequest) -> GenerationRequest {
        if let Some(max_tokens) = self.max_tokens {
            request.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            request.temperature = temperature;
        }
        if let Some(top_k) = self.top_k {
            request.top_k = top_k;
        }
        if let Some(top_p) = self.top_p {
            request.top_p = top_p;
        }
        request
    }
}

/// How `generate` prints its result
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub strict: bool,
    pub json: bool,
}

/// Merge the config file's `[adapter]` section with command-line flags
pub fn adapter_config(config: &LlexecConfig, overrides: &Overrides) -> LlexecResult<AdapterConfig> {
    let mut settings = config.adapter.clone();
    if let Some(model) = &overrides.model {
        settings.model_path = Some(model.clone());
    }
    if let Some(executable) = &overrides.executable {
        settings.executable_path = Some(executable.clone());
    }
    if let Some(timeout_secs) = overrides.timeout_secs {
        settings.timeout_secs = Some(timeout_secs);
    }
    AdapterConfig::from_settings(&settings).map_err(|_| {
        LlexecError::Config("no model given; pass --model or set adapter.model_path".to_string())
    })
}

/// Construct and validate the adapter
pub fn build_adapter(config: &LlexecConfig, overrides: &Overrides) -> Result<ProcessInferenceAdapter> {
    let adapter_config = adapter_config(config, overrides)?;
    let adapter = ProcessInferenceAdapter::new(adapter_config)?;
    Ok(adapter)
}

#[derive(Serialize)]
struct GenerateResponse<'a> {
    prompt: &'a str,
    response: &'a str,
    extraction: Extraction,
}

/// Generate text for a single prompt
pub async fn generate(
    adapter: &ProcessInferenceAdapter,
    request: &GenerationRequest,
    output: OutputOptions,
) -> Result<()> {
    let result = adapter.generate(request).await?;
    println!("{}", render_generation(request, result, output)?);
    Ok(())
}

/// Format a result for printing, enforcing `--strict`
fn render_generation(
    request: &GenerationRequest,
    result: GenerationResult,
    output: OutputOptions,
) -> Result<String> {
    let extraction = result.extraction;
    let text = if output.strict {
        result.into_strict()?
    } else {
        result.text
    };

    if output.json {
        let response = GenerateResponse {
            prompt: &request.prompt,
            response: &text,
            extraction,
        };
        Ok(serde_json::to_string_pretty(&response)?)
    } else {
        Ok(text)
    }
}

/// Generate text for a single prompt, printing lines as they arrive
pub async fn generate_stream(
    adapter: &ProcessInferenceAdapter,
    request: &GenerationRequest,
    strict: bool,
) -> Result<()> {
    let mut stream = adapter.generate_stream(request).await?;
    while let Some(line) = stream.next().await {
        let line = line?;
        check_stream_strict(&stream, strict)?;
        println!("{}", line);
    }
    // An empty transcript yields no lines but still counts as a fallback
    check_stream_strict(&stream, strict)?;
    Ok(())
}

fn check_stream_strict(stream: &GenerationStream, strict: bool) -> LlexecResult<()> {
    if strict && stream.extraction() == Some(Extraction::Fallback) {
        return Err(LlexecError::OutputExtractionAmbiguous);
    }
    Ok(())
}

#[derive(Serialize)]
struct CheckResponse {
    model: PathBuf,
    executable: PathBuf,
    timeout_secs: Option<u64>,
}

/// Show the resolved paths
pub fn check(adapter: &ProcessInferenceAdapter, json: bool) -> Result<()> {
    let response = CheckResponse {
        model: adapter.model().path().to_path_buf(),
        executable: adapter.executable().path().to_path_buf(),
        timeout_secs: adapter.timeout().map(|t| t.as_secs()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("Model:      {}", response.model.display());
        println!("Executable: {}", response.executable.display());
        if let Some(secs) = response.timeout_secs {
            println!("Timeout:    {}s", secs);
        }
    }

    Ok(())
}

/// Summarize a notes file chunk by chunk
pub async fn summarize(
    adapter: &ProcessInferenceAdapter,
    defaults: &GenerationDefaults,
    file: &Path,
    json: bool,
) -> Result<()> {
    let text = read_notes(file)?;
    let chunks = chunk_text(&text, DEFAULT_CHUNK_CHARS);
    if chunks.is_empty() {
        anyhow::bail!("No text found in {}", file.display());
    }

    info!(chunks = chunks.len(), "Summarizing notes");

    let mut collector = SummaryCollector::new();
    for (index, chunk) in chunks.iter().enumerate() {
        let request = defaults
            .request(summary_prompt(chunk))
            .with_max_tokens(SUMMARY_MAX_TOKENS);
        let result = adapter.generate(&request).await?;
        collector.absorb(&result.text);

        debug!(chunk = index, "Summary chunk done");
        if collector.is_complete() {
            break;
        }
    }

    let summary = collector.finish();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", format_summary(&summary));
    }

    Ok(())
}

/// Build a quiz from the first chunk of a notes file
pub async fn quiz(
    adapter: &ProcessInferenceAdapter,
    defaults: &GenerationDefaults,
    file: &Path,
    json: bool,
) -> Result<()> {
    let text = read_notes(file)?;
    let chunk = chunk_text(&text, DEFAULT_CHUNK_CHARS)
        .into_iter()
        .next()
        .with_context(|| format!("No text found in {}", file.display()))?;

    let request = defaults
        .request(quiz_prompt(&chunk))
        .with_max_tokens(QUIZ_MAX_TOKENS);
    let result = adapter.generate(&request).await?;
    let quiz = parse_quiz(&result.text);

    if json {
        println!("{}", serde_json::to_string_pretty(&quiz)?);
    } else {
        print!("{}", format_quiz(&quiz));
    }

    Ok(())
}

/// Read a plain text notes file, replacing invalid UTF-8
fn read_notes(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    if let Some(ext @ ("pdf" | "docx")) = ext.as_deref() {
        anyhow::bail!(
            "Unsupported file type '.{}'; convert {} to plain text first",
            ext,
            path.display()
        );
    }

    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read notes from {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn format_summary(summary: &Summary) -> String {
    let mut out = String::new();
    for bullet in &summary.bullets {
        out.push_str(&format!("- {}\n", bullet));
    }
    if !summary.summary.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("Summary: {}\n", summary.summary));
    }
    out
}

fn format_quiz(quiz: &Quiz) -> String {
    if quiz.questions.is_empty() {
        return format!("{}\n", quiz.raw.trim());
    }

    let mut out = String::new();
    for (i, question) in quiz.questions.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("{}. {}\n", i + 1, question.question));
        for option in &question.options {
            out.push_str(&format!("   {}\n", option));
        }
        if let Some(answer) = &question.answer {
            out.push_str(&format!("   Answer: {}\n", answer));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use llexec_core::notes::QuizQuestion;
    use llexec_runtime::ProcessEvent;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[test]
    fn test_overrides_win() {
        let mut config = LlexecConfig::default();
        config.adapter.model_path = Some(PathBuf::from("/from/config.gguf"));
        config.adapter.timeout_secs = Some(600);

        let overrides = Overrides {
            model: Some(PathBuf::from("/from/flag.gguf")),
            executable: None,
            timeout_secs: Some(5),
        };
        let merged = adapter_config(&config, &overrides).unwrap();
        assert_eq!(merged.model_path, PathBuf::from("/from/flag.gguf"));
        assert_eq!(merged.timeout, Some(Duration::from_secs(5)));
        assert!(merged.executable_path.is_none());
    }

    #[test]
    fn test_model_required() {
        let err = adapter_config(&LlexecConfig::default(), &Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("--model"));
    }

    #[test]
    fn test_missing_model_is_construction_error() {
        let overrides = Overrides {
            model: Some(PathBuf::from("/nonexistent/model.gguf")),
            ..Default::default()
        };
        let err = build_adapter(&LlexecConfig::default(), &overrides).unwrap_err();
        let err = err.downcast_ref::<LlexecError>().unwrap();
        assert!(matches!(err, LlexecError::ArtifactNotFound(_)));
    }

    #[test]
    fn test_render_generation_strict() {
        let request = GenerationRequest::new("hi");
        let strict = OutputOptions {
            strict: true,
            json: false,
        };

        let clean = GenerationResult::new("answer".to_string(), Extraction::HeaderSplit);
        assert_eq!(render_generation(&request, clean, strict).unwrap(), "answer");

        let fallback = GenerationResult::new(String::new(), Extraction::Fallback);
        let err = render_generation(&request, fallback.clone(), strict).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LlexecError>(),
            Some(LlexecError::OutputExtractionAmbiguous)
        ));
        assert!(render_generation(&request, fallback, OutputOptions::default()).is_ok());
    }

    #[test]
    fn test_render_generation_json() {
        let request = GenerationRequest::new("hi");
        let result = GenerationResult::new("answer".to_string(), Extraction::HeaderSplit);
        let json = OutputOptions {
            strict: false,
            json: true,
        };
        let value: serde_json::Value =
            serde_json::from_str(&render_generation(&request, result, json).unwrap()).unwrap();
        assert_eq!(value["prompt"], "hi");
        assert_eq!(value["response"], "answer");
        assert_eq!(value["extraction"], "header-split");
    }

    #[tokio::test]
    async fn test_strict_stream_with_empty_transcript() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(Ok(ProcessEvent::Exit {
            code: Some(0),
            stderr: String::new(),
        }))
        .await
        .unwrap();
        drop(tx);

        let mut stream = GenerationStream::new(rx);
        assert!(stream.next().await.is_none());
        assert!(check_stream_strict(&stream, false).is_ok());
        assert!(matches!(
            check_stream_strict(&stream, true),
            Err(LlexecError::OutputExtractionAmbiguous)
        ));
    }

    #[test]
    fn test_sampling_apply() {
        let sampling = SamplingArgs {
            max_tokens: Some(32),
            top_p: Some(0.5),
            ..Default::default()
        };
        let request = sampling.apply(GenerationRequest::new("hi"));
        assert_eq!(request.max_tokens, 32);
        assert_eq!(request.top_p, 0.5);
        assert_eq!(request.temperature, 0.8);
        assert_eq!(request.top_k, 40);
    }

    #[test]
    fn test_read_notes() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, b"Mitochondria \xff make ATP").unwrap();
        assert_eq!(read_notes(&txt).unwrap(), "Mitochondria \u{fffd} make ATP");

        let pdf = dir.path().join("notes.PDF");
        std::fs::write(&pdf, b"%PDF").unwrap();
        let err = read_notes(&pdf).unwrap_err();
        assert!(err.to_string().contains("Unsupported file type '.pdf'"));

        assert!(read_notes(&dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn test_format_summary() {
        let summary = Summary {
            bullets: vec!["one".to_string(), "two".to_string()],
            summary: "Short.".to_string(),
        };
        assert_eq!(format_summary(&summary), "- one\n- two\n\nSummary: Short.\n");
        assert_eq!(format_summary(&Summary::default()), "");
    }

    #[test]
    fn test_format_quiz() {
        let quiz = Quiz {
            questions: vec![QuizQuestion {
                question: "What is ATP?".to_string(),
                options: vec!["A) Energy".to_string(), "B) Salt".to_string()],
                answer: Some("A".to_string()),
            }],
            raw: String::new(),
        };
        assert_eq!(
            format_quiz(&quiz),
            "1. What is ATP?\n   A) Energy\n   B) Salt\n   Answer: A\n"
        );

        let raw = Quiz {
            questions: Vec::new(),
            raw: "  nothing useful \n".to_string(),
        };
        assert_eq!(format_quiz(&raw), "nothing useful\n");
    }
}
