//! llexec CLI
//!
//! Command-line interface for running prompts through a local inference
//! binary.

mod commands;

use clap::{Parser, Subcommand};
use llexec_core::{LlexecConfig, LlexecError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// llexec - run prompts through a local llama.cpp binary
#[derive(Parser, Debug)]
#[command(name = "llexec")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model weights file
    #[arg(long, short = 'm', global = true)]
    model: Option<PathBuf>,

    /// Inference binary
    #[arg(long, global = true)]
    executable: Option<PathBuf>,

    /// Kill the inference process after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a continuation for a prompt
    Generate {
        /// Prompt text
        prompt: String,

        #[command(flatten)]
        sampling: commands::SamplingArgs,

        /// Fail if the output had no blank line after its header
        #[arg(long)]
        strict: bool,

        /// Print lines as the model produces them
        #[arg(long, conflicts_with = "json")]
        stream: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the model and executable paths
    Check {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize a text file into bullets and a short paragraph
    Summarize {
        /// Plain text file
        file: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create multiple-choice questions from a text file
    Quiz {
        /// Plain text file
        file: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match LlexecConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => LlexecConfig::default(),
    };

    // Initialize logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        parse_level(&config.logging.level)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}

async fn run(cli: Cli, config: LlexecConfig) -> anyhow::Result<()> {
    let overrides = commands::Overrides {
        model: cli.model,
        executable: cli.executable,
        timeout_secs: cli.timeout,
    };

    match cli.command {
        Commands::Generate {
            prompt,
            sampling,
            strict,
            stream,
            json,
        } => {
            let adapter = commands::build_adapter(&config, &overrides)?;
            let request = sampling.apply(config.generation.request(prompt));
            let output = commands::OutputOptions { strict, json };
            if stream {
                commands::generate_stream(&adapter, &request, strict).await?;
            } else {
                commands::generate(&adapter, &request, output).await?;
            }
        }
        Commands::Check { json } => {
            let adapter = commands::build_adapter(&config, &overrides)?;
            commands::check(&adapter, json)?;
        }
        Commands::Summarize { file, json } => {
            let adapter = commands::build_adapter(&config, &overrides)?;
            commands::summarize(&adapter, &config.generation, &file, json).await?;
        }
        Commands::Quiz { file, json } => {
            let adapter = commands::build_adapter(&config, &overrides)?;
            commands::quiz(&adapter, &config.generation, &file, json).await?;
        }
    }

    Ok(())
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    }
}

/// 2 for bad paths, 3 for a failed generation, 1 otherwise
fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<LlexecError>() {
        Some(e) if e.is_construction_error() => 2,
        Some(
            LlexecError::InferenceProcessFailed { .. }
            | LlexecError::OutputExtractionAmbiguous
            | LlexecError::Timeout(_)
            | LlexecError::Spawn(_)
            | LlexecError::InvalidRequest(_),
        ) => 3,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_generate() {
        let cli = Cli::try_parse_from([
            "llexec",
            "--model",
            "~/m.gguf",
            "generate",
            "Hello there",
            "-n",
            "64",
            "--temp",
            "0.2",
            "--strict",
        ])
        .unwrap();

        assert_eq!(cli.model, Some(PathBuf::from("~/m.gguf")));
        match cli.command {
            Commands::Generate {
                prompt,
                sampling,
                strict,
                stream,
                ..
            } => {
                assert_eq!(prompt, "Hello there");
                assert_eq!(sampling.max_tokens, Some(64));
                assert_eq!(sampling.temperature, Some(0.2));
                assert!(strict);
                assert!(!stream);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_stream_conflicts_with_json() {
        let result = Cli::try_parse_from(["llexec", "generate", "hi", "--stream", "--json"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("bogus"), Level::WARN);
    }

    #[test]
    fn test_exit_codes() {
        let missing = anyhow::Error::from(LlexecError::ArtifactNotFound(PathBuf::from("/m")));
        assert_eq!(exit_status(&missing), 2);

        let failed = anyhow::Error::from(LlexecError::InferenceProcessFailed {
            code: Some(1),
            stderr: String::new(),
        });
        assert_eq!(exit_status(&failed), 3);

        let other = anyhow::anyhow!("could not read notes");
        assert_eq!(exit_status(&other), 1);
    }
}
