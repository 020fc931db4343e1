//! Extraction of generated text from an inference binary's stdout
//!
//! llama-cli prints load and sampling diagnostics before the continuation
//! and offers no delimiter. The first whitespace-only line is taken as the
//! end of that header block. This breaks if the tool ever prints no header,
//! or if the continuation itself begins with a blank line.

use crate::{Extraction, GenerationResult};

/// Split a transcript at its first blank line.
///
/// Everything after that line, joined with `\n` and trimmed, is the
/// generated text. Without a blank line the whole transcript is returned
/// trimmed and marked as [`Extraction::Fallback`].
pub fn extract_generated_text(stdout: &str) -> GenerationResult {
    let lines: Vec<&str> = stdout.lines().collect();

    match lines.iter().position(|line| line.trim().is_empty()) {
        Some(idx) => GenerationResult::new(
            lines[idx + 1..].join("\n").trim().to_string(),
            Extraction::HeaderSplit,
        ),
        None => GenerationResult::new(stdout.trim().to_string(), Extraction::Fallback),
    }
}

/// Render a float argument for the command line.
///
/// Uses the shortest decimal that round-trips (`0.8`, not `0.800000`);
/// integral values keep one fractional digit so `1.0` stays a float.
pub fn render_float(value: f32) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
