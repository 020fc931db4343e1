//! Study-note helpers
//!
//! Splits long notes into prompt-sized chunks, renders the summary and quiz
//! prompt templates, and picks structure back out of the model's free-form
//! answers.

use serde::{Deserialize, Serialize};

/// Chunk size used for both summaries and quizzes
pub const DEFAULT_CHUNK_CHARS: usize = 3200;
/// Tokens requested per summary chunk
pub const SUMMARY_MAX_TOKENS: u32 = 256;
/// Tokens requested for a quiz
pub const QUIZ_MAX_TOKENS: u32 = 512;
/// Number of bullets kept in a summary
pub const SUMMARY_BULLETS: usize = 5;
/// Summary paragraph length cap, in characters
pub const SUMMARY_MAX_CHARS: usize = 800;

/// Split `text` into chunks of at most `max_chars` characters.
///
/// A chunk ends at the last newline inside its window, else just after the
/// last period, else at the window edge. Chunks are trimmed and empty ones
/// dropped.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.trim().chars().collect();
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + max_chars).min(chars.len());
        let split = if end == chars.len() {
            end
        } else {
            let window = &chars[start + 1..end];
            if let Some(pos) = window.iter().rposition(|&c| c == '\n') {
                start + 1 + pos
            } else if let Some(pos) = window.iter().rposition(|&c| c == '.') {
                start + 2 + pos
            } else {
                end
            }
        };

        let chunk: String = chars[start..split].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        start = split;
    }

    chunks
}

/// Prompt asking for five bullets and a two-sentence summary
pub fn summary_prompt(content: &str) -> String {
    format!(
        r#"
You are EduNote, a study assistant. Summarize the following study notes into 5 concise bullet points and a 2-sentence summary.

Notes:
"""
{content}
"""

Output format:
- Bullet 1
- Bullet 2
...
Summary: <two sentence paragraph>
"#
    )
}

/// Prompt asking for five multiple-choice questions
pub fn quiz_prompt(content: &str) -> String {
    format!(
        r#"
You are EduNote, a study assistant. Create 5 multiple-choice questions from the text below.
Each question should have 4 options labeled A, B, C, D, and mark the correct option with (Answer: X).

Text:
"""
{content}
"""
"#
    )
}

/// Bullets and summary paragraph pulled from model answers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub bullets: Vec<String>,
    pub summary: String,
}

/// Accumulates summary answers across chunks
#[derive(Debug, Default)]
pub struct SummaryCollector {
    bullets: Vec<String>,
    paragraphs: Vec<String>,
}

impl SummaryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one model answer
    pub fn absorb(&mut self, output: &str) {
        for line in output.lines() {
            let line = line.trim();
            if line.starts_with('-') {
                let bullet = line.trim_start_matches(['-', ' ']).trim();
                if !bullet.is_empty() && !self.bullets.iter().any(|b| b == bullet) {
                    self.bullets.push(bullet.to_string());
                }
            } else if line.to_lowercase().starts_with("summary") {
                let paragraph = match line.split_once(':') {
                    Some((_, rest)) => rest.trim(),
                    None => line,
                };
                self.paragraphs.push(paragraph.to_string());
            }
        }
    }

    /// Enough bullets collected; remaining chunks can be skipped
    pub fn is_complete(&self) -> bool {
        self.bullets.len() >= SUMMARY_BULLETS
    }

    pub fn finish(mut self) -> Summary {
        self.bullets.truncate(SUMMARY_BULLETS);
        let summary = self
            .paragraphs
            .join(" ")
            .chars()
            .take(SUMMARY_MAX_CHARS)
            .collect();
        Summary {
            bullets: self.bullets,
            summary,
        }
    }
}

/// One multiple-choice question
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: Option<String>,
}

impl QuizQuestion {
    fn new(question: &str) -> Self {
        Self {
            question: question.to_string(),
            ..Default::default()
        }
    }
}

/// Questions recovered from a quiz answer, plus the raw answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub questions: Vec<QuizQuestion>,
    pub raw: String,
}

/// Group answer lines into questions, options and answer keys.
///
/// Parsing is best effort; `raw` always carries the full answer.
pub fn parse_quiz(output: &str) -> Quiz {
    let mut questions = Vec::new();
    let mut current: Option<QuizQuestion> = None;

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.to_lowercase().starts_with("question") || line.ends_with('?') {
            if let Some(q) = current.take() {
                questions.push(q);
            }
            current = Some(QuizQuestion::new(line));
        } else if is_option_line(line) {
            let q = current.get_or_insert_with(QuizQuestion::default);
            q.options.push(line.to_string());
            if let Some((_, answer)) = line.rsplit_once("Answer:") {
                q.answer = Some(clean_answer(answer));
            }
        } else if let Some((_, answer)) = line.split_once("(Answer:") {
            if let Some(q) = current.as_mut() {
                q.answer = Some(clean_answer(answer));
            }
        } else if current.is_none() {
            current = Some(QuizQuestion::new(line));
        }
    }

    if let Some(q) = current {
        questions.push(q);
    }

    Quiz {
        questions,
        raw: output.to_string(),
    }
}

/// `A)`, `b.`, `C ` and so on
fn is_option_line(line: &str) -> bool {
    let mut chars = line.chars();
    matches!(
        (chars.next().map(|c| c.to_ascii_uppercase()), chars.next()),
        (Some('A'..='D'), Some(')' | '.' | ' '))
    )
}

fn clean_answer(answer: &str) -> String {
    answer.trim_matches([' ', ')']).to_string()
}
