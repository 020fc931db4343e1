//! Incremental delivery of generated text

use llexec_core::{Extraction, GenerationResult, LlexecError, LlexecResult};
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tracing::warn;

use crate::traits::ProcessEvent;

/// Generated lines of a running inference process.
///
/// Header lines are held back until the first blank line. If the process
/// exits without printing one, the buffered transcript is yielded as a single
/// trimmed chunk instead. Blank lines before the first and after the last
/// generated line are never yielded, and the first line loses its leading
/// whitespace, so the collected lines equal the one-shot extraction.
pub struct GenerationStream {
    events: mpsc::Receiver<LlexecResult<ProcessEvent>>,
    header: Vec<String>,
    in_body: bool,
    emitted: bool,
    pending_blank: Vec<String>,
    ready: VecDeque<String>,
    extraction: Option<Extraction>,
    finished: bool,
}

impl GenerationStream {
    pub fn new(events: mpsc::Receiver<LlexecResult<ProcessEvent>>) -> Self {
        Self {
            events,
            header: Vec::new(),
            in_body: false,
            emitted: false,
            pending_blank: Vec::new(),
            ready: VecDeque::new(),
            extraction: None,
            finished: false,
        }
    }

    /// Next generated line, or `None` once the process has exited
    pub async fn next(&mut self) -> Option<LlexecResult<String>> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Some(Ok(line));
            }
            if self.finished {
                return None;
            }

            match self.events.recv().await {
                None => self.finished = true,
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                Some(Ok(ProcessEvent::Stdout(line))) => self.push_line(line),
                Some(Ok(ProcessEvent::Exit { code, stderr })) => {
                    self.finished = true;
                    if code != Some(0) {
                        return Some(Err(LlexecError::InferenceProcessFailed { code, stderr }));
                    }
                    self.finish_transcript();
                }
            }
        }
    }

    /// How the text was located; known once the stream is exhausted
    pub fn extraction(&self) -> Option<Extraction> {
        self.extraction
    }

    /// Drain the stream into a single result
    pub async fn collect(mut self) -> LlexecResult<GenerationResult> {
        let mut lines = Vec::new();
        while let Some(line) = self.next().await {
            lines.push(line?);
        }
        let extraction = self.extraction.unwrap_or(Extraction::Fallback);
        Ok(GenerationResult::new(
            lines.join("\n").trim().to_string(),
            extraction,
        ))
    }

    fn push_line(&mut self, line: String) {
        let blank = line.trim().is_empty();

        if !self.in_body {
            if blank {
                self.in_body = true;
            } else {
                self.header.push(line);
            }
            return;
        }

        if blank {
            if self.emitted {
                self.pending_blank.push(line);
            }
            return;
        }

        self.ready.extend(self.pending_blank.drain(..));
        if self.emitted {
            self.ready.push_back(line);
        } else {
            self.emitted = true;
            self.ready.push_back(line.trim_start().to_string());
        }
    }

    fn finish_transcript(&mut self) {
        if self.in_body {
            self.extraction = Some(Extraction::HeaderSplit);
            return;
        }

        warn!("No blank line in streamed inference output, returning full transcript");
        self.extraction = Some(Extraction::Fallback);
        let transcript = self.header.join("\n");
        let transcript = transcript.trim();
        if !transcript.is_empty() {
            self.ready.push_back(transcript.to_string());
        }
    }
}
