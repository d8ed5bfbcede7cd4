use async_stream::try_stream;
use futures::{Stream, StreamExt};
use reqwest::Response;
use std::fmt::Display;
use std::pin::Pin;

use crate::core::LLMError;

const LINE_TERMINATOR: char = '\n';
const COMMENT_PREFIX: char = ':';
const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";

pub type LineStream = Pin<Box<dyn Stream<Item = Result<String, LLMError>> + Send>>;

/// Incremental splitter turning arbitrary byte chunks into complete lines.
///
/// Bytes that end in the middle of a UTF-8 sequence are held back until the
/// rest of the character arrives, so a line split across reads never turns
/// into replacement characters.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
    utf8_tail: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns every line it completed
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.decode(bytes);

        let mut lines = Vec::new();
        while let Some(end) = self.pending.find(LINE_TERMINATOR) {
            let mut line: String = self.pending.drain(..=end).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }

    /// Returns the trailing partial line once the source is exhausted
    pub fn finish(&mut self) -> Option<String> {
        if !self.utf8_tail.is_empty() {
            let tail = std::mem::take(&mut self.utf8_tail);
            self.pending.push_str(&String::from_utf8_lossy(&tail));
        }
        let rest = std::mem::take(&mut self.pending);
        let rest = rest.strip_suffix('\r').unwrap_or(&rest).to_string();
        (!rest.is_empty()).then_some(rest)
    }

    fn decode(&mut self, bytes: &[u8]) {
        self.utf8_tail.extend_from_slice(bytes);
        match std::str::from_utf8(&self.utf8_tail) {
            Ok(text) => {
                self.pending.push_str(text);
                self.utf8_tail.clear();
            }
            Err(err) => {
                let valid_up_to = err.valid_up_to();
                // A hard error (not just a truncated tail) is replaced rather than held forever
                let consumed = match err.error_len() {
                    Some(invalid) => valid_up_to + invalid,
                    None => valid_up_to,
                };
                if consumed == 0 {
                    return;
                }
                let valid = String::from_utf8_lossy(&self.utf8_tail[..consumed]).into_owned();
                self.pending.push_str(&valid);
                self.utf8_tail.drain(..consumed);
                if err.error_len().is_some() {
                    self.decode(&[]);
                }
            }
        }
    }
}

/// What a single SSE line means to a chat-completion consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Blank lines, comments/keep-alives and non-data fields
    Ignored,
    /// The `[DONE]` end-of-stream sentinel
    Done,
    /// Payload following the `data: ` marker
    Data(&'a str),
}

impl<'a> Frame<'a> {
    pub fn classify(line: &'a str) -> Self {
        if line.trim().is_empty() || line.starts_with(COMMENT_PREFIX) {
            return Self::Ignored;
        }

        match line.strip_prefix(DATA_PREFIX) {
            Some(payload) if payload.trim() == DONE_MARKER => Self::Done,
            Some(payload) => Self::Data(payload),
            None => Self::Ignored,
        }
    }
}

/// Turns any fallible byte stream into a stream of complete lines
pub fn lines<S, B, E>(mut source: S) -> LineStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(try_stream! {
        let mut buffer = LineBuffer::new();

        while let Some(chunk) = source.next().await {
            let chunk = chunk.map_err(|e| LLMError::StreamError(e.to_string()))?;
            for line in buffer.push(chunk.as_ref()) {
                yield line;
            }
        }

        if let Some(line) = buffer.finish() {
            yield line;
        }
    })
}

/// Extension trait for reading a streaming response line by line
pub trait EventSourceExt {
    fn lines(self) -> LineStream;
}

impl EventSourceExt for Response {
    fn lines(self) -> LineStream {
        lines(Box::pin(self.bytes_stream()))
    }
}
