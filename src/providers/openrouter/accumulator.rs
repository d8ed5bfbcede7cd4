use std::collections::BTreeMap;

use log::debug;
use serde_json::Value;

use super::types::{Delta, DeltaBlock, DeltaContent, StreamChunk, ToolCallDelta};
use crate::providers::{FinishReason, StreamEvent, StreamOutcome};
use crate::tools::{validate_tool_calls, PartialToolCall};

/// Lifecycle of a single stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Streaming,
    Completed,
    ToolCallsPending,
    Errored,
    Cancelled,
}

/// Merges incremental deltas of one stream into events.
///
/// Text and reasoning pass straight through. Tool calls are assembled per
/// index and released once, when the stream finishes with `tool_calls`.
#[derive(Debug)]
pub struct StreamAccumulator {
    state: StreamState,
    tool_calls: BTreeMap<usize, PartialToolCall>,
    reasoning_details: Vec<Value>,
}

impl Default for StreamAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAccumulator {
    pub const fn new() -> Self {
        Self {
            state: StreamState::Idle,
            tool_calls: BTreeMap::new(),
            reasoning_details: Vec::new(),
        }
    }

    pub const fn state(&self) -> StreamState {
        self.state
    }

    /// Applies one chunk and returns the events it produced, in order
    pub fn apply(&mut self, chunk: StreamChunk) -> Vec<StreamEvent> {
        if matches!(self.state, StreamState::Errored | StreamState::Cancelled) {
            return Vec::new();
        }
        if self.state == StreamState::Idle {
            self.state = StreamState::Streaming;
        }

        let mut events = Vec::new();

        if let Some(delta) = chunk.delta {
            self.apply_delta(delta, &mut events);
        }

        if let Some(usage) = chunk.usage {
            events.push(StreamEvent::Usage(usage));
        }

        if let Some(finish_reason) = chunk.finish_reason {
            self.finish_with(finish_reason, &mut events);
        }

        events
    }

    pub fn fail(&mut self) {
        self.state = StreamState::Errored;
        self.discard();
    }

    pub fn cancel(&mut self) {
        self.state = StreamState::Cancelled;
        self.discard();
    }

    /// Final outcome once the source is exhausted
    pub fn finish(self) -> StreamOutcome {
        match self.state {
            StreamState::ToolCallsPending => StreamOutcome::ToolCallsPending,
            StreamState::Cancelled => StreamOutcome::Cancelled,
            _ => StreamOutcome::Completed,
        }
    }

    fn apply_delta(&mut self, delta: Delta, events: &mut Vec<StreamEvent>) {
        match delta.content {
            Some(DeltaContent::PlainText(text)) => push_text(events, StreamEvent::Content, text),
            Some(DeltaContent::Blocks(blocks)) => {
                for block in blocks {
                    match block {
                        DeltaBlock::Text { text } => push_text(events, StreamEvent::Content, text),
                        DeltaBlock::Thinking { thinking } => {
                            push_text(events, StreamEvent::Reasoning, thinking);
                        }
                        DeltaBlock::Other => {}
                    }
                }
            }
            None => {}
        }

        if let Some(reasoning) = delta.reasoning {
            push_text(events, StreamEvent::Reasoning, reasoning);
        }

        if let Some(details) = delta.reasoning_details {
            self.reasoning_details.extend(details);
        }

        for tool_call in delta.tool_calls.into_iter().flatten() {
            self.merge_tool_call(tool_call);
        }
    }

    fn merge_tool_call(&mut self, delta: ToolCallDelta) {
        let entry = self.tool_calls.entry(delta.index).or_default();

        if let Some(id) = delta.id {
            entry.id = id;
        }
        if let Some(call_type) = delta.call_type {
            entry.call_type = call_type;
        }

        let Some(function_delta) = delta.function else {
            return;
        };
        // Always present on entries created by `or_default`
        let Some(function) = entry.function.as_mut() else {
            return;
        };
        if let Some(name) = function_delta.name {
            function.name = name;
        }
        if let Some(arguments) = function_delta.arguments {
            function.arguments.push_str(&arguments);
        }
    }

    fn finish_with(&mut self, finish_reason: FinishReason, events: &mut Vec<StreamEvent>) {
        let is_tool_calls = finish_reason == FinishReason::ToolCalls;
        match self.state {
            StreamState::Streaming if is_tool_calls && !self.tool_calls.is_empty() => {
                self.state = StreamState::ToolCallsPending;
                let calls = validate_tool_calls(std::mem::take(&mut self.tool_calls));
                if calls.is_empty() {
                    debug!("[Accumulator] no valid tool calls left after validation");
                    return;
                }
                let details = std::mem::take(&mut self.reasoning_details);
                events.push(StreamEvent::ToolCalls {
                    calls,
                    finish_reason,
                    reasoning_details: (!details.is_empty()).then_some(details),
                });
            }
            StreamState::Streaming => self.state = StreamState::Completed,
            state => {
                debug!("[Accumulator] ignoring finish reason {finish_reason} in state {state:?}");
            }
        }
    }

    fn discard(&mut self) {
        self.tool_calls.clear();
        self.reasoning_details.clear();
    }
}

fn push_text(events: &mut Vec<StreamEvent>, event: fn(String) -> StreamEvent, text: String) {
    if !text.is_empty() {
        events.push(event(text));
    }
}
