use serde::Deserialize;
use serde_json::Value;

use super::shared::ErrorDetails;
use crate::providers::types::stream_event::null_as_default;
use crate::providers::{FinishReason, Usage};

/// Raw SSE payload as sent by the gateway
#[derive(Debug, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
    /// Set when the upstream provider fails after the stream has started
    #[serde(default)]
    pub error: Option<ErrorDetails>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub delta: Option<Delta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub index: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<DeltaContent>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub reasoning_details: Option<Vec<Value>>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// Providers disagree on the shape of streamed content
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DeltaContent {
    PlainText(String),
    Blocks(Vec<DeltaBlock>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeltaBlock {
    Text {
        #[serde(default, deserialize_with = "null_as_default")]
        text: String,
    },
    Thinking {
        #[serde(default, alias = "text", deserialize_with = "null_as_default")]
        thinking: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct ToolCallDelta {
    /// Position of the call this fragment belongs to; absent or `null` means 0
    #[serde(default, deserialize_with = "null_as_default")]
    pub index: usize,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub call_type: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionDelta>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct FunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// One decoded stream event: the first choice's delta plus terminal data
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StreamChunk {
    pub delta: Option<Delta>,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
    pub error: Option<String>,
}

impl From<ChatCompletionChunk> for StreamChunk {
    fn from(chunk: ChatCompletionChunk) -> Self {
        let (delta, finish_reason) = chunk
            .choices
            .into_iter()
            .next()
            .map(|choice| {
                (
                    choice.delta,
                    choice.finish_reason.as_deref().map(FinishReason::from),
                )
            })
            .unwrap_or_default();

        Self {
            delta,
            finish_reason,
            usage: chunk.usage,
            error: chunk.error.map(ErrorDetails::into_message),
        }
    }
}
