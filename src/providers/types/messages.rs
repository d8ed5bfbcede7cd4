use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::tools::ToolCall;

/// A single conversation message in the gateway's wire shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role")]
#[serde(rename_all = "lowercase")]
pub enum Message {
    System {
        content: MessageContent,
    },
    User {
        content: MessageContent,
    },
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<MessageContent>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
        /// Opaque signed reasoning fragments, replayed verbatim
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning_details: Option<Vec<Value>>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ImageUrl { image_url: MediaUrl },
    InputAudio { input_audio: InputAudio },
    File { file: FileData },
    VideoUrl { video_url: MediaUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAudio {
    /// Base64 encoded audio
    pub data: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    pub filename: String,
    /// Data URL of the file contents
    pub file_data: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn user_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self::User {
            content: MessageContent::Blocks(blocks),
        }
    }

    pub fn assistant(
        content: impl Into<String>,
        tool_calls: Option<Vec<ToolCall>>,
        reasoning_details: Option<Vec<Value>>,
    ) -> Self {
        let content: String = content.into();
        Self::Assistant {
            content: (!content.is_empty()).then_some(MessageContent::Text(content)),
            tool_calls,
            reasoning_details,
        }
    }

    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    pub const fn role(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
            Self::Tool { .. } => "tool",
        }
    }

    /// Text of the message, with non-text blocks omitted
    pub fn content(&self) -> String {
        match self {
            Self::System { content } | Self::User { content } => content.text(),
            Self::Assistant { content, .. } => {
                content.as_ref().map(MessageContent::text).unwrap_or_default()
            }
            Self::Tool { content, .. } => content.clone(),
        }
    }
}

impl MessageContent {
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.role(), self.content())
    }
}
