use crate::core::LLMError;
use crate::providers::{FinishReason, Message, StreamOutcome, Usage};
use crate::tools::{ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Receives the output of a stream while it is in flight.
///
/// Every method defaults to doing nothing so implementors only pick the
/// events they care about.
pub trait StreamHandler: Send {
    /// A piece of assistant text
    fn on_content(&mut self, _text: &str) {}

    /// A piece of reasoning/thinking text
    fn on_reasoning(&mut self, _text: &str) {}

    /// Validated tool calls; called at most once per stream
    fn on_tool_calls(
        &mut self,
        _calls: &[ToolCall],
        _finish_reason: &FinishReason,
        _reasoning_details: Option<&[Value]>,
    ) {
    }

    /// Terminal usage with the computed cost in USD
    fn on_complete(&mut self, _usage: &Usage, _cost: f64) {}

    /// Precondition, transport or protocol failure; never called on cancellation
    fn on_error(&mut self, _error: &LLMError) {}
}

/// Result of a non-streamed query
#[derive(Debug, Clone)]
pub struct Completion {
    pub message: Message,
    pub reasoning: Option<String>,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
    pub cost: f64,
}

#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Query the LLM with a list of messages and optional tools
    async fn query(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<Completion, LLMError>;

    /// Stream a response into `handler` until it ends, fails or `cancel` fires
    async fn query_streaming(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        handler: &mut dyn StreamHandler,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, LLMError>;
}
