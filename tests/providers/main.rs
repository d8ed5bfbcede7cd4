mod conversation_test;
mod openrouter_test;

use chat_stream::core::{Config, LLMError};
use chat_stream::providers::{FinishReason, StreamHandler, Usage};
use chat_stream::tools::ToolCall;
use serde_json::Value;

/// Gateway config pointed at a mock server
pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.gateway.base_url = format!("{base_url}/api/v1");
    config
}

/// Joins a list of JSON chunks into an SSE body terminated by `[DONE]`
pub fn sse_body(chunks: &[Value]) -> String {
    let mut body = String::from(": OPENROUTER PROCESSING\n\n");
    for chunk in chunks {
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

#[derive(Default)]
pub struct Recorder {
    pub content: String,
    pub reasoning: String,
    pub tool_calls: Vec<(Vec<ToolCall>, FinishReason)>,
    pub completions: Vec<(Usage, f64)>,
    pub errors: Vec<String>,
}

impl StreamHandler for Recorder {
    fn on_content(&mut self, text: &str) {
        self.content.push_str(text);
    }

    fn on_reasoning(&mut self, text: &str) {
        self.reasoning.push_str(text);
    }

    fn on_tool_calls(
        &mut self,
        calls: &[ToolCall],
        finish_reason: &FinishReason,
        _reasoning_details: Option<&[Value]>,
    ) {
        self.tool_calls.push((calls.to_vec(), finish_reason.clone()));
    }

    fn on_complete(&mut self, usage: &Usage, cost: f64) {
        self.completions.push((*usage, cost));
    }

    fn on_error(&mut self, error: &LLMError) {
        self.errors.push(error.to_string());
    }
}
