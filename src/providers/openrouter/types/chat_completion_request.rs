use serde::Serialize;
use serde_json::Value;

use crate::providers::Message;
use crate::tools::ToolDefinition;

#[derive(Debug, Default, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageOptions>,
    pub provider: ProviderRouting,
}

/// Routing preferences forced on every request
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProviderRouting {
    /// Only route to providers that honour every request parameter (tools, reasoning)
    pub require_parameters: bool,
}

impl Default for ProviderRouting {
    fn default() -> Self {
        Self {
            require_parameters: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct UsageOptions {
    pub include: bool,
}

#[derive(Debug, Serialize)]
pub struct Tool<'a> {
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    pub function: Function<'a>,
}

#[derive(Debug, Serialize)]
pub enum ToolType {
    #[serde(rename = "function")]
    Function,
}

#[derive(Debug, Serialize)]
pub struct Function<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    pub parameters: &'a Value,
}

impl<'a> From<&'a ToolDefinition> for Tool<'a> {
    fn from(tool_definition: &'a ToolDefinition) -> Self {
        Self {
            tool_type: ToolType::Function,
            function: Function {
                name: tool_definition.name.as_str(),
                description: Some(tool_definition.description.as_str()),
                parameters: &tool_definition.parameters,
            },
        }
    }
}
