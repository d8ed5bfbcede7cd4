use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::collections::HashMap;

use crate::core::error::ToolError;

use super::types::{Tool, ToolDefinition, ToolExecutor, ToolOutcome};

/// Registry for managing and looking up available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let def = tool.definition();
        self.tools.insert(def.name, Box::new(tool));
    }

    pub fn get_tool(&self, name: &str) -> Option<&dyn Tool> {
        Some(self.tools.get(name)?.as_ref())
    }

    pub async fn execute_tool(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        let tool = self
            .get_tool(name)
            .ok_or_else(|| ToolError::ToolNotFound(name.to_string()))?;
        tool.execute(arguments).await
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    fn definitions(&self, ids: &[String]) -> Vec<ToolDefinition> {
        ids.iter()
            .filter_map(|id| {
                let tool = self.get_tool(id);
                if tool.is_none() {
                    debug!("[Tools] requested tool '{id}' is not registered");
                }
                tool.map(|t| t.definition())
            })
            .collect()
    }

    async fn execute(&self, name: &str, params: &Value) -> ToolOutcome {
        self.execute_tool(name, params).await.into()
    }
}
