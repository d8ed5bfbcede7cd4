use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::core::error::ToolError;
use crate::tools::types::{Tool, ToolDefinition};

const TOOL_NAME: &str = "date_time";
const FORMAT_ERROR: &str = "format must be one of: rfc3339, unix";

/// Reports the current date and time in UTC
pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: TOOL_NAME.to_string(),
            description: "Returns the current date and time in UTC".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "format": {
                        "type": "string",
                        "enum": ["rfc3339", "unix"],
                        "description": "Only return the timestamp in this format"
                    }
                }
            }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError> {
        Self::render(Utc::now(), arguments.get("format"))
    }
}

impl DateTimeTool {
    fn render(now: DateTime<Utc>, format: Option<&Value>) -> Result<Value, ToolError> {
        let Some(format) = format.filter(|f| !f.is_null()) else {
            return Ok(json!({
                "utc": now.to_rfc3339(),
                "unix": now.timestamp(),
                "weekday": now.format("%A").to_string(),
            }));
        };

        match format.as_str() {
            Some("rfc3339") => Ok(json!(now.to_rfc3339())),
            Some("unix") => Ok(json!(now.timestamp())),
            _ => Err(ToolError::InvalidArgument(FORMAT_ERROR.to_string())),
        }
    }
}
