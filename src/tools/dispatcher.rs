use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;

use futures::future::join_all;
use futures::FutureExt;
use log::{debug, warn};
use serde_json::{json, Value};

use crate::providers::Message;

use super::types::{FunctionCall, ToolCall, ToolExecutor, ToolOutcome, FUNCTION_CALL_TYPE};

const EMPTY_ARGUMENTS: &str = "{}";

/// A tool call still being assembled from stream fragments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialToolCall {
    pub id: String,
    pub call_type: String,
    pub function: Option<FunctionCall>,
}

impl Default for PartialToolCall {
    fn default() -> Self {
        Self {
            id: String::new(),
            call_type: FUNCTION_CALL_TYPE.to_string(),
            function: Some(FunctionCall::new("", "")),
        }
    }
}

impl PartialToolCall {
    /// Names of the required fields that are still empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.id.is_empty() {
            missing.push("id");
        }
        match &self.function {
            None => missing.push("function"),
            Some(function) if function.name.is_empty() => missing.push("function.name"),
            Some(_) => {}
        }
        missing
    }

    fn into_tool_call(self) -> Option<ToolCall> {
        let mut function = self.function?;
        if function.arguments.trim().is_empty() {
            function.arguments = EMPTY_ARGUMENTS.to_string();
        }
        Some(ToolCall {
            id: self.id,
            call_type: self.call_type,
            function,
        })
    }
}

/// Orders accumulated calls by index and drops the incomplete ones
pub fn validate_tool_calls(partials: BTreeMap<usize, PartialToolCall>) -> Vec<ToolCall> {
    partials
        .into_iter()
        .filter_map(|(index, partial)| {
            let missing = partial.missing_fields();
            if missing.is_empty() {
                partial.into_tool_call()
            } else {
                warn!(
                    "[Tools] dropping tool call at index {index}: missing {}",
                    missing.join(", ")
                );
                None
            }
        })
        .collect()
}

/// Runs every call concurrently and returns one tool message per call, in input order.
///
/// Failures of any kind are reported back to the model as that call's result.
pub async fn dispatch_tool_calls(executor: &dyn ToolExecutor, calls: &[ToolCall]) -> Vec<Message> {
    let executions = calls.iter().map(|call| async move {
        let outcome = execute_call(executor, call).await;
        Message::tool(outcome_content(&outcome), &call.id)
    });

    join_all(executions).await
}

async fn execute_call(executor: &dyn ToolExecutor, call: &ToolCall) -> ToolOutcome {
    let params: Value = match serde_json::from_str(&call.function.arguments) {
        Ok(params) => params,
        Err(e) => {
            warn!("[Tools] invalid arguments for {call}: {e}");
            return ToolOutcome::failure(format!("Invalid argument: {e}"));
        }
    };

    debug!("[Tools] executing {call}");
    let execution = AssertUnwindSafe(executor.execute(&call.function.name, &params));
    match execution.catch_unwind().await {
        Ok(outcome) => {
            if let Some(error) = &outcome.error {
                warn!("[Tools] {} failed: {error}", call.function.name);
            }
            outcome
        }
        Err(_) => {
            warn!("[Tools] {} panicked", call.function.name);
            ToolOutcome::failure(format!("Tool '{}' panicked", call.function.name))
        }
    }
}

fn outcome_content(outcome: &ToolOutcome) -> String {
    let payload = match (outcome.success, &outcome.data) {
        (true, Some(data)) => data.clone(),
        (true, None) => Value::Null,
        (false, _) => json!({
            "error": outcome.error.as_deref().unwrap_or("Tool execution failed")
        }),
    };
    payload.to_string()
}
