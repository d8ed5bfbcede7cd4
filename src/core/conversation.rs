use std::io::{self, Write};

use colored::Colorize;
use log::{debug, warn};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::core::LLMError;
use crate::providers::{FinishReason, LLMClient, Message, StreamHandler, StreamOutcome, Usage};
use crate::tools::{dispatch_tool_calls, ToolCall, ToolExecutor};

const TOOLS_DISABLED_ERROR: &str = "Tool calls are disabled";

/// Manages the conversation loop between an LLM and its available tools.
/// Handles message streaming, tool execution, and conversation state.
pub struct ConversationManager {
    client: Box<dyn LLMClient>,
    tool_registry: Option<Box<dyn ToolExecutor>>,
    tool_ids: Vec<String>,
    show_reasoning: bool,
}

/// What a finished conversation produced
#[derive(Debug)]
pub struct ConversationSummary {
    pub messages: Vec<Message>,
    pub usage: Usage,
    pub cost: f64,
    pub steps: u32,
    pub cancelled: bool,
}

impl ConversationManager {
    /// Creates a new `ConversationManager`.
    ///
    /// # Arguments
    /// * `client` - The LLM client implementation to use for queries
    /// * `tool_registry` - Optional registry the model's tool calls run against
    /// * `tool_ids` - Which registered tools are offered to the model
    pub fn new(
        client: Box<dyn LLMClient>,
        tool_registry: Option<Box<dyn ToolExecutor>>,
        tool_ids: Vec<String>,
    ) -> Self {
        Self {
            client,
            tool_registry,
            tool_ids,
            show_reasoning: false,
        }
    }

    /// Also write reasoning text, dimmed, to the output
    #[must_use]
    pub const fn with_reasoning(mut self, show_reasoning: bool) -> Self {
        self.show_reasoning = show_reasoning;
        self
    }

    /// Runs the conversation loop, processing messages and executing tools as needed.
    ///
    /// # Arguments
    /// * `initial_messages` - The starting messages for the conversation
    /// * `max_steps` - Maximum number of conversation turns to allow
    /// * `writer` - Output writer for streaming responses
    /// * `cancel` - Stops the current turn and ends the conversation
    pub async fn run<W: Write + Send>(
        &mut self,
        initial_messages: Vec<Message>,
        max_steps: u32,
        writer: &mut W,
        cancel: &CancellationToken,
    ) -> Result<ConversationSummary, LLMError> {
        let mut conversation_state = ConversationState::new(initial_messages);
        let tool_definitions = self
            .tool_registry
            .as_ref()
            .map(|registry| registry.definitions(&self.tool_ids));

        for step in 0..max_steps {
            debug!("[Conversation] step: {step}");
            conversation_state.steps += 1;

            let mut recorder = TurnRecorder::new(&mut *writer, self.show_reasoning);
            let outcome = self
                .client
                .query_streaming(
                    &conversation_state.messages,
                    tool_definitions.as_deref(),
                    &mut recorder,
                    cancel,
                )
                .await?;
            let turn = recorder.finish()?;
            conversation_state.add_usage(turn.usage, turn.cost);

            if outcome == StreamOutcome::Cancelled {
                debug!("[Conversation] cancelled, ending conversation");
                conversation_state.add_assistant_message(turn.content, Vec::new(), None);
                conversation_state.cancelled = true;
                break;
            }

            if turn.tool_calls.is_empty() {
                conversation_state.add_assistant_message(turn.content, Vec::new(), None);
                debug!("[Conversation] No tool calls, ending conversation");
                break;
            }

            let tool_results = self.handle_tool_calls(&turn.tool_calls).await;
            debug!("[Conversation] Tool results: {tool_results:?}");
            conversation_state.add_assistant_message(
                turn.content,
                turn.tool_calls,
                turn.reasoning_details,
            );
            conversation_state.add_tool_results(tool_results);

            if step + 1 == max_steps {
                warn!("[Conversation] reached max_steps ({max_steps}) with tool results pending");
            }
        }

        Ok(conversation_state.into_summary())
    }

    /// Executes the tool calls of one turn and returns their result messages.
    async fn handle_tool_calls(&self, tool_calls: &[ToolCall]) -> Vec<Message> {
        match self.tool_registry.as_deref() {
            Some(registry) => dispatch_tool_calls(registry, tool_calls).await,
            None => {
                let disabled = tool_calls
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                warn!("[Conversation] model called tools while disabled: {disabled}");
                tool_calls
                    .iter()
                    .map(|call| {
                        Message::tool(json!({ "error": TOOLS_DISABLED_ERROR }).to_string(), &call.id)
                    })
                    .collect()
            }
        }
    }
}

/// Collects one turn's output while echoing it to the writer
struct TurnRecorder<'w, W: Write> {
    writer: &'w mut W,
    show_reasoning: bool,
    content: String,
    tool_calls: Vec<ToolCall>,
    reasoning_details: Option<Vec<Value>>,
    usage: Usage,
    cost: f64,
    write_error: Option<io::Error>,
}

struct Turn {
    content: String,
    tool_calls: Vec<ToolCall>,
    reasoning_details: Option<Vec<Value>>,
    usage: Usage,
    cost: f64,
}

impl<'w, W: Write> TurnRecorder<'w, W> {
    fn new(writer: &'w mut W, show_reasoning: bool) -> Self {
        Self {
            writer,
            show_reasoning,
            content: String::new(),
            tool_calls: Vec::new(),
            reasoning_details: None,
            usage: Usage::default(),
            cost: 0.0,
            write_error: None,
        }
    }

    fn write(&mut self, text: &str) {
        if self.write_error.is_some() {
            return;
        }
        let result = self
            .writer
            .write_all(text.as_bytes())
            .and_then(|()| self.writer.flush());
        if let Err(e) = result {
            self.write_error = Some(e);
        }
    }

    fn finish(self) -> Result<Turn, LLMError> {
        if let Some(e) = self.write_error {
            return Err(e.into());
        }
        Ok(Turn {
            content: self.content,
            tool_calls: self.tool_calls,
            reasoning_details: self.reasoning_details,
            usage: self.usage,
            cost: self.cost,
        })
    }
}

impl<W: Write + Send> StreamHandler for TurnRecorder<'_, W> {
    fn on_content(&mut self, text: &str) {
        self.content.push_str(text);
        self.write(text);
    }

    fn on_reasoning(&mut self, text: &str) {
        if self.show_reasoning {
            self.write(&text.dimmed().to_string());
        }
    }

    fn on_tool_calls(
        &mut self,
        calls: &[ToolCall],
        _finish_reason: &FinishReason,
        reasoning_details: Option<&[Value]>,
    ) {
        self.tool_calls = calls.to_vec();
        self.reasoning_details = reasoning_details.map(<[Value]>::to_vec);
    }

    fn on_complete(&mut self, usage: &Usage, cost: f64) {
        self.usage = *usage;
        self.cost = cost;
    }
}

/// Maintains the state of an ongoing conversation.
struct ConversationState {
    messages: Vec<Message>,
    usage: Usage,
    cost: f64,
    steps: u32,
    cancelled: bool,
}

impl ConversationState {
    fn new(initial_messages: Vec<Message>) -> Self {
        Self {
            messages: initial_messages,
            usage: Usage::default(),
            cost: 0.0,
            steps: 0,
            cancelled: false,
        }
    }

    fn add_assistant_message(
        &mut self,
        content: String,
        tool_calls: Vec<ToolCall>,
        reasoning_details: Option<Vec<Value>>,
    ) {
        if content.is_empty() && tool_calls.is_empty() {
            return;
        }
        self.messages.push(Message::assistant(
            content,
            (!tool_calls.is_empty()).then_some(tool_calls),
            reasoning_details,
        ));
    }

    fn add_tool_results(&mut self, results: Vec<Message>) {
        self.messages.extend(results);
    }

    fn add_usage(&mut self, usage: Usage, cost: f64) {
        self.usage += usage;
        self.cost += cost;
    }

    fn into_summary(self) -> ConversationSummary {
        ConversationSummary {
            messages: self.messages,
            usage: self.usage,
            cost: self.cost,
            steps: self.steps,
            cancelled: self.cancelled,
        }
    }
}
