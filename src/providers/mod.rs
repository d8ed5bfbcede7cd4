pub mod llm;
pub mod openrouter;
pub mod types;

pub use llm::{Completion, LLMClient, StreamHandler};
pub use openrouter::OpenRouterClient;
pub use types::{
    ContentBlock, FinishReason, Message, MessageContent, StreamEvent, StreamOutcome, Usage,
};
