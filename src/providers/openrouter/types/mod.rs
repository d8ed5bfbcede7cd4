pub mod chat_completion_chunk;
pub mod chat_completion_object;
pub mod chat_completion_request;
pub mod shared;

pub use chat_completion_chunk::{
    ChatCompletionChunk, Delta, DeltaBlock, DeltaContent, FunctionDelta, StreamChunk,
    ToolCallDelta,
};
pub use chat_completion_object::ChatCompletionObject;
pub use chat_completion_request::{ChatCompletionRequest, ProviderRouting, Tool, UsageOptions};
pub use shared::{ErrorDetails, ErrorResponse, ModelsResponse};
