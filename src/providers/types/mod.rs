pub mod messages;
pub mod stream_event;

pub use messages::{ContentBlock, FileData, InputAudio, MediaUrl, Message, MessageContent};
pub use stream_event::{FinishReason, StreamEvent, StreamOutcome, Usage};
