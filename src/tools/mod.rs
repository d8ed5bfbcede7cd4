pub mod date_time;
pub mod dispatcher;
pub mod registry;
pub mod types;

pub use date_time::DateTimeTool;
pub use dispatcher::{dispatch_tool_calls, validate_tool_calls, PartialToolCall};
pub use registry::ToolRegistry;
pub use types::*;
