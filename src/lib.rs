pub mod cli;
pub mod core;
pub mod eventsource;
pub mod providers;
pub mod tools;

pub use crate::core::{Config, LLMError};
pub use providers::{LLMClient, OpenRouterClient, StreamHandler};
