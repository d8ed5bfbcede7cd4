pub mod accumulator;
pub mod client;
pub mod decoder;
pub mod types;

pub use accumulator::{StreamAccumulator, StreamState};
pub use client::{drive_stream, OpenRouterClient};
pub use decoder::{decode_line, decode_stream};
