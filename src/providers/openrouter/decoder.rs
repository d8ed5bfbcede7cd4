use async_stream::try_stream;
use futures::{Stream, StreamExt};
use log::{debug, warn};

use super::types::{ChatCompletionChunk, StreamChunk};
use crate::core::LLMError;
use crate::eventsource::{Frame, LineStream};

/// Decodes one SSE line.
///
/// Returns `None` for anything that carries no chunk: keep-alives, non-data
/// fields, the `[DONE]` marker and payloads that are not valid JSON.
pub fn decode_line(line: &str) -> Option<StreamChunk> {
    match Frame::classify(line) {
        Frame::Ignored => None,
        Frame::Done => {
            debug!("[Decoder] received [DONE]");
            None
        }
        Frame::Data(payload) => match serde_json::from_str::<ChatCompletionChunk>(payload) {
            Ok(chunk) => Some(chunk.into()),
            Err(e) => {
                warn!("[Decoder] skipping malformed chunk: {e}; payload={payload}");
                None
            }
        },
    }
}

/// Maps a line stream to decoded chunks; only transport errors are yielded as errors
pub fn decode_stream(
    mut lines: LineStream,
) -> impl Stream<Item = Result<StreamChunk, LLMError>> + Send + Unpin + 'static {
    Box::pin(try_stream! {
        while let Some(line) = lines.next().await {
            if let Some(chunk) = decode_line(&line?) {
                yield chunk;
            }
        }
    })
}
