//! Server-sent event framing for the answer stream.

use std::convert::Infallible;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde_json::json;
use tracing::warn;

use crate::client::FrameStream;

/// Terminal frame of a successful stream.
pub const DONE_FRAME: &[u8] = b"data: [DONE]\n\n";

/// Frame an upstream payload.
pub fn data_frame(data: &str) -> Bytes {
    Bytes::from(format!("data: {data}\n\n"))
}

/// Frame an error that interrupted the stream.
pub fn error_frame(message: &str) -> Bytes {
    Bytes::from(format!(
        "event: error\ndata: {}\n\n",
        json!({ "error": message })
    ))
}

/// Turn upstream payloads into the response body.
///
/// A clean end emits [`DONE_FRAME`]; an upstream error emits one error frame
/// and ends the body without it.
pub fn event_stream(frames: FrameStream) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
    stream::unfold(Some(frames), |state| async move {
        let mut frames = state?;
        let frame = match frames.next().await {
            Some(Ok(data)) => return Some((Ok(data_frame(&data)), Some(frames))),
            Some(Err(e)) => {
                warn!("answer stream failed: {e}");
                error_frame(&e.to_string())
            }
            None => Bytes::from_static(DONE_FRAME),
        };
        Some((Ok(frame), None))
    })
}
